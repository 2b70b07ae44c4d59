use core::{cmp::Ordering, fmt};

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace};

use crate::{
    config::ChunkedBufferConfig,
    cursor::Cursor,
    error::ConfigError,
    stats::{BufferStats, Counters},
};

/// `read` 成功后本次消费的区间：位于 `chunks[chunk]` 的 `[start, end)`。
#[derive(Clone, Copy, Debug)]
struct Span {
    chunk: usize,
    start: usize,
    end: usize,
}

/// `ChunkedByteBuffer` 是面向流式协议解析的分片追加字节缓冲。
///
/// # 设计动机（Why）
/// - 入站数据以任意大小的片段到达（一次 socket 读、一次文件块），上层分帧器却按“定长字段”或
///   “直到分隔符”的粒度消费，两者的边界互不对齐；
/// - 缓冲把每次写入保存为独立的不可变分片（`Bytes`），读取时只要请求落在单个分片内即返回零拷贝视图，
///   只有跨越分片边界的请求才触发一次压实（合并游标之后的全部分片）。
///
/// # 行为概览（How）
/// - `write`/`write_slice`：追加一个分片，空输入直接忽略；
/// - `read`：要么返回恰好 `size` 字节的连续视图并推进游标，要么返回 `None` 且不改变任何状态；
/// - `scan_distance`：返回从游标（含）到首个目标字节（含）的距离，不推进游标；
/// - 压实把“当前分片未读尾部 + 其后全部分片”复制为一个新分片，游标指向其起点。
///
/// # 契约说明（What）
/// - `read` 返回的 `&[u8]` 借用自 `&mut self`，在下一次调用任何方法前必须释放，
///   因而压实或追加不可能让旧视图悬垂；需要跨调用持有数据时使用 [`read_bytes`](Self::read_bytes)；
/// - `None` 表示“当前缓冲的数据不足”，调用方应等待更多 `write` 后以相同参数重试；
/// - 不提供内部同步，跨线程使用需由调用方加锁。
///
/// # 示例
/// ```
/// use spark_bytestream::ChunkedByteBuffer;
///
/// let mut buffer = ChunkedByteBuffer::new();
/// buffer.write_slice(b"GET /index");
/// buffer.write_slice(b".html\r\n");
///
/// let line_len = buffer.scan_distance(b'\n').unwrap();
/// assert_eq!(buffer.read(line_len), Some(&b"GET /index.html\r\n"[..]));
/// assert_eq!(buffer.read(1), None);
/// ```
pub struct ChunkedByteBuffer {
    chunks: Vec<Bytes>,
    cursor: Cursor,
    config: ChunkedBufferConfig,
    counters: Counters,
}

impl Default for ChunkedByteBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChunkedByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkedByteBuffer")
            .field("chunk_count", &self.chunks.len())
            .field("cursor_chunk", &self.cursor.chunk())
            .field("cursor_offset", &self.cursor.offset())
            .field("available", &self.available())
            .finish()
    }
}

impl ChunkedByteBuffer {
    /// 使用默认配置创建空缓冲。
    pub fn new() -> Self {
        Self::from_validated(ChunkedBufferConfig::default())
    }

    /// 使用给定配置创建空缓冲。
    ///
    /// # 错误
    /// - 配置未通过 [`ChunkedBufferConfig::validate`] 时返回对应的 [`ConfigError`]。
    pub fn with_config(config: ChunkedBufferConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    fn from_validated(config: ChunkedBufferConfig) -> Self {
        Self {
            chunks: Vec::with_capacity(config.initial_chunk_slots()),
            cursor: Cursor::start(),
            config,
            counters: Counters::default(),
        }
    }

    /// 返回构造时使用的配置。
    pub fn config(&self) -> &ChunkedBufferConfig {
        &self.config
    }

    /// 追加一个分片。
    ///
    /// # 契约说明（What）
    /// - `data` 以 `Bytes` 形式原样保存，`Vec<u8>`、`Bytes`、`&'static [u8]` 等输入均不复制；
    /// - 空输入为无操作，缓冲中不会出现空分片；
    /// - 不限制分片数量或总字节数。
    pub fn write(&mut self, data: impl Into<Bytes>) {
        let chunk = data.into();
        if chunk.is_empty() {
            trace!("ignored empty write");
            return;
        }
        let chunk_len = chunk.len();
        self.counters.record_write(chunk_len);
        self.chunks.push(chunk);
        trace!(chunk_len, chunk_count = self.chunks.len(), "chunk appended");
    }

    /// 复制借用切片并追加为新分片，语义同 [`write`](Self::write)。
    pub fn write_slice(&mut self, data: &[u8]) {
        self.write(Bytes::copy_from_slice(data));
    }

    /// 返回未读字节数：当前分片剩余部分加上其后所有分片的长度。
    pub fn available(&self) -> usize {
        // 读尽时 `cursor.chunk() == chunks.len()`，切片为空且偏移为 0。
        let pending: usize = self.chunks[self.cursor.chunk()..]
            .iter()
            .map(Bytes::len)
            .sum();
        pending - self.cursor.offset()
    }

    /// 是否没有未读数据。
    pub fn is_empty(&self) -> bool {
        self.available() == 0
    }

    /// 当前存储的分片数量，包含游标之后已不可达的已消费分片。
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// 读取恰好 `size` 字节并推进游标。
    ///
    /// # 契约说明（What）
    /// - 成功时返回连续视图；请求落在当前分片内时为零拷贝，跨越分片时先压实再返回；
    /// - 数据不足或 `size == 0` 时返回 `None`，游标与分片列表保持不变；
    /// - 视图借用 `self`，下一次调用前必须释放。
    ///
    /// # 执行逻辑（How）
    /// 1. `size < 剩余`：返回当前分片内视图，偏移前进；
    /// 2. `size == 剩余`：返回视图，游标移到下一分片起点；
    /// 3. `size > 剩余`：若总可读量足够则压实后重试一次，否则返回 `None`。
    pub fn read(&mut self, size: usize) -> Option<&[u8]> {
        let span = self.claim(size)?;
        Some(&self.chunks[span.chunk][span.start..span.end])
    }

    /// 与 [`read`](Self::read) 语义一致，但返回引用计数的 `Bytes`，可跨后续调用持有。
    ///
    /// 返回值通过 `Bytes::slice` 共享分片内存，不复制数据。
    pub fn read_bytes(&mut self, size: usize) -> Option<Bytes> {
        let span = self.claim(size)?;
        Some(self.chunks[span.chunk].slice(span.start..span.end))
    }

    /// 读取直到并包含 `delimiter` 的一段记录。
    ///
    /// 等价于 `scan_distance(delimiter)` 后 `read(distance)`；未找到分隔符时返回 `None`，
    /// 游标不变（扫描引起的压实会保留）。
    pub fn read_until(&mut self, delimiter: u8) -> Option<&[u8]> {
        let distance = self.scan_distance(delimiter)?;
        self.read(distance)
    }

    /// 返回从游标（含）到首个 `target`（含）的字节距离，从 1 开始计数。
    ///
    /// # 契约说明（What）
    /// - 只扫描已缓冲的未读数据，未出现 `target` 时返回 `None`；
    /// - 游标不在最后一个分片时会先压实，使扫描面对单个连续区域；压实结果在返回 `None` 时同样保留；
    /// - 从不推进游标，调用方配合 `read(distance)` 消费到分隔符为止。
    pub fn scan_distance(&mut self, target: u8) -> Option<usize> {
        if self.cursor.chunk() >= self.chunks.len() {
            return None;
        }
        if !self.cursor_in_last_chunk() {
            self.compact();
        }
        let current = &self.chunks[self.cursor.chunk()];
        current[self.cursor.offset()..]
            .iter()
            .position(|byte| *byte == target)
            .map(|position| position + 1)
    }

    /// 丢弃游标之前已完全消费的分片，返回释放的字节数。
    ///
    /// # 契约说明（What）
    /// - 可读内容、`available()` 与扫描结果均不受影响；
    /// - 游标所在分片即使已部分消费也不会被裁剪；
    /// - 缓冲已读尽时释放全部分片。
    pub fn release_consumed(&mut self) -> usize {
        let consumed = self.cursor.chunk();
        if consumed == 0 {
            return 0;
        }
        let released: usize = self.chunks.drain(..consumed).map(|chunk| chunk.len()).sum();
        self.cursor.rebase(consumed);
        debug!(
            released_chunks = consumed,
            released_bytes = released,
            "released consumed chunks"
        );
        released
    }

    /// 返回当前统计快照。
    pub fn stats(&self) -> BufferStats {
        self.counters.snapshot(self.chunks.len(), self.available())
    }

    fn cursor_in_last_chunk(&self) -> bool {
        self.cursor.chunk() + 1 >= self.chunks.len()
    }

    /// 推进游标并返回被消费的区间；失败时不修改任何状态。
    fn claim(&mut self, size: usize) -> Option<Span> {
        if size == 0 {
            return None;
        }
        // 压实后游标必然位于唯一的尾部分片，第二轮只会落入 Less/Equal 分支。
        let mut compacted = false;
        loop {
            let index = self.cursor.chunk();
            let start = self.cursor.offset();
            let remaining = self.chunks.get(index)?.len() - start;
            match size.cmp(&remaining) {
                Ordering::Less => self.cursor.advance_within(size),
                Ordering::Equal => self.cursor.next_chunk(),
                Ordering::Greater => {
                    debug_assert!(!compacted, "compaction must leave a single pending chunk");
                    if compacted || self.available() < size {
                        return None;
                    }
                    self.compact();
                    compacted = true;
                    continue;
                }
            }
            self.counters.record_read(size);
            return Some(Span {
                chunk: index,
                start,
                end: start + size,
            });
        }
    }

    /// 将当前分片的未读尾部与其后全部分片合并为一个分片。
    ///
    /// # 执行逻辑（How）
    /// 1. 从游标所在分片起切下待合并后缀；
    /// 2. 按顺序复制未读字节到新的 `BytesMut` 并冻结；
    /// 3. 若配置保留已消费前缀且前缀非空，先压入前缀切片（共享原内存）；
    /// 4. 压入合并分片，游标指向其起点。
    ///
    /// 游标已在最后一个分片时为无操作。
    fn compact(&mut self) {
        if self.cursor_in_last_chunk() {
            return;
        }
        let offset = self.cursor.offset();
        let pending = self.chunks.split_off(self.cursor.chunk());
        let merged_len = pending.iter().map(Bytes::len).sum::<usize>() - offset;

        let mut merged = BytesMut::with_capacity(merged_len);
        merged.extend_from_slice(&pending[0][offset..]);
        for chunk in &pending[1..] {
            merged.extend_from_slice(chunk);
        }

        let retained_prefix = offset > 0 && self.config.retain_consumed_prefix();
        if retained_prefix {
            self.chunks.push(pending[0].slice(..offset));
        }
        self.chunks.push(merged.freeze());
        self.cursor.reset_to(self.chunks.len() - 1);
        self.counters.record_compaction(merged_len);

        debug!(
            merged_chunks = pending.len(),
            merged_bytes = merged_len,
            retained_prefix,
            "compacted pending chunks"
        );
    }

    /// 校验游标不变式，仅供测试使用。
    #[cfg(test)]
    fn assert_cursor_invariant(&self) {
        match self.chunks.get(self.cursor.chunk()) {
            Some(chunk) => assert!(self.cursor.offset() < chunk.len()),
            None => {
                assert_eq!(self.cursor.chunk(), self.chunks.len());
                assert_eq!(self.cursor.offset(), 0);
            }
        }
        assert!(self.chunks.iter().all(|chunk| !chunk.is_empty()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn buffer_with(chunks: &[&[u8]]) -> ChunkedByteBuffer {
        let mut buffer = ChunkedByteBuffer::new();
        for chunk in chunks {
            buffer.write_slice(chunk);
        }
        buffer
    }

    #[test]
    fn empty_writes_are_never_stored() {
        let mut buffer = ChunkedByteBuffer::new();
        buffer.write_slice(b"");
        buffer.write(Vec::new());
        buffer.write(Bytes::new());
        assert_eq!(buffer.chunk_count(), 0);
        assert_eq!(buffer.available(), 0);
        assert!(buffer.is_empty());
        buffer.assert_cursor_invariant();
    }

    #[test]
    fn read_within_chunk_does_not_compact() {
        // 单分片内的读取只移动偏移，不触发复制。
        let mut buffer = buffer_with(&[b"hello, world"]);
        assert_eq!(buffer.read(6), Some(&b"hello,"[..]));
        assert_eq!(buffer.read(6), Some(&b" world"[..]));
        assert_eq!(buffer.stats().compactions, 0);
        assert_eq!(buffer.chunk_count(), 1);
        buffer.assert_cursor_invariant();
    }

    #[test]
    fn exact_remaining_read_moves_to_next_chunk() {
        let mut buffer = buffer_with(&[b"abc", b"def"]);
        assert_eq!(buffer.read(3), Some(&b"abc"[..]));
        assert_eq!(buffer.cursor, {
            let mut expected = Cursor::start();
            expected.next_chunk();
            expected
        });
        assert_eq!(buffer.read(3), Some(&b"def"[..]));
        assert_eq!(buffer.stats().compactions, 0);
        buffer.assert_cursor_invariant();
    }

    #[test]
    fn zero_sized_read_is_unavailable_and_inert() {
        let mut buffer = buffer_with(&[b"abc"]);
        assert_eq!(buffer.read(0), None);
        assert_eq!(buffer.read_bytes(0), None);
        assert_eq!(buffer.available(), 3);
        assert_eq!(buffer.stats().bytes_read, 0);
    }

    #[test]
    fn failed_read_leaves_chunks_untouched() {
        let mut buffer = buffer_with(&[b"ab", b"cd"]);
        assert_eq!(buffer.read(1), Some(&b"a"[..]));
        assert_eq!(buffer.read(4), None);
        assert_eq!(buffer.chunk_count(), 2);
        assert_eq!(buffer.stats().compactions, 0);
        assert_eq!(buffer.available(), 3);
        assert_eq!(buffer.read(3), Some(&b"bcd"[..]));
    }

    #[test]
    fn compaction_retains_consumed_prefix_by_default() {
        let mut buffer = buffer_with(&[b"aaa", b"bbb", b"ccc"]);
        assert_eq!(buffer.read(1), Some(&b"a"[..]));
        assert_eq!(buffer.read(4), Some(&b"aabb"[..]));
        // 前缀 "a" + 合并分片 "aabbbccc"。
        assert_eq!(buffer.chunk_count(), 2);
        assert_eq!(&buffer.chunks[0][..], b"a");
        assert_eq!(&buffer.chunks[1][..], b"aabbbccc");
        assert_eq!(buffer.stats().bytes_compacted, 8);
        buffer.assert_cursor_invariant();
    }

    #[test]
    fn compaction_can_drop_consumed_prefix() {
        let config = ChunkedBufferConfig::new().with_retain_consumed_prefix(false);
        let mut buffer = ChunkedByteBuffer::with_config(config).expect("默认槽位合法");
        buffer.write_slice(b"aaa");
        buffer.write_slice(b"bbb");
        assert_eq!(buffer.read(1), Some(&b"a"[..]));
        assert_eq!(buffer.read(4), Some(&b"aabb"[..]));
        assert_eq!(buffer.chunk_count(), 1);
        assert_eq!(buffer.read(1), Some(&b"b"[..]));
        buffer.assert_cursor_invariant();
    }

    #[test]
    fn compaction_keeps_fully_consumed_chunks_in_place() {
        let mut buffer = buffer_with(&[b"xx", b"yy", b"zz"]);
        assert_eq!(buffer.read(2), Some(&b"xx"[..]));
        assert_eq!(buffer.read(4), Some(&b"yyzz"[..]));
        assert_eq!(buffer.chunk_count(), 2);
        assert_eq!(&buffer.chunks[0][..], b"xx");
        assert!(buffer.is_empty());
        buffer.assert_cursor_invariant();
    }

    #[test]
    fn scan_in_last_chunk_does_not_compact() {
        let mut buffer = buffer_with(&[b"ab", b"cd"]);
        assert_eq!(buffer.read(2), Some(&b"ab"[..]));
        assert_eq!(buffer.scan_distance(b'd'), Some(2));
        assert_eq!(buffer.stats().compactions, 0);
    }

    #[test]
    fn unsuccessful_scan_keeps_compaction() {
        let mut buffer = buffer_with(&[b"ab", b"cd", b"ef"]);
        assert_eq!(buffer.scan_distance(b'z'), None);
        assert_eq!(buffer.chunk_count(), 1);
        assert_eq!(buffer.stats().compactions, 1);
        assert_eq!(buffer.available(), 6);
        buffer.assert_cursor_invariant();
    }

    #[test]
    fn scan_on_exhausted_buffer_is_not_found() {
        let mut buffer = buffer_with(&[b"ab"]);
        assert_eq!(buffer.read(2), Some(&b"ab"[..]));
        assert_eq!(buffer.scan_distance(b'a'), None);
    }

    #[test]
    fn read_bytes_shares_chunk_storage() {
        let source = Bytes::from_static(b"shared storage");
        let mut buffer = ChunkedByteBuffer::new();
        buffer.write(source.clone());
        let view = buffer.read_bytes(6).expect("数据充足");
        assert_eq!(&view[..], b"shared");
        assert_eq!(view.as_ptr(), source.as_ptr());
    }

    #[test]
    fn read_until_consumes_through_delimiter() {
        let mut buffer = buffer_with(&[b"key=", b"value;rest"]);
        assert_eq!(buffer.read_until(b';'), Some(&b"key=value;"[..]));
        assert_eq!(buffer.read_until(b';'), None);
        assert_eq!(buffer.available(), 4);
    }

    #[test]
    fn release_consumed_rebases_cursor() {
        let mut buffer = buffer_with(&[b"abc", b"def", b"ghi"]);
        assert_eq!(buffer.read(4), Some(&b"abcd"[..]));
        // 压实发生在偏移 0，只留下合并分片 "abcdefghi"，游标仍在首个分片。
        assert_eq!(buffer.release_consumed(), 0);

        buffer.write_slice(b"jk");
        assert_eq!(buffer.read(5), Some(&b"efghi"[..]));
        assert_eq!(buffer.release_consumed(), 9);
        assert_eq!(buffer.chunk_count(), 1);
        assert_eq!(buffer.read(2), Some(&b"jk"[..]));
        assert_eq!(buffer.release_consumed(), 2);
        assert_eq!(buffer.chunk_count(), 0);
        buffer.assert_cursor_invariant();

        buffer.write_slice(b"again");
        assert_eq!(buffer.read(5), Some(&b"again"[..]));
    }

    #[test]
    fn stats_track_counters() {
        let mut buffer = buffer_with(&[b"abc", b"def"]);
        let _ = buffer.read(4);
        let stats = buffer.stats();
        assert_eq!(stats.bytes_written, 6);
        assert_eq!(stats.bytes_read, 4);
        assert_eq!(stats.available, 2);
        assert_eq!(stats.compactions, 1);
        assert_eq!(stats.bytes_compacted, 6);
        assert_eq!(stats.bytes_written - stats.bytes_read, stats.available as u64);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ChunkedBufferConfig::new()
            .with_initial_chunk_slots(crate::config::MAX_INITIAL_CHUNK_SLOTS + 1);
        assert!(matches!(
            ChunkedByteBuffer::with_config(config),
            Err(ConfigError::OutOfRange { .. })
        ));
    }

    #[test]
    fn debug_output_omits_payload() {
        let buffer = buffer_with(&[b"secret"]);
        let rendered = format!("{buffer:?}");
        assert!(rendered.contains("available: 6"));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    #[traced_test]
    fn compaction_emits_debug_event() {
        let mut buffer = buffer_with(&[b"ab", b"cd"]);
        assert_eq!(buffer.read(3), Some(&b"abc"[..]));
        assert!(logs_contain("compacted pending chunks"));
        assert!(logs_contain("merged_chunks=2"));
        assert!(logs_contain("merged_bytes=4"));
    }

    #[test]
    #[traced_test]
    fn release_emits_debug_event() {
        let mut buffer = buffer_with(&[b"ab", b"cd"]);
        assert_eq!(buffer.read(2), Some(&b"ab"[..]));
        assert_eq!(buffer.release_consumed(), 2);
        assert!(logs_contain("released consumed chunks"));
        assert!(logs_contain("released_bytes=2"));
    }
}
