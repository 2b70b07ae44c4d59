/// 读游标：`(分片下标, 分片内偏移)`，指向下一个未读字节。
///
/// # 契约说明（What）
/// - 若 `chunk < 分片数`，则 `offset < 该分片长度`；
/// - 若 `chunk == 分片数`，缓冲已读尽且 `offset == 0`。
///
/// 游标本身不持有分片，以上不变式由 [`ChunkedByteBuffer`](crate::ChunkedByteBuffer) 在每次推进时维护。
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct Cursor {
    chunk: usize,
    offset: usize,
}

impl Cursor {
    pub(crate) const fn start() -> Self {
        Self {
            chunk: 0,
            offset: 0,
        }
    }

    pub(crate) fn chunk(&self) -> usize {
        self.chunk
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    /// 在当前分片内前进 `len` 字节，调用方保证不会越过分片末尾。
    pub(crate) fn advance_within(&mut self, len: usize) {
        self.offset += len;
    }

    /// 当前分片恰好读完，移动到下一分片起点。
    pub(crate) fn next_chunk(&mut self) {
        self.chunk += 1;
        self.offset = 0;
    }

    /// 指向 `chunk` 的起点，用于压实后重新定位。
    pub(crate) fn reset_to(&mut self, chunk: usize) {
        self.chunk = chunk;
        self.offset = 0;
    }

    /// 丢弃前 `released` 个分片后，平移分片下标。
    pub(crate) fn rebase(&mut self, released: usize) {
        debug_assert!(released <= self.chunk);
        self.chunk -= released;
    }
}
