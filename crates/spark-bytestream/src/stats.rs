/// 分片缓冲的运行统计快照。
///
/// # 契约说明（What）
/// - `chunk_count`/`available` 反映取快照时刻的存储状态；
/// - 其余字段为自缓冲创建以来单调递增的累计值；
/// - 恒有 `bytes_written - bytes_read == available`（以 `u64` 计）。
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BufferStats {
    /// 当前存储的分片数量，包含游标之后已不可达的已消费分片。
    pub chunk_count: usize,
    /// 当前未读字节数。
    pub available: usize,
    /// 累计写入的字节数（空写入不计）。
    pub bytes_written: u64,
    /// 累计被读取消费的字节数。
    pub bytes_read: u64,
    /// 累计发生的压实次数。
    pub compactions: u64,
    /// 压实过程中累计复制的字节数。
    pub bytes_compacted: u64,
}

/// 缓冲内部维护的累计计数器，由 [`BufferStats`] 对外暴露。
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Counters {
    pub(crate) bytes_written: u64,
    pub(crate) bytes_read: u64,
    pub(crate) compactions: u64,
    pub(crate) bytes_compacted: u64,
}

impl Counters {
    pub(crate) fn record_write(&mut self, len: usize) {
        self.bytes_written += len as u64;
    }

    pub(crate) fn record_read(&mut self, len: usize) {
        self.bytes_read += len as u64;
    }

    pub(crate) fn record_compaction(&mut self, copied: usize) {
        self.compactions += 1;
        self.bytes_compacted += copied as u64;
    }

    /// 结合当前存储状态生成对外快照。
    pub(crate) fn snapshot(&self, chunk_count: usize, available: usize) -> BufferStats {
        BufferStats {
            chunk_count,
            available,
            bytes_written: self.bytes_written,
            bytes_read: self.bytes_read,
            compactions: self.compactions,
            bytes_compacted: self.bytes_compacted,
        }
    }
}
