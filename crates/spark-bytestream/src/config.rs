//! `ChunkedByteBuffer` 的构造配置。
//!
//! # 模块定位（Why）
//! - 缓冲的语义不随配置变化：读到的字节、`available()` 与扫描距离在任何配置下都一致；
//! - 配置只影响内部表示，例如压实时是否保留已消费前缀、分片列表预留多少槽位。
//!
//! # 使用方式（How）
//! - 代码内构造：`ChunkedBufferConfig::new().with_initial_chunk_slots(64)`；
//! - 文本加载（`config-toml` 特性）：[`ChunkedBufferConfig::from_toml_str`]，缺省字段回落到默认值。

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 分片列表默认预留的槽位数。
pub const DEFAULT_INITIAL_CHUNK_SLOTS: usize = 16;

/// `initial_chunk_slots` 的上限，超出视为配置错误。
pub const MAX_INITIAL_CHUNK_SLOTS: usize = 1 << 16;

/// 分片缓冲的配置快照。
///
/// # 字段说明（What）
/// - `retain_consumed_prefix`：压实时若游标位于当前分片中部，是否把已消费前缀保留为独立分片。
///   前缀通过 `Bytes::slice` 共享原分片内存，不产生复制；关闭后压实会直接丢弃该前缀。
/// - `initial_chunk_slots`：分片列表初始预留容量，必须不超过 [`MAX_INITIAL_CHUNK_SLOTS`]。
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChunkedBufferConfig {
    retain_consumed_prefix: bool,
    initial_chunk_slots: usize,
}

impl Default for ChunkedBufferConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkedBufferConfig {
    /// 创建默认配置：保留已消费前缀，预留 [`DEFAULT_INITIAL_CHUNK_SLOTS`] 个槽位。
    pub const fn new() -> Self {
        Self {
            retain_consumed_prefix: true,
            initial_chunk_slots: DEFAULT_INITIAL_CHUNK_SLOTS,
        }
    }

    /// 设置压实时是否保留已消费前缀。
    pub fn with_retain_consumed_prefix(mut self, retain: bool) -> Self {
        self.retain_consumed_prefix = retain;
        self
    }

    /// 设置分片列表的初始预留槽位。
    ///
    /// 该方法不做校验，越界值会在 [`validate`](Self::validate) 或构造缓冲时被拒绝。
    pub fn with_initial_chunk_slots(mut self, slots: usize) -> Self {
        self.initial_chunk_slots = slots;
        self
    }

    /// 压实时是否保留已消费前缀。
    pub fn retain_consumed_prefix(&self) -> bool {
        self.retain_consumed_prefix
    }

    /// 分片列表的初始预留槽位。
    pub fn initial_chunk_slots(&self) -> usize {
        self.initial_chunk_slots
    }

    /// 校验配置取值。
    ///
    /// # 错误
    /// - `initial_chunk_slots` 大于 [`MAX_INITIAL_CHUNK_SLOTS`] 时返回 [`ConfigError::OutOfRange`]。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_chunk_slots > MAX_INITIAL_CHUNK_SLOTS {
            return Err(ConfigError::OutOfRange {
                field: "initial_chunk_slots",
                value: self.initial_chunk_slots,
                max: MAX_INITIAL_CHUNK_SLOTS,
            });
        }
        Ok(())
    }

    /// 从 TOML 文本解析并校验配置。
    ///
    /// # 契约说明（What）
    /// - 缺省字段取默认值，未知字段视为解析错误；
    /// - 解析成功后立即执行 [`validate`](Self::validate)，返回的配置一定可用于构造缓冲。
    ///
    /// ```
    /// use spark_bytestream::ChunkedBufferConfig;
    ///
    /// let config = ChunkedBufferConfig::from_toml_str("initial_chunk_slots = 4").unwrap();
    /// assert_eq!(config.initial_chunk_slots(), 4);
    /// assert!(config.retain_consumed_prefix());
    /// ```
    #[cfg(feature = "config-toml")]
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|err| ConfigError::Parse {
            message: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }
}
