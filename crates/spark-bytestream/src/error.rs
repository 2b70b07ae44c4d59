//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 缓冲本身的读写/扫描操作没有失败路径：数据不足以 `None` 表达，属于正常结果而非错误；
//! - 唯一可失败的入口是配置的解析与校验，本模块集中定义这一类错误。
//!
//! ## 设计要求（What）
//! - 错误类型实现 `thiserror::Error`，可直接通过 `?` 融入调用方的错误链；
//! - 变体携带字段名与取值，便于在日志中直接定位不合法的配置项。

use thiserror::Error;

/// 构造 [`ChunkedByteBuffer`](crate::ChunkedByteBuffer) 时可能出现的配置错误。
///
/// # 契约说明（What）
/// - `Parse`：仅在启用 `config-toml` 特性时出现，`message` 保留底层解析器的原始描述；
/// - `OutOfRange`：字段取值超出允许上限，`field` 为配置键名，`value`/`max` 为实际值与上限。
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ConfigError {
    /// 配置文本无法解析（语法错误、类型不匹配或出现未知字段）。
    #[cfg(feature = "config-toml")]
    #[error("failed to parse chunked buffer config: {message}")]
    Parse {
        /// 解析器给出的错误描述。
        message: String,
    },

    /// 配置字段超出允许范围。
    #[error("config field `{field}` is {value}, exceeding the maximum of {max}")]
    OutOfRange {
        /// 出错的配置键名。
        field: &'static str,
        /// 实际取值。
        value: usize,
        /// 允许的最大值。
        max: usize,
    },
}
