#![warn(missing_docs)]

//! `spark-bytestream` 提供分片追加、零拷贝读取的字节缓冲，是流式协议分帧器的底层原语。
//!
//! # 模块定位（Why）
//! - 编解码层（例如换行分帧、长度前缀分帧）面对的入站数据以任意大小的片段到达，
//!   而连续缓冲只暴露首个连续块，分帧器需要自行重组跨片段的帧；
//! - 本 crate 把“追加片段 → 按需读取 → 查找分隔符”收敛到 [`ChunkedByteBuffer`]，
//!   分帧器只需关心“读多少字节”“分隔符在多远”，无需感知片段边界。
//!
//! # 设计概要（How）
//! - 每次写入保存为一个不可变 `bytes::Bytes` 分片，读游标记录 `(分片下标, 偏移)`；
//! - 读取落在单个分片内时直接返回切片视图；跨越边界时把游标之后的数据压实为一个分片再返回；
//! - 数据不足时返回 `None` 且不修改游标，调用方可在后续写入后原样重试；
//! - 压实、释放等内部事件通过 `tracing` 以 `debug`/`trace` 级别输出，库本身不安装 Subscriber。
//!
//! # 快速上手
//! ```
//! use spark_bytestream::ChunkedByteBuffer;
//!
//! let mut buffer = ChunkedByteBuffer::new();
//! buffer.write_slice(b"aaa");
//! buffer.write_slice(b"bbb");
//!
//! assert_eq!(buffer.available(), 6);
//! assert_eq!(buffer.read(4), Some(&b"aaab"[..]));
//! assert_eq!(buffer.read(4), None);
//! assert_eq!(buffer.scan_distance(b'b'), Some(1));
//! ```
//!
//! # 模块组织
//! - [`ChunkedByteBuffer`]：缓冲本体；
//! - [`ChunkedBufferConfig`]：构造配置，支持 serde 与 TOML 加载（`config-toml` 特性）；
//! - [`ConfigError`]：配置校验与解析错误；
//! - [`BufferStats`]：写入/读取/压实的累计统计快照。

mod buffer;
pub mod config;
mod cursor;
mod error;
mod stats;

pub use buffer::ChunkedByteBuffer;
pub use config::ChunkedBufferConfig;
pub use error::ConfigError;
pub use stats::BufferStats;
