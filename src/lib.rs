//! # Zhen (帧)
//!
//! 纯 Rust 实现的 FLV 逐帧结构分析库.
//!
//! 把加载到内存的 FLV 文件拆成帧序列: 每个 Tag 的类型, 时间戳, 大小,
//! 文件偏移, 关键帧与序列头标记, 以及可读的详细信息. 同时提取 H.264
//! 序列头中的分辨率, profile, level 和 onMetaData 中的关键帧索引.
//!
//! # 快速开始
//!
//! ```rust,no_run
//! let data = std::fs::read("sample.flv").unwrap();
//! let result = zhen::format::parse(data);
//! for frame in &result.frames {
//!     println!("{} {} {}", frame.kind, frame.timestamp_ms, frame.file_position);
//! }
//! if let Some(err) = &result.error {
//!     eprintln!("{err}");
//! }
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `zhen-core` | 错误类型与位流读写 |
//! | `zhen-codec` | H.264 SPS 与 AVC 解码配置记录解析 |
//! | `zhen-format` | FLV 解封装, AMF0, 关键帧索引 |

/// 错误类型与位流工具
pub use zhen_core as core;

/// H.264 码流解析
pub use zhen_codec as codec;

/// FLV 容器解析
pub use zhen_format as format;

pub mod logging;

/// 获取 Zhen 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
