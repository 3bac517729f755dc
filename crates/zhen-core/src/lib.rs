//! # zhen-core
//!
//! zhen FLV 分析库的核心基础设施, 提供统一错误类型和比特流读写工具.
//!
//! 上层的 `zhen-codec` (H.264 参数集解析) 与 `zhen-format` (FLV 解封装)
//! 都依赖这里的 [`BitReader`] 和 [`ZhenError`].

pub mod bitreader;
pub mod bitwriter;
pub mod error;

// 重导出常用类型
pub use bitreader::BitReader;
pub use bitwriter::BitWriter;
pub use error::{ZhenError, ZhenResult};
