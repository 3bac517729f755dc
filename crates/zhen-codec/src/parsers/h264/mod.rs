//! H.264/AVC 码流解析器.
//!
//! - NAL 单元去防竞争字节
//! - SPS (Sequence Parameter Set) 解析
//! - AVCDecoderConfigurationRecord (FLV AVC 序列头) 解析

pub mod config;
pub mod nal;
pub mod sps;

pub use config::{AvcDecoderConfig, AvcProfile, VideoInfo};
pub use nal::remove_emulation_prevention;
pub use sps::{Sps, parse_sps};
