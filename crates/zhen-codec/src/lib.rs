//! # zhen-codec
//!
//! FLV 视频序列头相关的码流解析: AVCDecoderConfigurationRecord 与 H.264 SPS.
//!
//! 只解析分辨率、profile 和 level 所需的字段, 不做任何视频解码.

pub mod parsers;

pub use parsers::h264::{AvcDecoderConfig, AvcProfile, Sps, VideoInfo, parse_sps};
