//! AVCDecoderConfigurationRecord 解析 (ISO/IEC 14496-15 5.2.4.1).
//!
//! ```text
//! configurationVersion        (1 byte)
//! AVCProfileIndication        (1 byte)
//! profile_compatibility       (1 byte)
//! AVCLevelIndication          (1 byte)
//! 111111 + lengthSizeMinusOne (1 byte, 低 2 位)
//! 111 + numOfSPS              (1 byte, 低 5 位)
//! { SPS length (2 bytes, BE) + SPS NAL } * numOfSPS
//! numOfPPS + PPS ...          (不解析)
//! ```

use std::fmt;

use log::debug;
use serde::{Serialize, Serializer};
use zhen_core::{ZhenError, ZhenResult};

use super::sps::{Sps, parse_sps};

/// AVC profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvcProfile {
    Baseline,
    Main,
    Extended,
    High,
    High10,
    High422,
    High444,
    Cavlc444,
    Unknown(u8),
}

impl AvcProfile {
    /// 从 profile_idc 构造
    pub fn from_idc(profile_idc: u8) -> Self {
        match profile_idc {
            66 => Self::Baseline,
            77 => Self::Main,
            88 => Self::Extended,
            100 => Self::High,
            110 => Self::High10,
            122 => Self::High422,
            244 => Self::High444,
            44 => Self::Cavlc444,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for AvcProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Baseline => write!(f, "Baseline"),
            Self::Main => write!(f, "Main"),
            Self::Extended => write!(f, "Extended"),
            Self::High => write!(f, "High"),
            Self::High10 => write!(f, "High 10"),
            Self::High422 => write!(f, "High 4:2:2"),
            Self::High444 => write!(f, "High 4:4:4"),
            Self::Cavlc444 => write!(f, "CAVLC 4:4:4"),
            Self::Unknown(idc) => write!(f, "Unknown({idc})"),
        }
    }
}

impl Serialize for AvcProfile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// 视频基本信息 (由序列头推导)
///
/// 宽高要么同时为 0 (未知), 要么同时为正.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VideoInfo {
    /// 宽度 (像素)
    pub width: u32,
    /// 高度 (像素)
    pub height: u32,
    /// 编码规格
    pub profile: Option<AvcProfile>,
    /// 编码级别 (level_idc / 10)
    pub level: f64,
}

impl VideoInfo {
    /// 分辨率是否已知
    pub fn has_resolution(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// AVCDecoderConfigurationRecord 解析结果
#[derive(Debug)]
pub struct AvcDecoderConfig {
    /// configurationVersion (通常为 1)
    pub version: u8,
    /// AVCProfileIndication
    pub profile_idc: u8,
    /// profile_compatibility
    pub profile_compatibility: u8,
    /// AVCLevelIndication
    pub level_idc: u8,
    /// NAL 长度前缀字节数 (lengthSizeMinusOne + 1)
    pub nal_length_size: u8,
    /// 每个 SPS 的解析结果, 单个 SPS 失败不影响其余字段
    pub sps: Vec<ZhenResult<Sps>>,
}

impl AvcDecoderConfig {
    /// 解析配置记录
    ///
    /// 记录本身截断 (固定字段或 SPS 长度越界) 返回错误;
    /// SPS 内部的位流错误保存在 `sps` 中.
    pub fn parse(data: &[u8]) -> ZhenResult<Self> {
        if data.len() < 6 {
            return Err(ZhenError::InvalidData(format!(
                "H.264: AVC 配置记录太短, len={}",
                data.len()
            )));
        }

        let version = data[0];
        let profile_idc = data[1];
        let profile_compatibility = data[2];
        let level_idc = data[3];
        let nal_length_size = (data[4] & 0x03) + 1;
        let num_sps = (data[5] & 0x1F) as usize;

        let mut pos = 6;
        let mut sps = Vec::with_capacity(num_sps);
        for i in 0..num_sps {
            if pos + 2 > data.len() {
                return Err(ZhenError::InvalidData(format!(
                    "H.264: AVC 配置记录 SPS 长度字段截断, index={i}"
                )));
            }
            let sps_len = usize::from(u16::from_be_bytes([data[pos], data[pos + 1]]));
            pos += 2;
            if pos + sps_len > data.len() {
                return Err(ZhenError::InvalidData(format!(
                    "H.264: AVC 配置记录 SPS 数据截断, index={}, declared_len={}, remain={}",
                    i,
                    sps_len,
                    data.len() - pos
                )));
            }
            sps.push(parse_sps(&data[pos..pos + sps_len]));
            pos += sps_len;
        }

        debug!(
            "H.264: AVC 配置记录 version={version} profile={profile_idc} level={level_idc} \
             nal_length_size={nal_length_size} sps_count={num_sps}"
        );

        Ok(Self {
            version,
            profile_idc,
            profile_compatibility,
            level_idc,
            nal_length_size,
            sps,
        })
    }

    /// 记录中声明的 profile
    pub fn profile(&self) -> AvcProfile {
        AvcProfile::from_idc(self.profile_idc)
    }

    /// 记录中声明的 level (level_idc / 10)
    pub fn level(&self) -> f64 {
        f64::from(self.level_idc) / 10.0
    }

    /// 推导视频信息: profile/level 取自记录, 宽高取自最后一个解析成功的 SPS
    ///
    /// 没有任何 SPS 解析成功时返回 None.
    pub fn video_info(&self) -> Option<VideoInfo> {
        let sps = self.sps.iter().rev().find_map(|r| r.as_ref().ok())?;
        Some(VideoInfo {
            width: sps.width,
            height: sps.height,
            profile: Some(self.profile()),
            level: self.level(),
        })
    }

    /// 人类可读的描述, 每个字段一行
    pub fn details(&self) -> String {
        let mut out = format!("Profile: {}, Level: {}\n", self.profile(), self.level());
        for result in &self.sps {
            match result {
                Ok(sps) => out.push_str(&format!("分辨率: {}x{}\n", sps.width, sps.height)),
                Err(e) => out.push_str(&format!("解析SPS失败: {e}\n")),
            }
        }
        out
    }
}
