//! FLV Tag 解码.
//!
//! # Tag 结构
//! ```text
//! TagType (1 byte): 8=Audio, 9=Video, 18=Script
//! DataSize (3 bytes, BE)
//! Timestamp (3 bytes, BE) + TimestampExtended (1 byte, 高8位)
//! StreamID (3 bytes, BE): 忽略
//! TagData (DataSize bytes)
//! ```
//!
//! # 视频 Tag 数据
//! ```text
//! FrameType (4 bits): 1=keyframe, 2=inter, 3=disposable, 4=generated, 5=command
//! CodecID (4 bits): 7=AVC(H.264)
//! [AVC: AVCPacketType (1 byte): 0=SeqHeader, 1=NALU, 2=EndOfSeq]
//! [AVC: CompositionTime (3 bytes, BE, signed)]
//! [AVC SeqHeader: AVCDecoderConfigurationRecord]
//! ```
//!
//! Tag 头部与边界错误是致命的; 负载内容错误只写入该帧的 `details`.

use std::fmt;

use log::{debug, warn};
use serde::Serialize;
use zhen_codec::{AvcDecoderConfig, VideoInfo};
use zhen_core::{ZhenError, ZhenResult};

use crate::io::ByteReader;
use crate::script::{ScriptData, decode_script};

/// FLV Tag 类型
pub const TAG_AUDIO: u8 = 8;
pub const TAG_VIDEO: u8 = 9;
pub const TAG_SCRIPT: u8 = 18;

/// Tag 头部大小
pub const TAG_HEADER_SIZE: usize = 11;

/// FLV 视频编解码器 ID: AVC
const FLV_CODEC_AVC: u8 = 7;

/// AVCPacketType
const AVC_SEQUENCE_HEADER: u8 = 0;
const AVC_NALU: u8 = 1;
const AVC_END_OF_SEQUENCE: u8 = 2;

/// Tag 种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    Audio,
    Video,
    Script,
}

impl TagKind {
    /// 从 TagType 字节构造, 只接受 8/9/18
    pub fn from_tag_type(tag_type: u8) -> ZhenResult<Self> {
        match tag_type {
            TAG_AUDIO => Ok(Self::Audio),
            TAG_VIDEO => Ok(Self::Video),
            TAG_SCRIPT => Ok(Self::Script),
            other => Err(ZhenError::InvalidTagType(other)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Script => "script",
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 视频帧类型 (VIDEODATA 高 4 位)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoFrameType {
    Key,
    Inter,
    Disposable,
    GeneratedKey,
    Command,
    Unknown(u8),
}

impl VideoFrameType {
    pub fn from_nibble(value: u8) -> Self {
        match value {
            1 => Self::Key,
            2 => Self::Inter,
            3 => Self::Disposable,
            4 => Self::GeneratedKey,
            5 => Self::Command,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for VideoFrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key => write!(f, "关键帧"),
            Self::Inter => write!(f, "非关键帧"),
            Self::Disposable => write!(f, "可丢弃帧"),
            Self::GeneratedKey => write!(f, "生成关键帧"),
            Self::Command => write!(f, "视频信息/命令帧"),
            Self::Unknown(v) => write!(f, "未知({v})"),
        }
    }
}

/// 视频编解码器 (VIDEODATA 低 4 位)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    Jpeg,
    H263,
    ScreenVideo,
    Vp6,
    Vp6Alpha,
    ScreenVideo2,
    Avc,
    Unknown(u8),
}

impl VideoCodec {
    pub fn from_nibble(value: u8) -> Self {
        match value {
            1 => Self::Jpeg,
            2 => Self::H263,
            3 => Self::ScreenVideo,
            4 => Self::Vp6,
            5 => Self::Vp6Alpha,
            6 => Self::ScreenVideo2,
            FLV_CODEC_AVC => Self::Avc,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jpeg => write!(f, "JPEG"),
            Self::H263 => write!(f, "H.263"),
            Self::ScreenVideo => write!(f, "Screen video"),
            Self::Vp6 => write!(f, "VP6"),
            Self::Vp6Alpha => write!(f, "VP6 with alpha"),
            Self::ScreenVideo2 => write!(f, "Screen video v2"),
            Self::Avc => write!(f, "AVC/H.264"),
            Self::Unknown(v) => write!(f, "未知({v})"),
        }
    }
}

/// 一个已解码的 Tag
///
/// 创建后不再修改.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    /// Tag 种类
    pub kind: TagKind,
    /// 时间戳 (毫秒, 含扩展高 8 位)
    pub timestamp_ms: u32,
    /// 负载大小 (字节)
    pub payload_size: u32,
    /// Tag 头部在文件中的绝对偏移
    pub file_position: u64,
    /// 是否为关键帧 (仅视频)
    pub is_keyframe: bool,
    /// 是否为 AVC 序列头 (仅视频)
    pub is_sequence_header: bool,
    /// 人类可读的解码摘要
    pub details: String,
}

/// Tag 头部字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagHeader {
    pub kind: TagKind,
    pub data_size: u32,
    pub timestamp: u32,
}

impl TagHeader {
    /// 读取 11 字节 Tag 头部
    pub fn read(r: &mut ByteReader<'_>) -> ZhenResult<Self> {
        let kind = TagKind::from_tag_type(r.read_u8()?)?;
        let data_size = r.read_u24_be()?;
        let timestamp_low = r.read_u24_be()?;
        let timestamp_ext = r.read_u8()?;
        let timestamp = (u32::from(timestamp_ext) << 24) | timestamp_low;
        let _stream_id = r.read_u24_be()?;
        Ok(Self {
            kind,
            data_size,
            timestamp,
        })
    }
}

/// 单个 Tag 的解码结果
///
/// `video_info` 与 `keyframe_positions` 由调用方合并进解封装器状态.
#[derive(Debug)]
pub struct DecodedTag {
    pub frame: Frame,
    /// 序列头中解析成功的视频信息
    pub video_info: Option<VideoInfo>,
    /// Script Tag 中发现的关键帧索引
    pub keyframe_positions: Option<Vec<u64>>,
    /// 下一个 PreviousTagSize 字段的位置
    pub next_position: usize,
}

/// 从 `position` 处解码一个 Tag
///
/// 头部不完整, 类型无效, 或声明的大小超出缓冲区时返回致命错误.
pub fn decode_tag(data: &[u8], position: usize) -> ZhenResult<DecodedTag> {
    let available = data.len().saturating_sub(position);
    if available < TAG_HEADER_SIZE {
        return Err(ZhenError::TruncatedTag {
            position,
            needed: TAG_HEADER_SIZE,
            available,
        });
    }

    let mut r = ByteReader::new(&data[position..]);
    let header = TagHeader::read(&mut r)?;
    let needed = TAG_HEADER_SIZE + header.data_size as usize;
    if needed > available {
        return Err(ZhenError::TruncatedTag {
            position,
            needed,
            available,
        });
    }
    let payload = r.read_bytes(header.data_size as usize)?;

    let mut frame = Frame {
        kind: header.kind,
        timestamp_ms: header.timestamp,
        payload_size: header.data_size,
        file_position: position as u64,
        is_keyframe: false,
        is_sequence_header: false,
        details: String::new(),
    };
    let mut video_info = None;
    let mut keyframe_positions = None;

    match header.kind {
        TagKind::Video if !payload.is_empty() => {
            let video = decode_video(payload);
            frame.is_keyframe = video.is_keyframe;
            frame.is_sequence_header = video.is_sequence_header;
            frame.details = video.details;
            video_info = video.video_info;
        }
        TagKind::Script if !payload.is_empty() => {
            let script = decode_script(payload);
            frame.details = script_details(&script);
            keyframe_positions = script.keyframe_positions;
        }
        _ => {}
    }

    Ok(DecodedTag {
        frame,
        video_info,
        keyframe_positions,
        next_position: position + needed,
    })
}

fn script_details(script: &ScriptData) -> String {
    match &script.error {
        None => script.summary(),
        Some(e) => format!("{}解析Script数据时出错: {e}", script.summary()),
    }
}

struct VideoPayload {
    is_keyframe: bool,
    is_sequence_header: bool,
    details: String,
    video_info: Option<VideoInfo>,
}

/// 解码视频负载, 内部错误转换为描述文本
fn decode_video(payload: &[u8]) -> VideoPayload {
    let frame_type = VideoFrameType::from_nibble(payload[0] >> 4);
    let codec = VideoCodec::from_nibble(payload[0] & 0x0F);
    let mut video = VideoPayload {
        is_keyframe: frame_type == VideoFrameType::Key,
        is_sequence_header: false,
        details: format!("帧类型: {frame_type}, 编码: {codec}\n"),
        video_info: None,
    };

    if codec == VideoCodec::Avc {
        if let Err(e) = decode_avc(payload, &mut video) {
            warn!("FLV: 解析视频数据失败: {e}");
            video.details = format!("解析视频数据时出错: {e}");
        }
    }
    video
}

fn decode_avc(payload: &[u8], video: &mut VideoPayload) -> ZhenResult<()> {
    let mut r = ByteReader::new(payload);
    r.skip(1)?;
    let packet_type = r.read_u8()?;
    video.is_sequence_header = packet_type == AVC_SEQUENCE_HEADER;
    // 序列头的配置记录紧跟在 CTS 之后, 其余包类型的 CTS 缺失时只省略显示
    let composition_time = if video.is_sequence_header || r.remaining() >= 3 {
        Some(r.read_i24_be()?)
    } else {
        None
    };

    let packet_name = match packet_type {
        AVC_SEQUENCE_HEADER => "序列头".to_string(),
        AVC_NALU => "NALU".to_string(),
        AVC_END_OF_SEQUENCE => "序列结束".to_string(),
        other => format!("未知({other})"),
    };
    match composition_time {
        Some(cts) => video
            .details
            .push_str(&format!("AVC包类型: {packet_name}, CTS: {cts}ms\n")),
        None => video.details.push_str(&format!("AVC包类型: {packet_name}\n")),
    }

    if video.is_sequence_header {
        let record = r.read_bytes(r.remaining())?;
        let config = AvcDecoderConfig::parse(record)?;
        debug!(
            "FLV: 收到 AVC 序列头, profile={} level={}",
            config.profile(),
            config.level()
        );
        video.details = format!("序列头帧\n{}{}", video.details, config.details());
        video.video_info = config.video_info();
    }
    Ok(())
}
