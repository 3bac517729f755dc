//! 统一错误类型定义.
//!
//! 所有 zhen crate 共用的错误类型. 解封装过程中的错误分为两级:
//! 结构性错误 (签名, 头部, Tag 类型, Tag 越界) 会终止整个解析;
//! 负载内容错误 (AVC 配置, SPS, AMF0) 只会体现在单个帧的描述里.

use thiserror::Error;

/// zhen 统一错误类型
#[derive(Debug, Error)]
pub enum ZhenError {
    /// 文件签名不是 "FLV"
    #[error("无效的FLV文件签名")]
    InvalidSignature,

    /// 文件头部不足 9 字节
    #[error("FLV 文件头部数据不完整")]
    TruncatedHeader,

    /// 头部声明的大小超出缓冲区
    #[error("FLV 头部大小越界: header_size={header_size}, len={len}")]
    HeaderOutOfBounds { header_size: u32, len: usize },

    /// 不是 8/9/18 的 Tag 类型
    #[error("无效的标签类型: {0}")]
    InvalidTagType(u8),

    /// Tag 头部或数据超出缓冲区末尾
    #[error("标签数据不完整: position={position}, needed={needed}, available={available}")]
    TruncatedTag {
        position: usize,
        needed: usize,
        available: usize,
    },

    /// 比特流读取超出声明长度
    #[error("比特流越界: 需要 {requested} 位, 剩余 {available} 位")]
    BitstreamOverrun { requested: usize, available: usize },

    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 无效数据 (损坏的码流等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 已到达数据末尾
    #[error("已到达数据末尾")]
    Eof,

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
}

impl ZhenError {
    /// 是否为终止整个解析的结构性错误
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidSignature
                | Self::TruncatedHeader
                | Self::HeaderOutOfBounds { .. }
                | Self::InvalidTagType(_)
                | Self::TruncatedTag { .. }
        )
    }
}

/// zhen 统一 Result 类型
pub type ZhenResult<T> = Result<T, ZhenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ZhenError::InvalidSignature.is_fatal());
        assert!(ZhenError::InvalidTagType(7).is_fatal());
        assert!(
            ZhenError::TruncatedTag {
                position: 13,
                needed: 20,
                available: 4,
            }
            .is_fatal()
        );
        assert!(
            !ZhenError::BitstreamOverrun {
                requested: 1,
                available: 0,
            }
            .is_fatal()
        );
        assert!(!ZhenError::InvalidData("x".into()).is_fatal());
    }

    #[test]
    fn test_error_message() {
        assert_eq!(ZhenError::InvalidTagType(7).to_string(), "无效的标签类型: 7");
        assert_eq!(ZhenError::InvalidSignature.to_string(), "无效的FLV文件签名");
    }
}
