//! 解析结果.

use std::fmt;

use serde::Serialize;
use zhen_core::ZhenError;

use crate::tag::Frame;

/// 终止解析的致命错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseError {
    /// 错误描述
    pub message: String,
    /// 出错位置 (字节偏移)
    pub offset: u64,
    /// 出错前已解码的帧数
    pub frames_decoded: usize,
}

impl ParseError {
    pub fn new(error: &ZhenError, offset: u64, frames_decoded: usize) -> Self {
        Self {
            message: error.to_string(),
            offset,
            frames_decoded,
        }
    }

    /// 偏移的十六进制 + 十进制表示, 如 `0x1A (26 字节)`
    pub fn offset_display(&self) -> String {
        format!("0x{:X} ({} 字节)", self.offset, self.offset)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (偏移 {}, 已解析 {} 帧)",
            self.message,
            self.offset_display(),
            self.frames_decoded
        )
    }
}

impl std::error::Error for ParseError {}

/// 一次完整解析的返回值
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseResult {
    /// 按文件顺序排列的帧
    pub frames: Vec<Frame>,
    /// 致命错误 (解析正常结束时为 None)
    pub error: Option<ParseError>,
    /// 是否被取消
    pub cancelled: bool,
}

impl ParseResult {
    /// 解析是否完整走到了文件末尾
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && !self.cancelled
    }
}
