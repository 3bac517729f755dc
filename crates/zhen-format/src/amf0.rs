//! AMF0 值解码.
//!
//! FLV 的 Script Tag 使用 AMF0 序列化. 这里只支持 onMetaData 中实际出现的类型:
//!
//! ```text
//! 0x00 Number        8 bytes IEEE-754 double (BE)
//! 0x01 Boolean       1 byte, 非 0 为 true
//! 0x02 String        u16 长度 + 字节 (按 Latin-1 逐字节解码)
//! 0x03 Object        { u16 名称长度 + 名称 + 值 }* + 00 00 09
//! 0x08 ECMA Array    u32 数量 + 与 Object 相同的属性列表
//! 0x0A Strict Array  u32 数量 + 值 (元素只支持 Number/Boolean/String)
//! ```
//!
//! 其余类型解码为 [`AmfValue::Unsupported`], 由调用方决定放弃剩余数据.

use std::fmt;

use log::warn;
use zhen_core::{ZhenError, ZhenResult};

use crate::io::ByteReader;

pub const AMF0_NUMBER: u8 = 0x00;
pub const AMF0_BOOLEAN: u8 = 0x01;
pub const AMF0_STRING: u8 = 0x02;
pub const AMF0_OBJECT: u8 = 0x03;
pub const AMF0_ECMA_ARRAY: u8 = 0x08;
pub const AMF0_OBJECT_END: u8 = 0x09;
pub const AMF0_STRICT_ARRAY: u8 = 0x0A;

/// AMF0 值
#[derive(Debug, Clone, PartialEq)]
pub enum AmfValue {
    Number(f64),
    Bool(bool),
    Str(String),
    /// 保持原始顺序的属性列表
    Object(Vec<(String, AmfValue)>),
    Array(Vec<AmfValue>),
    /// Strict Array 中不支持的元素占位
    Null,
    /// 不支持的类型标记
    Unsupported(u8),
}

impl AmfValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[AmfValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// 按名称查找对象属性 (重名时取最后一个)
    pub fn get(&self, name: &str) -> Option<&AmfValue> {
        match self {
            Self::Object(props) => props.iter().rev().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl fmt::Display for AmfValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Object(props) => {
                write!(f, "{{")?;
                for (i, (k, v)) in props.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Self::Array(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Self::Null => write!(f, "null"),
            Self::Unsupported(marker) => write!(f, "[Type: {marker}]"),
        }
    }
}

/// 读取 AMF0 短字符串体 (u16 长度 + 字节, 不含类型标记)
pub fn read_short_string(r: &mut ByteReader<'_>) -> ZhenResult<String> {
    let len = usize::from(r.read_u16_be()?);
    r.read_latin1(len)
}

/// 对象最大嵌套层数, 超过时按数据错误处理
pub const MAX_AMF_DEPTH: usize = 64;

/// 读取带类型标记的值
///
/// 遇到不支持的类型标记时只消耗标记本身, 返回 [`AmfValue::Unsupported`].
pub fn read_value(r: &mut ByteReader<'_>) -> ZhenResult<AmfValue> {
    read_value_at(r, 0)
}

/// 在第 `depth` 层读取一个值
pub(crate) fn read_value_at(r: &mut ByteReader<'_>, depth: usize) -> ZhenResult<AmfValue> {
    let marker = r.read_u8()?;
    match marker {
        AMF0_NUMBER => Ok(AmfValue::Number(r.read_f64_be()?)),
        AMF0_BOOLEAN => Ok(AmfValue::Bool(r.read_u8()? != 0)),
        AMF0_STRING => Ok(AmfValue::Str(read_short_string(r)?)),
        AMF0_OBJECT => {
            if depth >= MAX_AMF_DEPTH {
                return Err(ZhenError::InvalidData(format!(
                    "AMF0 对象嵌套超过 {MAX_AMF_DEPTH} 层, 位置 {}",
                    r.position()
                )));
            }
            Ok(AmfValue::Object(read_properties_at(r, depth + 1)?))
        }
        AMF0_STRICT_ARRAY => read_strict_array(r),
        other => Ok(AmfValue::Unsupported(other)),
    }
}

/// 读取对象属性列表, 直到 `00 00 09` 结束标记或剩余不足 3 字节
///
/// 属性值不受支持时, 保留已读属性并放弃剩余全部数据.
pub fn read_properties(r: &mut ByteReader<'_>) -> ZhenResult<Vec<(String, AmfValue)>> {
    read_properties_at(r, 0)
}

fn read_properties_at(
    r: &mut ByteReader<'_>,
    depth: usize,
) -> ZhenResult<Vec<(String, AmfValue)>> {
    let mut props = Vec::new();
    while r.remaining() > 3 {
        let name = read_short_string(r)?;
        if name.is_empty() && r.peek_u8() == Some(AMF0_OBJECT_END) {
            r.skip(1)?;
            return Ok(props);
        }
        let value = read_value_at(r, depth)?;
        let unsupported = matches!(value, AmfValue::Unsupported(_));
        props.push((name, value));
        if unsupported {
            r.skip_to_end();
            return Ok(props);
        }
    }
    // 循环因剩余 3 字节而结束时, 这 3 字节就是结束标记
    if r.remaining() == 3 {
        let mut tail = r.clone();
        if tail.read_u16_be()? == 0 && tail.read_u8()? == AMF0_OBJECT_END {
            r.skip(3)?;
        }
    }
    Ok(props)
}

fn read_strict_array(r: &mut ByteReader<'_>) -> ZhenResult<AmfValue> {
    let count = r.read_u32_be()? as usize;
    // 每个元素至少 1 字节类型标记
    let mut items = Vec::with_capacity(count.min(r.remaining()));
    for _ in 0..count {
        let marker = r.read_u8()?;
        let item = match marker {
            AMF0_NUMBER => AmfValue::Number(r.read_f64_be()?),
            AMF0_BOOLEAN => AmfValue::Bool(r.read_u8()? != 0),
            AMF0_STRING => AmfValue::Str(read_short_string(r)?),
            other => {
                warn!("AMF0: 未知的数组元素类型: {other}");
                AmfValue::Null
            }
        };
        items.push(item);
    }
    Ok(AmfValue::Array(items))
}
