//! Script Tag (onMetaData) 解码.
//!
//! Script Tag 负载由两个 AMF0 值组成: 事件名称字符串 + 参数.
//! 只有事件名为 `onMetaData` 时才解析后续的 ECMA 数组, 并从中提取关键帧索引:
//!
//! - `keyframes` 对象中的 `filepositions` 数组 (常见布局)
//! - 顶层直接出现的 `filepositions` 数组 (兼容布局)
//!
//! 两种布局都只在至少有一个可用位置时才记录.
//!
//! 解码出错时保留已解码的属性和已发现的关键帧索引, 错误单独返回.

use log::{debug, warn};
use zhen_core::{ZhenError, ZhenResult};

use crate::amf0::{
    AMF0_ECMA_ARRAY, AMF0_OBJECT, AMF0_OBJECT_END, AMF0_STRING, AmfValue, read_short_string,
    read_value_at,
};
use crate::io::ByteReader;

/// onMetaData 事件名
pub const ON_METADATA: &str = "onMetaData";

/// Script Tag 解码结果
#[derive(Debug, Default)]
pub struct ScriptData {
    /// 事件名称
    pub name: String,
    /// 已解码的属性 (按出现顺序)
    pub properties: Vec<(String, AmfValue)>,
    /// 最后一次发现的关键帧文件位置
    pub keyframe_positions: Option<Vec<u64>>,
    /// `times` 数组 (秒), 仅用于显示
    pub times: Option<Vec<f64>>,
    /// 解码中途遇到的错误, 之前的结果仍然有效
    pub error: Option<ZhenError>,
}

impl ScriptData {
    /// 多行摘要文本
    pub fn summary(&self) -> String {
        if self.name != ON_METADATA {
            return String::new();
        }
        let mut out = format!("{ON_METADATA}:\n");
        for (name, value) in &self.properties {
            out.push_str(&format!("  {name}: {value}\n"));
        }
        out
    }
}

/// 解码一个 Script Tag 负载
pub fn decode_script(payload: &[u8]) -> ScriptData {
    let mut data = ScriptData::default();
    let mut r = ByteReader::new(payload);
    if let Err(e) = decode_into(&mut r, &mut data) {
        warn!("FLV: Script 数据解码失败, 位置 {}: {}", r.position(), e);
        data.error = Some(e);
    }
    data
}

fn decode_into(r: &mut ByteReader<'_>, data: &mut ScriptData) -> ZhenResult<()> {
    let marker = r.read_u8()?;
    if marker != AMF0_STRING {
        return Err(ZhenError::InvalidData(format!(
            "无效的Script数据类型: {marker}"
        )));
    }
    data.name = read_short_string(r)?;
    if data.name != ON_METADATA {
        debug!("FLV: 忽略 Script 事件 {}", data.name);
        return Ok(());
    }

    match r.read_u8()? {
        AMF0_ECMA_ARRAY => {
            // 数量字段只作参考, 以负载边界为准
            let declared = r.read_u32_be()?;
            debug!("FLV: onMetaData ECMA 数组, 声明 {declared} 项");
        }
        AMF0_OBJECT => {}
        other => {
            return Err(ZhenError::InvalidData(format!(
                "onMetaData 参数类型不支持: {other}"
            )));
        }
    }

    walk_metadata(r, data)
}

/// 逐个属性解码, 每个属性解码完立即处理关键帧索引
///
/// 结束规则与 [`crate::amf0::read_properties`] 相同, 但属性逐个落入 `data`,
/// 中途出错时已解码的属性和索引都会保留.
fn walk_metadata(r: &mut ByteReader<'_>, data: &mut ScriptData) -> ZhenResult<()> {
    while r.remaining() > 3 {
        let name = read_short_string(r)?;
        if name.is_empty() && r.peek_u8() == Some(AMF0_OBJECT_END) {
            r.skip(1)?;
            break;
        }
        let value = read_value_at(r, 1)?;
        let unsupported = matches!(value, AmfValue::Unsupported(_));
        inspect_property(&name, &value, data);
        data.properties.push((name, value));
        if unsupported {
            r.skip_to_end();
            break;
        }
    }
    Ok(())
}

fn inspect_property(name: &str, value: &AmfValue, data: &mut ScriptData) {
    match name {
        "keyframes" => {
            if let Some(items) = value.get("filepositions").and_then(AmfValue::as_array) {
                record_positions("keyframes.filepositions", items, data);
            }
        }
        "filepositions" => match value.as_array() {
            Some(items) => record_positions("filepositions", items, data),
            None => warn!("FLV: 无效的 filepositions: {value}"),
        },
        "times" => {
            let times: Vec<f64> = value
                .as_array()
                .map(|items| items.iter().filter_map(AmfValue::as_number).collect())
                .unwrap_or_default();
            debug!("FLV: 发现 times 数组, {} 项", times.len());
            data.times = Some(times);
        }
        _ => {}
    }
}

/// 至少有一个可用位置时才记录为关键帧索引
fn record_positions(source: &str, items: &[AmfValue], data: &mut ScriptData) {
    let positions = to_positions(items);
    if positions.is_empty() {
        warn!("FLV: {source} 中没有可用的关键帧位置, 共 {} 项", items.len());
        return;
    }
    debug!("FLV: {source} 中发现 {} 个关键帧位置", positions.len());
    data.keyframe_positions = Some(positions);
}

/// AMF0 数字转为文件偏移, 无法表示为偏移的元素丢弃
fn to_positions(items: &[AmfValue]) -> Vec<u64> {
    items
        .iter()
        .filter_map(|item| match item {
            AmfValue::Number(n) if n.is_finite() && *n >= 0.0 && *n <= u64::MAX as f64 => {
                Some(*n as u64)
            }
            other => {
                warn!("FLV: 忽略无效的关键帧位置: {other}");
                None
            }
        })
        .collect()
}
