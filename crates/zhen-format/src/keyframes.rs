//! 关键帧索引校验.
//!
//! onMetaData 中的 `filepositions` 应当逐一对应视频关键帧 Tag 的文件偏移.
//! 不一致只作为警告报告, 不影响解析结果.

use std::collections::HashSet;

use log::warn;
use serde::Serialize;

use crate::tag::{Frame, TagKind};

/// 校验报告
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeyframeReport {
    /// 索引中的位置数
    pub indexed: usize,
    /// 与视频关键帧对上的位置数
    pub matched: usize,
    /// 找不到对应关键帧的位置 (可疑)
    pub missing: Vec<u64>,
    /// 不在索引中的关键帧位置
    pub unindexed_keyframes: Vec<u64>,
}

impl KeyframeReport {
    /// 索引与关键帧是否完全一致
    pub fn is_consistent(&self) -> bool {
        self.missing.is_empty() && self.unindexed_keyframes.is_empty()
    }
}

/// 对照帧序列校验关键帧索引
pub fn validate(frames: &[Frame], positions: &[u64]) -> KeyframeReport {
    let keyframes: Vec<u64> = frames
        .iter()
        .filter(|f| f.kind == TagKind::Video && f.is_keyframe)
        .map(|f| f.file_position)
        .collect();
    let keyframe_set: HashSet<u64> = keyframes.iter().copied().collect();
    let index_set: HashSet<u64> = positions.iter().copied().collect();

    let missing: Vec<u64> = positions
        .iter()
        .copied()
        .filter(|p| !keyframe_set.contains(p))
        .collect();
    let unindexed_keyframes: Vec<u64> = if positions.is_empty() {
        Vec::new()
    } else {
        keyframes
            .into_iter()
            .filter(|p| !index_set.contains(p))
            .collect()
    };

    let report = KeyframeReport {
        indexed: positions.len(),
        matched: positions.len() - missing.len(),
        missing,
        unindexed_keyframes,
    };
    if !report.missing.is_empty() {
        warn!(
            "FLV: 关键帧索引中有 {} 个位置没有对应的关键帧, 首个: {}",
            report.missing.len(),
            report.missing[0]
        );
    }
    if !report.unindexed_keyframes.is_empty() {
        warn!(
            "FLV: {} 个关键帧不在索引中",
            report.unindexed_keyframes.len()
        );
    }
    report
}
