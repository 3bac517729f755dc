//! 进度事件.

use crate::tag::Frame;

/// 每解码一个 Tag, 以及每次发现关键帧索引时发出的事件
#[derive(Debug, Clone, Copy)]
pub struct ProgressEvent<'a> {
    /// 到目前为止解码的全部帧
    pub frames: &'a [Frame],
    /// 刚解码的帧; 关键帧索引事件为 None
    pub current_frame: Option<&'a Frame>,
    /// 完成百分比 (0-100)
    pub progress: f64,
    /// 是否已发现关键帧索引
    pub has_keyframe_positions: bool,
}

/// 进度回调
pub type ProgressCallback = Box<dyn FnMut(&ProgressEvent<'_>) + Send>;

/// 按游标位置计算完成百分比
pub(crate) fn progress_percent(position: usize, len: usize) -> f64 {
    if len == 0 {
        return 100.0;
    }
    (position as f64 / len as f64 * 100.0).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(0, 200), 0.0);
        assert_eq!(progress_percent(50, 200), 25.0);
        assert_eq!(progress_percent(200, 200), 100.0);
        assert_eq!(progress_percent(0, 0), 100.0);
    }
}
