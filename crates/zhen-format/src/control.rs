//! 暂停 / 恢复 / 取消控制.
//!
//! 解封装器在每个 Tag 之间检查一次控制状态. 状态保存在 `tokio::sync::watch`
//! 通道中, 异步驱动暂停时等待状态变化, 同步驱动暂停时直接返回.

use std::sync::Arc;

use log::debug;
use tokio::sync::watch;

/// 控制状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Running,
    Paused,
    /// 终态, 之后的 pause/resume 不再生效
    Cancelled,
}

/// 解析控制句柄, 可以克隆后交给其他任务或回调
#[derive(Debug, Clone)]
pub struct ParseHandle {
    tx: Arc<watch::Sender<ControlState>>,
}

impl Default for ParseHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ParseHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ControlState::Running);
        Self { tx: Arc::new(tx) }
    }

    /// 当前状态
    pub fn state(&self) -> ControlState {
        *self.tx.borrow()
    }

    /// 在下一个 Tag 边界暂停
    pub fn pause(&self) {
        self.transition(ControlState::Running, ControlState::Paused);
    }

    /// 解除暂停
    pub fn resume(&self) {
        self.transition(ControlState::Paused, ControlState::Running);
    }

    /// 在下一个 Tag 边界终止解析, 已解码的帧保留
    pub fn cancel(&self) {
        let previous = self.tx.send_replace(ControlState::Cancelled);
        if previous != ControlState::Cancelled {
            debug!("解析控制: {previous:?} -> Cancelled");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.state() == ControlState::Paused
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == ControlState::Cancelled
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ControlState> {
        self.tx.subscribe()
    }

    fn transition(&self, from: ControlState, to: ControlState) {
        let changed = self.tx.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        });
        if changed {
            debug!("解析控制: {from:?} -> {to:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_resume_idempotent() {
        let handle = ParseHandle::new();
        assert_eq!(handle.state(), ControlState::Running);

        handle.pause();
        handle.pause();
        assert!(handle.is_paused());

        handle.resume();
        handle.resume();
        assert_eq!(handle.state(), ControlState::Running);
    }

    #[test]
    fn test_cancel_is_terminal() {
        let handle = ParseHandle::new();
        handle.pause();
        handle.cancel();
        assert!(handle.is_cancelled());

        handle.resume();
        handle.pause();
        assert!(handle.is_cancelled());
    }

    #[test]
    fn test_clones_share_state() {
        let handle = ParseHandle::new();
        let other = handle.clone();
        other.pause();
        assert!(handle.is_paused());
    }

    #[tokio::test]
    async fn test_subscriber_sees_resume() {
        let handle = ParseHandle::new();
        handle.pause();
        let mut rx = handle.subscribe();
        assert_eq!(*rx.borrow_and_update(), ControlState::Paused);

        let remote = handle.clone();
        tokio::spawn(async move { remote.resume() });

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), ControlState::Running);
    }
}
