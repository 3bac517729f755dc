//! FLV 解封装器.
//!
//! # FLV 文件结构
//! ```text
//! FLV Header (9 bytes):
//!   "FLV" (3 bytes)
//!   Version (1 byte, 通常 = 1)
//!   Flags (1 byte): bit0=video, bit2=audio
//!   DataOffset (4 bytes, BE): 头部大小 (通常 9)
//!
//! PreviousTagSize0 (4 bytes, BE)
//! Tag #1
//! PreviousTagSize1 (4 bytes, BE)
//! Tag #2 ...
//! ```
//!
//! 解封装器是一个可恢复的状态机: [`FlvDemuxer::step`] 每次只解码一个 Tag,
//! 驱动循环在 Tag 之间检查 [`ParseHandle`] 的控制状态.
//! 暂停不丢弃任何状态, 恢复后从当前游标继续, 已解码的帧不会重放.

use bytes::Bytes;
use log::{debug, info, warn};
use zhen_codec::VideoInfo;
use zhen_core::{ZhenError, ZhenResult};

use crate::control::{ControlState, ParseHandle};
use crate::event::{ProgressCallback, ProgressEvent, progress_percent};
use crate::io::ByteReader;
use crate::keyframes::{KeyframeReport, validate};
use crate::result::{ParseError, ParseResult};
use crate::tag::{DecodedTag, Frame, decode_tag};

/// FLV 文件头部大小
pub const FLV_HEADER_SIZE: usize = 9;

/// PreviousTagSize 字段大小
const PREVIOUS_TAG_SIZE: usize = 4;

/// FLV 文件头部
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlvHeader {
    pub version: u8,
    pub flags: u8,
    /// 头部声明的大小, 即第一个 PreviousTagSize 的位置
    pub header_size: u32,
}

impl FlvHeader {
    /// 读取并校验文件头部
    pub fn parse(data: &[u8]) -> ZhenResult<Self> {
        if data.len() >= 3 && &data[..3] != b"FLV" {
            return Err(ZhenError::InvalidSignature);
        }
        if data.len() < FLV_HEADER_SIZE {
            return Err(ZhenError::TruncatedHeader);
        }

        let mut r = ByteReader::new(data);
        r.skip(3)?;
        let version = r.read_u8()?;
        let flags = r.read_u8()?;
        let header_size = r.read_u32_be()?;
        if header_size as usize > data.len() {
            return Err(ZhenError::HeaderOutOfBounds {
                header_size,
                len: data.len(),
            });
        }
        if (header_size as usize) < FLV_HEADER_SIZE {
            warn!("FLV: 头部大小 {header_size} 小于标准的 {FLV_HEADER_SIZE} 字节");
        }

        Ok(Self {
            version,
            flags,
            header_size,
        })
    }

    pub fn has_audio(&self) -> bool {
        self.flags & 0x04 != 0
    }

    pub fn has_video(&self) -> bool {
        self.flags & 0x01 != 0
    }
}

/// 解封装选项
#[derive(Debug, Clone)]
pub struct DemuxOptions {
    /// 异步驱动每解码多少个 Tag 让出一次调度器
    pub yield_every: usize,
}

impl Default for DemuxOptions {
    fn default() -> Self {
        Self { yield_every: 1 }
    }
}

/// 驱动循环返回时的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// 暂停在 Tag 边界, 可以继续
    Paused,
    /// 已到达文件末尾或遇到致命错误
    Completed,
    /// 被取消
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Header,
    Tags,
    Finished,
}

/// FLV 解封装器
///
/// 一个实例只对应一次解析, 不在多个解析之间共享.
pub struct FlvDemuxer {
    data: Bytes,
    position: usize,
    stage: Stage,
    header: Option<FlvHeader>,
    frames: Vec<Frame>,
    error: Option<ParseError>,
    cancelled: bool,
    video_info: VideoInfo,
    keyframe_positions: Vec<u64>,
    handle: ParseHandle,
    options: DemuxOptions,
    on_progress: Option<ProgressCallback>,
}

impl FlvDemuxer {
    /// 为内存中的完整 FLV 文件创建解封装器
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self::with_options(data, DemuxOptions::default())
    }

    pub fn with_options(data: impl Into<Bytes>, options: DemuxOptions) -> Self {
        Self {
            data: data.into(),
            position: 0,
            stage: Stage::Header,
            header: None,
            frames: Vec::new(),
            error: None,
            cancelled: false,
            video_info: VideoInfo::default(),
            keyframe_positions: Vec::new(),
            handle: ParseHandle::new(),
            options,
            on_progress: None,
        }
    }

    /// 设置进度回调
    pub fn set_progress_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&ProgressEvent<'_>) + Send + 'static,
    {
        self.on_progress = Some(Box::new(callback));
    }

    /// 获取控制句柄 (与解封装器共享状态)
    pub fn handle(&self) -> ParseHandle {
        self.handle.clone()
    }

    pub fn pause(&self) {
        self.handle.pause();
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }

    pub fn is_paused(&self) -> bool {
        self.handle.is_paused()
    }

    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Finished
    }

    pub fn header(&self) -> Option<&FlvHeader> {
        self.header.as_ref()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn video_info(&self) -> &VideoInfo {
        &self.video_info
    }

    pub fn keyframe_positions(&self) -> &[u64] {
        &self.keyframe_positions
    }

    pub fn error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    /// 当前游标位置
    pub fn position(&self) -> usize {
        self.position
    }

    /// 对照已解码的帧校验关键帧索引
    pub fn keyframe_report(&self) -> KeyframeReport {
        validate(&self.frames, &self.keyframe_positions)
    }

    /// 执行一步: 解析头部或解码一个 Tag
    ///
    /// 返回 false 表示解析已结束 (到达末尾, 致命错误或已取消).
    pub fn step(&mut self) -> bool {
        match self.stage {
            Stage::Header => {
                match FlvHeader::parse(&self.data) {
                    Ok(header) => {
                        debug!(
                            "FLV: version={} flags=0x{:02X} header_size={} has_audio={} has_video={}",
                            header.version,
                            header.flags,
                            header.header_size,
                            header.has_audio(),
                            header.has_video()
                        );
                        self.position = header.header_size as usize;
                        self.header = Some(header);
                        self.stage = Stage::Tags;
                    }
                    Err(e) => self.fail(&e, 0),
                }
                true
            }
            Stage::Tags => {
                if self.data.len().saturating_sub(self.position) <= PREVIOUS_TAG_SIZE {
                    debug!("FLV: 解析完成, 共 {} 帧", self.frames.len());
                    self.stage = Stage::Finished;
                    return false;
                }
                // PreviousTagSize 只跳过, 不与上一个 Tag 的实际大小比对
                let tag_position = self.position + PREVIOUS_TAG_SIZE;
                match decode_tag(&self.data, tag_position) {
                    Ok(decoded) => self.apply(decoded),
                    Err(e) => {
                        self.position = tag_position;
                        self.fail(&e, tag_position as u64);
                    }
                }
                true
            }
            Stage::Finished => false,
        }
    }

    /// 同步驱动: 一直解析到结束, 暂停或取消
    pub fn run(&mut self) -> RunState {
        loop {
            if self.is_finished() {
                return self.terminal_state();
            }
            match self.handle.state() {
                ControlState::Running => {}
                ControlState::Paused => {
                    debug!("FLV: 在位置 {} 暂停, 已解析 {} 帧", self.position, self.frames.len());
                    return RunState::Paused;
                }
                ControlState::Cancelled => return self.abort(),
            }
            self.step();
        }
    }

    /// 解除暂停并从当前游标继续同步解析
    pub fn resume(&mut self) -> RunState {
        self.handle.resume();
        self.run()
    }

    /// 异步驱动: 每 `yield_every` 个 Tag 让出一次调度器
    ///
    /// 暂停时等待控制状态变化而不是返回, 其他任务通过 [`ParseHandle`] 恢复或取消.
    pub async fn run_async(&mut self) -> RunState {
        let mut rx = self.handle.subscribe();
        let yield_every = self.options.yield_every.max(1);
        let mut since_yield = 0;

        loop {
            if self.is_finished() {
                return self.terminal_state();
            }

            loop {
                let state = *rx.borrow_and_update();
                match state {
                    ControlState::Running => break,
                    ControlState::Cancelled => return self.abort(),
                    ControlState::Paused => {
                        debug!("FLV: 在位置 {} 暂停, 等待恢复", self.position);
                        if rx.changed().await.is_err() {
                            return self.abort();
                        }
                    }
                }
            }

            self.step();
            since_yield += 1;
            if since_yield >= yield_every {
                since_yield = 0;
                tokio::task::yield_now().await;
            }
        }
    }

    /// 当前累计的结果
    pub fn result(&self) -> ParseResult {
        ParseResult {
            frames: self.frames.clone(),
            error: self.error.clone(),
            cancelled: self.cancelled,
        }
    }

    pub fn into_result(self) -> ParseResult {
        ParseResult {
            frames: self.frames,
            error: self.error,
            cancelled: self.cancelled,
        }
    }

    fn apply(&mut self, decoded: DecodedTag) {
        let DecodedTag {
            frame,
            video_info,
            keyframe_positions,
            next_position,
        } = decoded;

        if let Some(info) = video_info {
            debug!(
                "FLV: 视频信息 {}x{} profile={:?} level={}",
                info.width, info.height, info.profile, info.level
            );
            self.video_info = info;
        }
        if let Some(positions) = keyframe_positions {
            info!("FLV: 发现关键帧索引, {} 个位置", positions.len());
            self.keyframe_positions = positions;
            self.emit(false);
        }

        self.position = next_position;
        self.frames.push(frame);
        self.emit(true);
    }

    fn emit(&mut self, with_current: bool) {
        let Some(callback) = self.on_progress.as_mut() else {
            return;
        };
        let event = ProgressEvent {
            frames: &self.frames,
            current_frame: if with_current { self.frames.last() } else { None },
            progress: progress_percent(self.position, self.data.len()),
            has_keyframe_positions: !self.keyframe_positions.is_empty(),
        };
        callback(&event);
    }

    fn fail(&mut self, error: &ZhenError, offset: u64) {
        let parse_error = ParseError::new(error, offset, self.frames.len());
        warn!("FLV: 解析终止: {parse_error}");
        self.error = Some(parse_error);
        self.stage = Stage::Finished;
    }

    fn abort(&mut self) -> RunState {
        if !self.is_finished() {
            debug!("FLV: 在位置 {} 取消, 已解析 {} 帧", self.position, self.frames.len());
            self.cancelled = true;
            self.stage = Stage::Finished;
        }
        self.terminal_state()
    }

    fn terminal_state(&self) -> RunState {
        if self.cancelled {
            RunState::Cancelled
        } else {
            RunState::Completed
        }
    }
}

/// 同步解析整个缓冲区
pub fn parse(data: impl Into<Bytes>) -> ParseResult {
    let mut demuxer = FlvDemuxer::new(data);
    demuxer.run();
    demuxer.into_result()
}

/// 异步解析整个缓冲区, 每个 Tag 之后让出调度器
pub async fn parse_async(data: impl Into<Bytes>) -> ParseResult {
    let mut demuxer = FlvDemuxer::new(data);
    demuxer.run_async().await;
    demuxer.into_result()
}
