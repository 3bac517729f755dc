//! # zhen-format
//!
//! FLV 容器逐帧解析: Tag 边界, 时间戳, 视频序列头信息, onMetaData 与关键帧索引.
//!
//! 输入是加载到内存的完整文件. 解析可以同步运行, 也可以在 tokio 任务中
//! 逐 Tag 让出调度器, 并通过 [`ParseHandle`] 暂停, 恢复或取消.

pub mod amf0;
pub mod control;
pub mod demuxer;
pub mod display;
pub mod event;
pub mod io;
pub mod keyframes;
pub mod result;
pub mod script;
pub mod tag;

// 重导出常用类型
pub use control::{ControlState, ParseHandle};
pub use demuxer::{DemuxOptions, FlvDemuxer, FlvHeader, RunState, parse, parse_async};
pub use display::{format_size, format_timestamp};
pub use event::{ProgressCallback, ProgressEvent};
pub use keyframes::KeyframeReport;
pub use result::{ParseError, ParseResult};
pub use tag::{Frame, TagKind};
