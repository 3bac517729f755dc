//! zhen-probe - FLV 逐帧结构探测工具
//!
//! 把整个文件读入内存, 逐 Tag 解析后输出帧列表, 视频信息,
//! 关键帧索引校验结果以及终止解析的错误.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use log::debug;
use serde::Serialize;

use zhen::logging::{self, LoggingConfig};
use zhen_codec::VideoInfo;
use zhen_format::tag::Frame;
use zhen_format::{
    FlvDemuxer, FlvHeader, KeyframeReport, ParseError, RunState, format_size, format_timestamp,
};

/// FLV 逐帧结构探测工具
#[derive(Parser, Debug)]
#[command(name = "zhen-probe", version, about = "纯 Rust FLV 逐帧结构探测工具")]
struct Cli {
    /// 输入文件路径
    input: Option<PathBuf>,

    /// 显示帧列表
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    show_frames: bool,

    /// 最多显示的帧数
    #[arg(long)]
    limit: Option<usize>,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,

    /// 日志级别 (可被 ZHEN_LOG 环境变量覆盖)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// 日志文件目录, 不指定则只输出到控制台
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// 静默模式 (只输出探测结果)
    #[arg(short, long)]
    quiet: bool,
}

// ============================================================
// JSON 输出结构体
// ============================================================

/// 完整探测结果
#[derive(Serialize)]
struct ProbeOutput<'a> {
    filename: String,
    file_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    header: Option<HeaderInfo>,
    frame_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    frames: Option<&'a [Frame]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    video: Option<&'a VideoInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keyframes: Option<KeyframeSummary<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a ParseError>,
    cancelled: bool,
}

/// 文件头部信息
#[derive(Serialize)]
struct HeaderInfo {
    version: u8,
    has_audio: bool,
    has_video: bool,
    header_size: u32,
}

impl From<&FlvHeader> for HeaderInfo {
    fn from(header: &FlvHeader) -> Self {
        Self {
            version: header.version,
            has_audio: header.has_audio(),
            has_video: header.has_video(),
            header_size: header.header_size,
        }
    }
}

/// 关键帧索引与校验结果
#[derive(Serialize)]
struct KeyframeSummary<'a> {
    positions: &'a [u64],
    report: KeyframeReport,
}

// ============================================================
// 主逻辑
// ============================================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let Some(input) = cli.input.clone() else {
        print_banner();
        return;
    };

    let config = LoggingConfig {
        level: cli.log_level.clone(),
        directory: cli.log_dir.clone(),
        file_prefix: "zhen-probe".to_string(),
        ..LoggingConfig::default()
    };
    if let Err(e) = logging::init(&config) {
        eprintln!("错误: 日志初始化失败: {e:#}");
        process::exit(1);
    }

    match run(&cli, &input).await {
        Ok(true) => {}
        Ok(false) => process::exit(2),
        Err(e) => {
            eprintln!("错误: {e:#}");
            process::exit(1);
        }
    }
}

/// 解析并输出, 返回解析是否完整
async fn run(cli: &Cli, input: &Path) -> Result<bool> {
    let data = std::fs::read(input)
        .with_context(|| format!("无法读取文件 '{}'", input.display()))?;
    let file_size = data.len() as u64;

    if !cli.quiet {
        eprintln!(
            "zhen-probe 版本 {} -- 纯 Rust FLV 探测工具",
            zhen::version()
        );
        eprintln!("输入文件: {} ({})", input.display(), format_size(file_size));
    }

    let mut demuxer = FlvDemuxer::new(data);
    let show_progress = !cli.quiet && !cli.json;
    let mut last_decile = 0;
    demuxer.set_progress_callback(move |event| {
        if event.current_frame.is_none() {
            debug!("发现关键帧索引, 已解析 {} 帧", event.frames.len());
            return;
        }
        let decile = (event.progress / 10.0) as u32;
        if show_progress && decile > last_decile {
            last_decile = decile;
            eprint!("\r解析进度: {:>3}%", decile * 10);
        }
    });

    let state = demuxer.run_async().await;
    if show_progress {
        eprintln!();
    }
    debug!("解析结束: {state:?}");

    let frames = demuxer.frames();
    let shown = match cli.limit {
        Some(limit) => &frames[..limit.min(frames.len())],
        None => frames,
    };
    let keyframes = if demuxer.keyframe_positions().is_empty() {
        None
    } else {
        Some(KeyframeSummary {
            positions: demuxer.keyframe_positions(),
            report: demuxer.keyframe_report(),
        })
    };
    let video = demuxer.video_info();

    let output = ProbeOutput {
        filename: input.display().to_string(),
        file_size,
        header: demuxer.header().map(HeaderInfo::from),
        frame_count: frames.len(),
        frames: cli.show_frames.then_some(shown),
        video: (video.has_resolution() || video.profile.is_some()).then_some(video),
        keyframes,
        error: demuxer.error(),
        cancelled: state == RunState::Cancelled,
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("序列化 JSON 失败")?;
        println!("{json}");
    } else {
        print_text(&output);
    }

    Ok(output.error.is_none() && !output.cancelled)
}

fn print_text(output: &ProbeOutput<'_>) {
    if let Some(header) = &output.header {
        print_header_text(output, header);
    }
    if let Some(frames) = output.frames {
        print_frames_text(frames, output.frame_count);
    }
    if let Some(video) = output.video {
        print_video_text(video);
    }
    if let Some(keyframes) = &output.keyframes {
        print_keyframes_text(keyframes);
    }
    if let Some(error) = output.error {
        print_error_text(error);
    }
    if output.cancelled {
        println!("解析已取消, 共 {} 帧", output.frame_count);
    }
}

/// 文本输出: 文件头部
fn print_header_text(output: &ProbeOutput<'_>, header: &HeaderInfo) {
    println!("[HEADER]");
    println!("  文件名       : {}", output.filename);
    println!("  文件大小     : {}", format_size(output.file_size));
    println!("  版本         : {}", header.version);
    println!("  包含音频     : {}", header.has_audio);
    println!("  包含视频     : {}", header.has_video);
    println!("  头部大小     : {} 字节", header.header_size);
    println!("  帧数         : {}", output.frame_count);
    println!("[/HEADER]");
    println!();
}

/// 文本输出: 帧列表
fn print_frames_text(frames: &[Frame], total: usize) {
    println!("[FRAMES]");
    println!(
        "  {:>6}  {:<12}  {:<6}  {:>10}  {:>10}  详细信息",
        "序号", "时间戳", "类型", "大小", "位置"
    );
    for (index, frame) in frames.iter().enumerate() {
        let mut flags = String::new();
        if frame.is_keyframe {
            flags.push('K');
        }
        if frame.is_sequence_header {
            flags.push('S');
        }
        let details = frame
            .details
            .lines()
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("; ");
        println!(
            "  {:>6}  {:<12}  {:<6}  {:>10}  {:>10}  {:<2} {}",
            index,
            format_timestamp(u64::from(frame.timestamp_ms)),
            frame.kind,
            format_size(u64::from(frame.payload_size)),
            frame.file_position,
            flags,
            details
        );
    }
    if frames.len() < total {
        println!("  ... 省略 {} 帧", total - frames.len());
    }
    println!("[/FRAMES]");
    println!();
}

/// 文本输出: 视频信息
fn print_video_text(video: &VideoInfo) {
    println!("[VIDEO]");
    if video.has_resolution() {
        println!("  分辨率       : {}x{}", video.width, video.height);
    }
    if let Some(profile) = &video.profile {
        println!("  Profile      : {profile}");
    }
    println!("  Level        : {}", video.level);
    println!("[/VIDEO]");
    println!();
}

/// 文本输出: 关键帧索引
fn print_keyframes_text(keyframes: &KeyframeSummary<'_>) {
    let report = &keyframes.report;
    println!("[KEYFRAMES]");
    println!("  索引位置数   : {}", report.indexed);
    println!("  匹配关键帧   : {}", report.matched);
    if !report.missing.is_empty() {
        println!("  可疑位置     : {:?}", report.missing);
    }
    if !report.unindexed_keyframes.is_empty() {
        println!("  未索引关键帧 : {:?}", report.unindexed_keyframes);
    }
    println!(
        "  一致性       : {}",
        if report.is_consistent() { "一致" } else { "不一致" }
    );
    println!("[/KEYFRAMES]");
    println!();
}

/// 文本输出: 致命错误
fn print_error_text(error: &ParseError) {
    println!("[ERROR]");
    println!("  位置         : {}", error.offset_display());
    println!("  错误         : {}", error.message);
    println!("  已解析帧数   : {}", error.frames_decoded);
    println!("[/ERROR]");
    println!();
}

/// 打印版本横幅
fn print_banner() {
    println!(
        "zhen-probe 版本 {} -- 纯 Rust FLV 探测工具",
        zhen::version()
    );
    println!();
    println!("用法: zhen-probe [选项] <输入文件>");
    println!();
    println!("选项:");
    println!("  --show-frames <BOOL>  显示帧列表 (默认开启)");
    println!("  --limit <N>           最多显示 N 帧");
    println!("  --json                以 JSON 格式输出");
    println!("  --log-level <LEVEL>   日志级别 (默认 warn)");
    println!("  --log-dir <DIR>       日志文件目录");
    println!("  -q, --quiet           静默模式");
    println!();
    println!("使用 --help 查看完整用法.");
}
