//! 日志初始化.
//!
//! 双输出:
//! - console: 彩色, 输出到 stderr (stdout 留给探测结果)
//! - file: 可选, 无色, 按天滚动, 文件名 `{prefix}.{YYYY-MM-DD}.log`
//!
//! 库 crate 通过 `log` 门面输出, 初始化时桥接到 tracing.
//! 环境变量 `ZHEN_LOG` 设置后覆盖配置中的级别.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_log::NormalizeEvent;
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, FormatEvent, FormatFields, format::Writer},
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// 覆盖日志级别的环境变量
pub const LOG_ENV: &str = "ZHEN_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 过滤指令, 如 `info` 或 `zhen_format=debug`
    pub level: String,
    /// 日志目录, None 表示只输出到控制台
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
    /// 最多保留的日志文件个数
    pub max_files: usize,
    pub console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "zhen".to_string(),
            max_files: 30,
            console: true,
        }
    }
}

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// 初始化全局日志订阅器, 每个进程只能成功一次
pub fn init(config: &LoggingConfig) -> Result<()> {
    let console_layer = if config.console {
        Some(
            fmt::Layer::default()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .event_format(ConsoleFormatter)
                .with_filter(build_filter(&config.level)?),
        )
    } else {
        None
    };

    let mut guard = None;
    let file_layer = match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory)
                .with_context(|| format!("创建日志目录失败, path={}", directory.display()))?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(config.file_prefix.clone())
                .filename_suffix("log")
                .max_log_files(config.max_files.max(1))
                .build(directory)
                .with_context(|| format!("创建日志文件失败, path={}", directory.display()))?;
            let (non_blocking, worker_guard) = tracing_appender::non_blocking(appender);
            guard = Some(worker_guard);
            Some(
                fmt::Layer::default()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .event_format(FileFormatter)
                    .with_filter(build_filter(&config.level)?),
            )
        }
        None => None,
    };

    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("日志系统已经初始化")?;

    if let Some(guard) = guard {
        LOG_GUARD.set(guard).ok();
    }
    Ok(())
}

/// 指定日期的日志文件路径, 与滚动写入器的命名一致
pub fn log_file_path(directory: &Path, prefix: &str, date: NaiveDate) -> PathBuf {
    directory.join(format!("{}.{}.log", prefix, date.format("%Y-%m-%d")))
}

/// 当前正在写入的日志文件 (滚动按 UTC 日期切换)
pub fn current_log_path(config: &LoggingConfig) -> Option<PathBuf> {
    let directory = config.directory.as_deref()?;
    Some(log_file_path(
        directory,
        &config.file_prefix,
        Utc::now().date_naive(),
    ))
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return Ok(filter);
    }
    EnvFilter::try_new(level).with_context(|| format!("无效的日志级别: {level}"))
}

fn write_time(writer: &mut Writer<'_>) -> std::fmt::Result {
    let now = Local::now();
    write!(
        writer,
        "[{:02}-{:02} {:02}:{:02}:{:02}.{:03}] ",
        now.month(),
        now.day(),
        now.hour(),
        now.minute(),
        now.second(),
        now.timestamp_subsec_millis()
    )
}

/// Console 格式: 彩色级别, 带源码位置
struct ConsoleFormatter;

impl<S, N> FormatEvent<S, N> for ConsoleFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        // log 门面的记录需要还原真实的源码位置
        let normalized = event.normalized_metadata();
        let meta = normalized.as_ref().unwrap_or_else(|| event.metadata());
        let color = match *meta.level() {
            tracing::Level::ERROR => "\x1b[31m",
            tracing::Level::WARN => "\x1b[33m",
            tracing::Level::INFO => "\x1b[32m",
            _ => "\x1b[34m",
        };
        write_time(&mut writer)?;
        write!(
            writer,
            "{}{:5}\x1b[0m {}:{} > ",
            color,
            meta.level().as_str(),
            meta.file().unwrap_or("unknown"),
            meta.line().unwrap_or(0)
        )?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// File 格式: 无色, 时间戳 + 级别 + 消息
struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        write_time(&mut writer)?;
        write!(writer, "{:5} > ", event.metadata().level().as_str())?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
