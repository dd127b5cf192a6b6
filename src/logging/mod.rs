//! 日志初始化: 控制台 + 按日期切换的文件日志.
//!
//! 库 crate 通过 `log` 门面输出, 订阅器初始化时自动桥接到 tracing.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::error;
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, FormatEvent, FormatFields, format::Writer},
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

mod history;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 文件日志过滤指令, 如 `info` 或 `mpegvid_codec=debug`
    pub level: String,
    pub directory: String,
    pub file_prefix: String,
    /// 控制台过滤指令, 缺省时读取 `RUST_LOG`, 再缺省则与 `level` 相同
    #[serde(default)]
    pub console_level: Option<String>,
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    #[serde(default = "default_true")]
    pub compress_history: bool,
}

fn default_true() -> bool {
    true
}

fn default_retention_days() -> i64 {
    30
}

impl LoggingConfig {
    pub fn new(directory: impl Into<String>, file_prefix: impl Into<String>) -> Self {
        Self {
            level: "info".to_string(),
            directory: directory.into(),
            file_prefix: file_prefix.into(),
            console_level: None,
            retention_days: default_retention_days(),
            compress_history: true,
        }
    }

    /// `date` 当天的日志文件路径: `<directory>/<prefix>.YYYY-MM-DD.log`
    pub(crate) fn log_path(&self, date: NaiveDate) -> PathBuf {
        Path::new(&self.directory).join(format!(
            "{}.{}.log",
            self.file_prefix,
            date.format("%Y-%m-%d")
        ))
    }
}

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// 安装全局订阅器
///
/// 启动时先整理历史日志 (过期删除, 旧日期压缩). 进程内只能成功一次,
/// 重复调用返回错误.
pub fn init(config: LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory)
        .with_context(|| format!("创建日志目录失败, path={}", config.directory))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(DatedFileWriter::open(config.clone())?);

    let console_filter = match &config.console_level {
        Some(level) => EnvFilter::try_new(level),
        None => EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level)),
    }
    .context("解析控制台日志过滤指令失败")?;
    let file_filter = EnvFilter::try_new(&config.level)
        .with_context(|| format!("解析日志过滤指令失败, level={}", config.level))?;

    let console_layer = fmt::Layer::default()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .event_format(LineFormatter)
        .with_filter(console_filter);

    let file_layer = fmt::Layer::default()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(LineFormatter)
        .with_filter(file_filter);

    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("全局日志订阅器已安装")?;
    LOG_GUARD.set(guard).ok();

    if let Err(err) = history::cleanup_logs(&config) {
        error!("启动时清理日志失败: {:#}", err);
    }

    Ok(())
}

/// 写入当天日志文件, 跨日时切换到新文件并整理历史
struct DatedFileWriter {
    config: LoggingConfig,
    date: NaiveDate,
    file: File,
}

impl DatedFileWriter {
    fn open(config: LoggingConfig) -> Result<Self> {
        let date = Local::now().date_naive();
        let file = open_append(&config.log_path(date))?;
        Ok(Self { config, date, file })
    }

    fn switch_to(&mut self, today: NaiveDate) -> std::io::Result<()> {
        self.file = open_append(&self.config.log_path(today)).map_err(std::io::Error::other)?;
        self.date = today;
        if let Err(err) = history::cleanup_logs(&self.config) {
            self.report_upkeep_failure(&err)?;
        }
        Ok(())
    }

    /// 写线程不经过订阅器, 整理失败同时写入 stderr 与当前日志文件
    fn report_upkeep_failure(&mut self, err: &anyhow::Error) -> std::io::Result<()> {
        let line = format!("[{}] ERROR 切换日期后清理日志失败: {:#}", self.date, err);
        eprintln!("{line}");
        writeln!(self.file, "{line}")
    }
}

impl Write for DatedFileWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let today = Local::now().date_naive();
        if today != self.date {
            self.switch_to(today)?;
        }
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("打开日志文件失败, path={}", path.display()))
}

/// `[MM-DD HH:MM:SS.mmm] LEVEL target > 字段`
///
/// 写入端启用 ANSI 时 (控制台) 级别带颜色.
struct LineFormatter;

impl<S, N> FormatEvent<S, N> for LineFormatter
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
        let meta = event.metadata();
        write!(writer, "[{}] ", Local::now().format("%m-%d %H:%M:%S%.3f"))?;
        let level = meta.level();
        if writer.has_ansi_escapes() {
            let color = match *level {
                tracing::Level::ERROR => "31",
                tracing::Level::WARN => "33",
                tracing::Level::INFO => "32",
                _ => "34",
            };
            write!(writer, "\x1b[{color}m{:5}\x1b[0m", level.as_str())?;
        } else {
            write!(writer, "{:5}", level.as_str())?;
        }
        write!(writer, " {} > ", meta.target())?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
