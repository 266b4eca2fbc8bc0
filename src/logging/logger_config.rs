//! 日志配置模块
//!
//! 基于 env_logger 的控制台/文件输出

use chrono::Local;
use log::LevelFilter;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use crate::utils::config::LoggingConfig;
use crate::utils::error::{AppError, AppResult};

/// 解析配置中的日志级别字符串，无法识别时使用 Info
pub fn parse_level(level: &str) -> LevelFilter {
    match level.to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

/// 同时写控制台和文件的输出目标
struct TeeWriter {
    console: bool,
    file: Option<File>,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.console {
            io::stderr().write_all(buf)?;
        }
        if let Some(file) = self.file.as_mut() {
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.console {
            io::stderr().flush()?;
        }
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

fn open_log_file(path: &Path) -> AppResult<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::io_error(format!("创建日志目录 {:?} 失败: {}", parent, e), e.kind().to_string()))?;
        }
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| AppError::io_error(format!("打开日志文件 {:?} 失败: {}", path, e), e.kind().to_string()))
}

/// 初始化全局日志
///
/// `RUST_LOG` 环境变量优先于配置中的级别。重复初始化返回错误而不是 panic。
pub fn init_logging(config: &LoggingConfig) -> AppResult<()> {
    let file = match (&config.log_file_path, config.file_output) {
        (Some(path), true) => Some(open_log_file(path)?),
        _ => None,
    };

    let writer = TeeWriter {
        console: config.console_output || file.is_none(),
        file,
    };

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(parse_level(&config.log_level))
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(writer)));

    builder
        .try_init()
        .map_err(|e| AppError::service_initialization_error("logging", e.to_string()))?;

    log::info!("日志系统初始化完成 (级别: {})", config.log_level);
    Ok(())
}
