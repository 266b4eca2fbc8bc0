//! # 日志记录模块 (Logging Module)
//!
//! ## 业务说明
//! 记录操作员操作（开始/暂停/停止/重置计时）、状态文件写盘失败、
//! 外部查找失败（工单文件、U盘、DT生成）以及配置问题
//!
//! ## 日志策略
//! - **用户操作**: 每次计时状态变化
//! - **持久化失败**: 尽力写盘失败时记录，继续使用内存状态
//! - **查找失败**: 外部协作方失败，只提示不影响计时
//! - **配置警告**: 配置缺失或损坏时回退默认值

pub mod logger_config;

pub use logger_config::*;

/// 记录用户操作日志
#[macro_export]
macro_rules! log_user_operation {
    ($msg:expr) => {
        log::info!("[用户操作] {}", $msg)
    };
    ($msg:expr, $($arg:tt)*) => {
        log::info!("[用户操作] {}", format!($msg, $($arg)*))
    };
}

/// 记录状态文件写盘失败日志
#[macro_export]
macro_rules! log_persistence_failure {
    ($msg:expr) => {
        log::error!("[持久化失败] {}", $msg)
    };
    ($msg:expr, $($arg:tt)*) => {
        log::error!("[持久化失败] {}", format!($msg, $($arg)*))
    };
}

/// 记录外部查找失败日志（工单文件、U盘、DT生成）
#[macro_export]
macro_rules! log_lookup_failure {
    ($msg:expr) => {
        log::warn!("[查找失败] {}", $msg)
    };
    ($msg:expr, $($arg:tt)*) => {
        log::warn!("[查找失败] {}", format!($msg, $($arg)*))
    };
}

/// 记录配置警告
#[macro_export]
macro_rules! log_config_warning {
    ($msg:expr) => {
        log::warn!("[配置警告] {}", $msg)
    };
    ($msg:expr, $($arg:tt)*) => {
        log::warn!("[配置警告] {}", format!($msg, $($arg)*))
    };
}

// 重新导出宏
pub use log_user_operation;
pub use log_persistence_failure;
pub use log_lookup_failure;
pub use log_config_warning;
