use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 应用程序统一错误类型
/// 用于封装工位计时系统中可能出现的各种错误，提供统一的错误处理机制
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum AppError {
    /// 通用错误，包含错误消息
    #[error("通用错误: {message}")]
    Generic { message: String },

    /// 输入/输出错误
    #[error("IO错误: {message} (Kind: {kind})")]
    IoError { message: String, kind: String },

    /// 状态文件持久化相关错误
    ///
    /// **业务含义**: 计时状态写盘失败。日常运行中这类错误只记录日志，
    /// 只有在退出前的立即保存时才会返回给调用方，由界面提示操作员。
    #[error("持久化错误: {message}")]
    PersistenceError { message: String },

    /// 配置相关错误
    #[error("配置错误: {message}")]
    ConfigurationError { message: String },

    /// 验证错误（工单号格式错误、未配置的状态名等）
    #[error("验证错误: {message}")]
    ValidationError { message: String },

    /// 并发/异步操作错误
    #[error("并发错误: {message}")]
    ConcurrencyError { message: String },

    /// 资源未找到错误（工单文件、U盘、DT文件等）
    #[error("资源未找到: {resource_type} - {message}")]
    NotFoundError {
        resource_type: String,
        message: String,
    },

    /// 外部工具调用失败（kconvars 等转换程序）
    #[error("外部工具错误: {tool} - {message}")]
    ExternalToolError { tool: String, message: String },

    /// 服务初始化失败错误
    #[error("服务初始化失败: {service_name}, 原因: {reason}")]
    ServiceInitializationError { service_name: String, reason: String },

    /// JSON序列化/反序列化错误
    #[error("JSON序列化/反序列化错误: {message}")]
    JsonError { message: String },

    /// Excel读写错误
    #[error("Excel错误: {message}")]
    ExcelError { message: String },
}

impl AppError {
    /// 创建通用错误
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// 创建IO错误
    pub fn io_error(message: impl Into<String>, kind_str: impl Into<String>) -> Self {
        Self::IoError {
            message: message.into(),
            kind: kind_str.into(),
        }
    }

    /// 创建持久化错误
    pub fn persistence_error(message: impl Into<String>) -> Self {
        Self::PersistenceError {
            message: message.into(),
        }
    }

    /// 创建配置错误
    pub fn configuration_error(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// 创建验证错误
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    /// 创建并发错误
    pub fn concurrency_error(message: impl Into<String>) -> Self {
        Self::ConcurrencyError {
            message: message.into(),
        }
    }

    /// 创建资源未找到错误
    pub fn not_found_error(resource_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFoundError {
            resource_type: resource_type.into(),
            message: message.into(),
        }
    }

    /// 创建外部工具错误
    pub fn external_tool_error(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalToolError {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// 创建服务初始化失败错误
    pub fn service_initialization_error(service_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ServiceInitializationError {
            service_name: service_name.into(),
            reason: reason.into(),
        }
    }

    /// 创建JSON序列化错误
    pub fn json_error(message: impl Into<String>) -> Self {
        Self::JsonError {
            message: message.into(),
        }
    }

    /// 创建Excel错误
    pub fn excel_error(message: impl Into<String>) -> Self {
        Self::ExcelError {
            message: message.into(),
        }
    }

    /// 获取错误的简短描述
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Generic { .. } => "GENERIC",
            AppError::IoError { .. } => "IO_ERROR",
            AppError::PersistenceError { .. } => "PERSISTENCE_ERROR",
            AppError::ConfigurationError { .. } => "CONFIGURATION_ERROR",
            AppError::ValidationError { .. } => "VALIDATION_ERROR",
            AppError::ConcurrencyError { .. } => "CONCURRENCY_ERROR",
            AppError::NotFoundError { .. } => "NOT_FOUND_ERROR",
            AppError::ExternalToolError { .. } => "EXTERNAL_TOOL_ERROR",
            AppError::ServiceInitializationError { .. } => "SERVICE_INIT_ERROR",
            AppError::JsonError { .. } => "JSON_ERROR",
            AppError::ExcelError { .. } => "EXCEL_ERROR",
        }
    }
}

/// 标准 I/O 错误到 AppError 的转换
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError { message: err.to_string(), kind: format!("{:?}", err.kind()) }
    }
}

/// serde_json 错误到 AppError 的转换
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::JsonError { message: err.to_string() }
    }
}

/// 字符串错误到 AppError 的转换（通用错误）
impl From<String> for AppError {
    fn from(err_msg: String) -> Self {
        Self::Generic { message: err_msg }
    }
}

/// &str 错误到 AppError 的转换（通用错误）
impl From<&str> for AppError {
    fn from(err_msg: &str) -> Self {
        Self::Generic { message: err_msg.to_string() }
    }
}

/// rust_xlsxwriter 错误到 AppError 的转换
impl From<rust_xlsxwriter::XlsxError> for AppError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        AppError::ExcelError { message: format!("Excel write error: {}", err) }
    }
}

/// calamine 错误到 AppError 的转换
impl From<calamine::Error> for AppError {
    fn from(err: calamine::Error) -> Self {
        AppError::ExcelError { message: format!("Excel read error: {}", err) }
    }
}

/// 应用程序结果类型别名
/// 简化错误处理的类型定义
pub type AppResult<T> = Result<T, AppError>;
