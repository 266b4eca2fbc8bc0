/// 工单、U盘、DT生成相关的数据结构

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::utils::error::{AppError, AppResult};

/// 经过校验的工单号（8位数字）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkOrderNumber(String);

impl WorkOrderNumber {
    /// 校验并构造工单号，前后空白会被去掉
    pub fn parse(raw: &str) -> AppResult<Self> {
        let trimmed = raw.trim();
        if trimmed.len() == 8 && trimmed.chars().all(|c| c.is_ascii_digit()) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(AppError::validation_error(format!("WO Number must be an 8-digit number: '{}'", raw)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkOrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 工单文件查找结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrderFiles {
    /// 工单 .dat 文件
    pub dat_file: PathBuf,
    /// 工单 .pdf 文件（可能不存在）
    pub pdf_file: Option<PathBuf>,
    /// 机器人配置E号，例如 `E123456`
    pub e_number: Option<String>,
    /// 机器人型号
    pub model: String,
}

/// 可移动磁盘
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RemovableDrive {
    pub drive_path: PathBuf,
    pub display_label: String,
}

/// U盘上控制器软件版本（由 version.txt 判断）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsbSoftwareVersion {
    /// V8 / V9：orderfil.dat 在根目录
    V8V9,
    /// V10：orderfil.dat 在 config/p1 下
    V10,
    /// version.txt 存在但无法识别
    Unknown(String),
    /// 没有 version.txt
    NotFound,
}

/// DT 数据表生成结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DtOutcome {
    pub success: bool,
    pub message: String,
}

impl DtOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }
}
