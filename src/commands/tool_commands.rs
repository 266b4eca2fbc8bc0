/// 定制工具相关命令
///
/// 工单检查、U盘软件创建、AOA文件夹、DT查找与生成、U盘备份

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use tauri::State;

use crate::app_state::AppState;
use crate::models::{DtOutcome, RemovableDrive, UsbSoftwareVersion, WorkOrderFiles, WorkOrderNumber};

/// U盘信息（界面顶部显示）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsbDriveInfo {
    pub drive_path: PathBuf,
    pub software_version: UsbSoftwareVersion,
    pub orderfil_e_number: Option<String>,
}

/// 未指定U盘时使用当前选中的U盘
fn resolve_drive(state: &AppState, drive_path: Option<String>) -> Result<PathBuf, String> {
    drive_path
        .map(PathBuf::from)
        .or_else(|| state.selected_drive())
        .ok_or_else(|| "No USB drive detected".to_string())
}

/// 检查工单号并返回工单文件信息
#[tauri::command]
pub async fn check_work_order(state: State<'_, AppState>, wo_number: String) -> Result<WorkOrderFiles, String> {
    state
        .customization_service
        .check_work_order(&wo_number)
        .await
        .map_err(|e| e.to_string())
}

/// 当前U盘列表
#[tauri::command]
pub fn list_usb_drives(state: State<'_, AppState>) -> Vec<RemovableDrive> {
    state.usb_watcher.current_drives()
}

/// 选择U盘
#[tauri::command]
pub fn select_usb_drive(state: State<'_, AppState>, drive_path: String) -> Result<(), String> {
    state.select_drive(PathBuf::from(drive_path)).map_err(|e| e.to_string())
}

/// U盘软件版本和订单文件E号
#[tauri::command]
pub async fn get_usb_drive_info(state: State<'_, AppState>, drive_path: Option<String>) -> Result<UsbDriveInfo, String> {
    let drive = resolve_drive(&state, drive_path)?;
    let service = &state.customization_service;
    let software_version = service
        .usb_software_version(&drive)
        .await
        .map_err(|e| e.to_string())?;
    let orderfil_e_number = service.usb_order_e_number(&drive).await;
    Ok(UsbDriveInfo {
        drive_path: drive,
        software_version,
        orderfil_e_number,
    })
}

/// Create SW：复制工单 .dat 到U盘
#[tauri::command]
pub async fn create_software(
    state: State<'_, AppState>,
    wo_number: String,
    drive_path: Option<String>,
) -> Result<String, String> {
    let drive = resolve_drive(&state, drive_path)?;
    let destination = state
        .customization_service
        .create_software(&wo_number, &drive)
        .await
        .map_err(|e| e.to_string())?;
    Ok(format!("File copied to {}", destination.display()))
}

/// 创建AOA文件夹
#[tauri::command]
pub async fn create_aoa_folder(
    state: State<'_, AppState>,
    wo_number: String,
    e_number: String,
    drive_path: Option<String>,
) -> Result<String, String> {
    let wo = WorkOrderNumber::parse(&wo_number).map_err(|e| e.to_string())?;
    let drive = resolve_drive(&state, drive_path)?;
    let folder = state
        .customization_service
        .create_aoa_folder(wo.as_str(), &e_number, &drive)
        .await
        .map_err(|e| e.to_string())?;
    Ok(format!("AOA folder created: {}", folder.display()))
}

/// 查找DT表格
#[tauri::command]
pub async fn find_dt_file(state: State<'_, AppState>, e_number: String) -> Result<PathBuf, String> {
    state
        .customization_service
        .find_dt_file(&e_number)
        .await
        .map_err(|e| e.to_string())
}

/// 把所有U盘上的AOA文件夹移动到备份目录
#[tauri::command]
pub async fn backup_usb_folders(state: State<'_, AppState>) -> Result<String, String> {
    let drives: Vec<PathBuf> = state
        .usb_watcher
        .current_drives()
        .into_iter()
        .map(|d| d.drive_path)
        .collect();
    let moved = state
        .customization_service
        .backup_usb_folders(&drives)
        .await
        .map_err(|e| e.to_string())?;
    if moved.is_empty() {
        Ok("No matching folders found on any USB drives.".to_string())
    } else {
        Ok(format!("Moved {} folders to backup successfully.", moved.len()))
    }
}

/// 生成DT数据表；流程失败也以 Ok 返回，由界面显示 message
#[tauri::command]
pub async fn generate_dt(
    state: State<'_, AppState>,
    wo_number: String,
    e_number: String,
    drive_path: Option<String>,
) -> Result<DtOutcome, String> {
    let wo = match WorkOrderNumber::parse(&wo_number) {
        Ok(wo) => wo,
        Err(e) => return Ok(DtOutcome::failed(e.to_string())),
    };
    let drive = match resolve_drive(&state, drive_path) {
        Ok(drive) => drive,
        Err(message) => return Ok(DtOutcome::failed(message)),
    };
    Ok(state
        .dt_workflow_service
        .generate_dt(wo.as_str(), &e_number, &drive)
        .await)
}
