/// spot计时相关命令
///
/// 开始、暂停、停止、重置计时，修改状态、工单号和看板坐标

use tauri::State;

use crate::app_state::{AppState, SystemStatus};
use crate::models::{LaborTime, Place, SpotKey, SpotView, StationSummary};
use crate::utils::error::AppResult;

fn parse_key(spot_key: &str) -> Result<SpotKey, String> {
    SpotKey::parse(spot_key).map_err(|e| e.to_string())
}

fn to_command_result<T>(result: AppResult<T>) -> Result<T, String> {
    result.map_err(|e| e.to_string())
}

/// 获取工位列表
#[tauri::command]
pub fn list_stations(state: State<'_, AppState>) -> Vec<u32> {
    state.station_registry.list_stations()
}

/// 获取状态选项（有序）
#[tauri::command]
pub fn get_status_options(state: State<'_, AppState>) -> Vec<String> {
    state.station_registry.status_names()
}

/// 获取工位内全部spot视图
#[tauri::command]
pub fn list_spots(state: State<'_, AppState>, station_id: u32) -> Result<Vec<SpotView>, String> {
    let registry = &state.station_registry;
    registry
        .list_spots(station_id)
        .iter()
        .map(|key| {
            registry.get_spot(station_id, key)?;
            registry.snapshot(key)
        })
        .collect::<AppResult<Vec<_>>>()
        .map_err(|e| e.to_string())
}

/// 获取单个spot视图
#[tauri::command]
pub fn get_spot(state: State<'_, AppState>, station_id: u32, spot_key: String) -> Result<SpotView, String> {
    let key = parse_key(&spot_key)?;
    to_command_result(state.station_registry.get_spot(station_id, &key))?;
    to_command_result(state.station_registry.snapshot(&key))
}

/// 开始计时并启动显示刷新
#[tauri::command]
pub async fn start_spot(state: State<'_, AppState>, spot_key: String) -> Result<SpotView, String> {
    let key = parse_key(&spot_key)?;
    let view = to_command_result(state.station_registry.start(&key).await)?;
    to_command_result(state.ticker_manager.restart(key))?;
    Ok(view)
}

/// 暂停计时；显示刷新在下一个周期观察到暂停后自行结束
#[tauri::command]
pub async fn pause_spot(state: State<'_, AppState>, spot_key: String) -> Result<SpotView, String> {
    let key = parse_key(&spot_key)?;
    to_command_result(state.station_registry.pause(&key).await)
}

/// Start/Pause 按钮
#[tauri::command]
pub async fn toggle_spot(state: State<'_, AppState>, spot_key: String) -> Result<bool, String> {
    let key = parse_key(&spot_key)?;
    let running = to_command_result(state.station_registry.toggle(&key).await)?;
    if running {
        to_command_result(state.ticker_manager.restart(key))?;
    }
    Ok(running)
}

/// 停止计时并返回工时
#[tauri::command]
pub async fn stop_spot(state: State<'_, AppState>, spot_key: String) -> Result<LaborTime, String> {
    let key = parse_key(&spot_key)?;
    to_command_result(state.station_registry.stop(&key).await)
}

/// 重置spot
#[tauri::command]
pub async fn reset_spot(state: State<'_, AppState>, spot_key: String) -> Result<SpotView, String> {
    let key = parse_key(&spot_key)?;
    to_command_result(state.station_registry.reset(&key).await)
}

/// 修改状态
#[tauri::command]
pub async fn set_spot_status(state: State<'_, AppState>, spot_key: String, status: String) -> Result<SpotView, String> {
    let key = parse_key(&spot_key)?;
    to_command_result(state.station_registry.set_status(&key, &status).await)
}

/// 修改工单号（原样保存，格式校验在 check_work_order 中进行）
#[tauri::command]
pub async fn set_work_order(state: State<'_, AppState>, spot_key: String, wo_number: String) -> Result<SpotView, String> {
    let key = parse_key(&spot_key)?;
    to_command_result(state.station_registry.set_work_order(&key, &wo_number).await)
}

/// 修改看板坐标
#[tauri::command]
pub async fn set_spot_place(state: State<'_, AppState>, spot_key: String, x: f64, y: f64) -> Result<SpotView, String> {
    let key = parse_key(&spot_key)?;
    if !x.is_finite() || !y.is_finite() {
        return Err(format!("无效的坐标: ({}, {})", x, y));
    }
    to_command_result(state.station_registry.set_place(&key, Place { x, y }).await)
}

/// 工位汇总（看板）
#[tauri::command]
pub fn get_station_summary(state: State<'_, AppState>, station_id: u32) -> Result<StationSummary, String> {
    to_command_result(state.station_registry.station_summary(station_id))
}

/// 系统状态
#[tauri::command]
pub fn get_system_status(state: State<'_, AppState>) -> SystemStatus {
    state.system_status()
}
