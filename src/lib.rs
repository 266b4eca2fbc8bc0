/// 工位计时与定制工具 - Rust后端核心库
pub mod app_state;
pub mod commands;
pub mod logging;
pub mod models;
pub mod services;
pub mod utils;

// 重新导出常用类型，方便使用
pub use app_state::{init_app_state, AppState, ShutdownReport, SystemStatus};
pub use models::*;
pub use services::*;
pub use utils::{AppConfig, AppError, AppResult, ConfigManager};

use std::path::PathBuf;
use std::sync::Arc;

use tauri::{Manager, RunEvent};

use commands::{spot_commands, tool_commands};
use services::infrastructure::TauriEventPublisher;

/// 配置文件路径，可由环境变量覆盖
const CONFIG_FILE_ENV: &str = "STATION_CONFIG_FILE";
const DEFAULT_CONFIG_FILE: &str = "config.json";

/// 应用程序主要运行函数
///
/// 加载配置、初始化日志、创建应用状态并运行 Tauri 窗口；
/// 窗口退出时暂停所有计时并立即写盘。
pub fn run() {
    let config_path = std::env::var_os(CONFIG_FILE_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let manager = tauri::async_runtime::block_on(ConfigManager::load_or_default(config_path));

    if let Err(e) = logging::init_logging(&manager.get_config().logging_config) {
        eprintln!("初始化日志失败: {}", e);
    }
    // 加载配置时日志尚未初始化，警告在这里补记
    for warning in manager.warnings() {
        crate::log_config_warning!("{}", warning);
    }
    let config = manager.into_config();
    log::info!("{} v{} 启动", config.app_settings.title, env!("CARGO_PKG_VERSION"));

    let publisher: Arc<TauriEventPublisher> = Arc::new(TauriEventPublisher::new());
    let app_state = match tauri::async_runtime::block_on(init_app_state(config, publisher.clone())) {
        Ok(state) => state,
        Err(e) => {
            log::error!("初始化应用状态失败: {}", e);
            std::process::exit(1);
        }
    };

    let drives_publisher = Arc::clone(&publisher);
    if let Err(e) = app_state
        .usb_watcher
        .register_callback(Box::new(move |drives: &[RemovableDrive]| drives_publisher.publish_drives(drives)))
    {
        log::warn!("注册U盘事件失败: {}", e);
    }

    let app = tauri::Builder::default()
        .manage(app_state)
        .setup(move |app| {
            publisher.attach(app.handle().clone());
            let state = app.state::<AppState>();
            tauri::async_runtime::block_on(async {
                if let Err(e) = state.state_store.health_check().await {
                    log::warn!("{}，计时状态只保存在内存中", e);
                }
                state.start_background()
            })?;
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            spot_commands::list_stations,
            spot_commands::get_status_options,
            spot_commands::list_spots,
            spot_commands::get_spot,
            spot_commands::start_spot,
            spot_commands::pause_spot,
            spot_commands::toggle_spot,
            spot_commands::stop_spot,
            spot_commands::reset_spot,
            spot_commands::set_spot_status,
            spot_commands::set_work_order,
            spot_commands::set_spot_place,
            spot_commands::get_station_summary,
            spot_commands::get_system_status,
            tool_commands::check_work_order,
            tool_commands::list_usb_drives,
            tool_commands::select_usb_drive,
            tool_commands::get_usb_drive_info,
            tool_commands::create_software,
            tool_commands::create_aoa_folder,
            tool_commands::find_dt_file,
            tool_commands::backup_usb_folders,
            tool_commands::generate_dt,
        ])
        .build(tauri::generate_context!());

    let app = match app {
        Ok(app) => app,
        Err(e) => {
            log::error!("创建Tauri应用失败: {}", e);
            std::process::exit(1);
        }
    };

    app.run(|handle, event| {
        if let RunEvent::Exit = event {
            let state = handle.state::<AppState>();
            match tauri::async_runtime::block_on(state.shutdown()) {
                Ok(report) => log::info!(
                    "应用已退出: 暂停 {} 个计时, 写盘失败 {} 次",
                    report.paused_timers,
                    report.failed_writes
                ),
                Err(e) => log::error!("退出时保存计时状态失败: {}", e),
            }
        }
    });
}
