/// 应用上下文
///
/// 启动时显式构造一次，由 Tauri 托管并注入所有命令；不使用任何全局单例。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::models::RemovableDrive;
use crate::services::application::{
    CustomizationService, DtWorkflowService, ICustomizationService, IDisplaySink, TickerManager,
};
use crate::services::domain::{IStationRegistry, RegistryConfig, StationRegistry};
use crate::services::infrastructure::excel::{KconvarsConverter, XlsxDtGenerator};
use crate::services::infrastructure::persistence::{IStateStore, JsonStateStore};
use crate::services::infrastructure::usb::{IDriveEnumerator, SystemDriveEnumerator, UsbWatcher};
use crate::services::infrastructure::work_order::{BomLocator, FsWorkOrderLookup};
use crate::services::traits::BaseService;
use crate::utils::config::AppConfig;
use crate::utils::error::{AppError, AppResult};
use crate::utils::time_utils::{Clock, SystemClock};

/// 应用状态，包含所有服务的引用
pub struct AppState {
    pub config: AppConfig,
    pub state_store: Arc<dyn IStateStore>,
    pub station_registry: Arc<dyn IStationRegistry>,
    pub ticker_manager: Arc<TickerManager>,
    pub usb_watcher: Arc<UsbWatcher>,
    pub customization_service: Arc<dyn ICustomizationService>,
    pub dt_workflow_service: Arc<DtWorkflowService>,
    /// 当前选中的U盘；插拔时自动选择第一个
    pub selected_drive: Arc<RwLock<Option<PathBuf>>>,
}

/// 系统状态信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    pub running_timers: usize,
    pub active_display_tickers: usize,
    pub failed_writes: usize,
    pub state_file: PathBuf,
    pub usb_drives: Vec<RemovableDrive>,
    pub version: String,
}

/// 退出报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownReport {
    /// 退出时被暂停的计时数量
    pub paused_timers: usize,
    /// 运行期间尽力写盘失败的次数
    pub failed_writes: usize,
}

impl AppState {
    /// 使用系统时钟和系统U盘枚举创建应用状态
    pub async fn new(config: AppConfig, display_sink: Arc<dyn IDisplaySink>) -> AppResult<Self> {
        let enumerator = Arc::new(SystemDriveEnumerator::from_settings(&config.customization_settings));
        Self::with_services(config, Arc::new(SystemClock), enumerator, display_sink).await
    }

    /// 指定时钟、U盘枚举和显示输出创建应用状态
    pub async fn with_services(
        config: AppConfig,
        clock: Arc<dyn Clock>,
        drive_enumerator: Arc<dyn IDriveEnumerator>,
        display_sink: Arc<dyn IDisplaySink>,
    ) -> AppResult<Self> {
        // 状态存储
        let mut json_store = JsonStateStore::new(config.persistence_config.clone());
        json_store.initialize().await?;
        let state_store: Arc<dyn IStateStore> = Arc::new(json_store);

        // 工位注册表
        let registry = StationRegistry::open(
            RegistryConfig::from_app_config(&config),
            state_store.clone(),
            clock,
        )
        .await;
        let station_registry: Arc<dyn IStationRegistry> = Arc::new(registry);

        // 显示刷新
        let ticker_manager = Arc::new(TickerManager::new(
            station_registry.clone(),
            display_sink,
            Duration::from_millis(config.timer_settings.tick_interval_ms),
        ));

        // U盘监视
        let usb_watcher = Arc::new(UsbWatcher::new(
            drive_enumerator,
            Duration::from_millis(config.timer_settings.usb_poll_interval_ms),
        ));
        let selected_drive = Arc::new(RwLock::new(None));
        let selection = Arc::clone(&selected_drive);
        usb_watcher.register_callback(Box::new(move |drives: &[RemovableDrive]| {
            if let Ok(mut selected) = selection.write() {
                let still_present = selected
                    .as_ref()
                    .map(|path| drives.iter().any(|d| &d.drive_path == path))
                    .unwrap_or(false);
                if !still_present {
                    *selected = drives.first().map(|d| d.drive_path.clone());
                }
            }
        }))?;

        // 定制工具
        let settings = &config.customization_settings;
        let bom_locator = BomLocator::new(settings.bom_base_dir.clone());
        let mut customization = CustomizationService::new(
            Arc::new(FsWorkOrderLookup::new(settings.search_directory.clone())),
            bom_locator.clone(),
            CustomizationService::default_backup_dir(),
        );
        customization.initialize().await?;
        let customization_service: Arc<dyn ICustomizationService> = Arc::new(customization);

        let dt_workflow_service = Arc::new(DtWorkflowService::new(
            Arc::new(KconvarsConverter::new(settings.kconvars_path.clone())),
            Arc::new(XlsxDtGenerator::new()),
            bom_locator,
            settings.dt_target_dir.clone(),
        ));

        log::info!("应用状态已创建: {}", config.app_settings.title);

        Ok(Self {
            config,
            state_store,
            station_registry,
            ticker_manager,
            usb_watcher,
            customization_service,
            dt_workflow_service,
            selected_drive,
        })
    }

    /// 启动后台活动：U盘监视，并为上次退出时仍在计时的spot恢复显示
    pub fn start_background(&self) -> AppResult<()> {
        self.usb_watcher.start()?;
        let resumed = self.ticker_manager.resume_running()?;
        if resumed > 0 {
            log::info!("恢复 {} 个正在计时的spot显示", resumed);
        }
        Ok(())
    }

    /// 当前选中的U盘
    pub fn selected_drive(&self) -> Option<PathBuf> {
        self.selected_drive.read().ok().and_then(|d| d.clone())
    }

    /// 手动选择U盘
    pub fn select_drive(&self, drive: PathBuf) -> AppResult<()> {
        let mut selected = self
            .selected_drive
            .write()
            .map_err(|e| AppError::concurrency_error(format!("U盘选择锁失败: {}", e)))?;
        *selected = Some(drive);
        Ok(())
    }

    pub fn system_status(&self) -> SystemStatus {
        SystemStatus {
            running_timers: self.station_registry.running_spots().len(),
            active_display_tickers: self.ticker_manager.active_count(),
            failed_writes: self.station_registry.failed_write_count(),
            state_file: self.state_store.state_file_path().to_path_buf(),
            usb_drives: self.usb_watcher.current_drives(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 窗口关闭：停止刷新和U盘监视，暂停所有计时并立即写盘
    pub async fn shutdown(&self) -> AppResult<ShutdownReport> {
        log::info!("开始关闭应用...");
        self.ticker_manager.stop_all().await?;
        if let Err(e) = self.usb_watcher.stop().await {
            log::warn!("停止U盘监视失败: {}", e);
        }

        let paused_timers = self.station_registry.pause_all_and_flush().await?;
        let failed_writes = self.station_registry.failed_write_count();
        if failed_writes > 0 {
            log::warn!("运行期间有 {} 次计时状态写盘失败", failed_writes);
        }

        Ok(ShutdownReport {
            paused_timers,
            failed_writes,
        })
    }
}

/// 按配置创建应用状态
pub async fn init_app_state(config: AppConfig, display_sink: Arc<dyn IDisplaySink>) -> AppResult<AppState> {
    AppState::new(config, display_sink).await
}
