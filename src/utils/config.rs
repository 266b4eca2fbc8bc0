use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use crate::utils::error::{AppError, AppResult};

/// 应用程序主配置结构
/// 包含工位计时程序运行所需的所有配置信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 应用程序基本设置（工位数、每工位spot数等）
    #[serde(default)]
    pub app_settings: AppSettings,
    /// spot状态列表，第一个为默认状态
    #[serde(default = "default_spot_statuses")]
    pub spot_statuses: Vec<SpotStatusConfig>,
    /// 定制工具配置（网络共享目录、DT目录等）
    #[serde(default)]
    pub customization_settings: CustomizationSettings,
    /// 计时器配置
    #[serde(default)]
    pub timer_settings: TimerSettings,
    /// 日志配置
    #[serde(default)]
    pub logging_config: LoggingConfig,
    /// 状态文件配置
    #[serde(default)]
    pub persistence_config: PersistenceConfig,
}

/// 应用程序基本设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// 窗口标题
    pub title: String,
    /// 工位数量
    pub stations: u32,
    /// 每个工位的spot数量
    pub spots: u32,
    /// 工位视图列数（仅界面使用）
    pub columns: u32,
}

/// spot状态配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpotStatusConfig {
    /// 状态名称
    pub name: String,
    /// 显示颜色（界面细节，计时核心不使用）
    #[serde(default)]
    pub color: String,
}

/// 定制工具配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomizationSettings {
    /// 工单 .dat/.pdf 文件所在的网络目录
    pub search_directory: PathBuf,
    /// BOM/DT 表格根目录（按E号区间分目录）
    pub bom_base_dir: PathBuf,
    /// 生成的DT文件保存目录
    pub dt_target_dir: PathBuf,
    /// sysmast.sv 转换程序路径
    pub kconvars_path: PathBuf,
    /// 不视为U盘的盘符
    #[serde(default = "default_excluded_drive_letters")]
    pub excluded_drive_letters: Vec<char>,
    /// 非Windows平台下U盘挂载根目录
    #[serde(default = "default_mount_roots")]
    pub mount_roots: Vec<PathBuf>,
}

/// 启动计时时的自动状态切换
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusTransition {
    pub from: String,
    pub to: String,
}

/// 计时器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerSettings {
    /// 显示刷新周期（毫秒）
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// U盘轮询周期（毫秒）
    #[serde(default = "default_usb_poll_interval_ms")]
    pub usb_poll_interval_ms: u64,
    /// 启动计时时自动切换状态，例如 Unblocked -> In Progress；显式 null 表示关闭
    #[serde(default = "default_auto_status_on_start")]
    pub auto_status_on_start: Option<StatusTransition>,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 日志文件路径
    pub log_file_path: Option<PathBuf>,
    /// 是否启用控制台输出
    pub console_output: bool,
    /// 是否启用文件输出
    pub file_output: bool,
}

/// 状态文件配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// 计时状态JSON文件路径
    pub state_file: PathBuf,
    /// 覆盖前是否保留一份 .bak
    pub keep_backup: bool,
}

fn default_spot_statuses() -> Vec<SpotStatusConfig> {
    [
        ("Unblocked", "#E0E0E0"),
        ("In Progress", "#90CAF9"),
        ("Blocked", "#EF9A9A"),
        ("Packing", "#FFE082"),
        ("Finished", "#A5D6A7"),
    ]
    .iter()
    .map(|(name, color)| SpotStatusConfig { name: name.to_string(), color: color.to_string() })
    .collect()
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_usb_poll_interval_ms() -> u64 {
    2000
}

fn default_auto_status_on_start() -> Option<StatusTransition> {
    Some(StatusTransition {
        from: "Unblocked".to_string(),
        to: "In Progress".to_string(),
    })
}

fn default_excluded_drive_letters() -> Vec<char> {
    vec!['C', 'J']
}

fn default_mount_roots() -> Vec<PathBuf> {
    let user = std::env::var("USER").unwrap_or_default();
    vec![
        PathBuf::from("/media").join(&user),
        PathBuf::from("/run/media").join(&user),
        PathBuf::from("/Volumes"),
    ]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_settings: AppSettings::default(),
            spot_statuses: default_spot_statuses(),
            customization_settings: CustomizationSettings::default(),
            timer_settings: TimerSettings::default(),
            logging_config: LoggingConfig::default(),
            persistence_config: PersistenceConfig::default(),
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            title: "Station App".to_string(),
            stations: 2,
            spots: 6,
            columns: 2,
        }
    }
}

impl Default for CustomizationSettings {
    fn default() -> Self {
        Self {
            search_directory: PathBuf::from("orders"),
            bom_base_dir: PathBuf::from("bom"),
            dt_target_dir: PathBuf::from("data_sheets"),
            kconvars_path: PathBuf::from("kconvars.exe"),
            excluded_drive_letters: default_excluded_drive_letters(),
            mount_roots: default_mount_roots(),
        }
    }
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            usb_poll_interval_ms: default_usb_poll_interval_ms(),
            auto_status_on_start: default_auto_status_on_start(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file_path: Some(PathBuf::from("logs/station_app.log")),
            console_output: true,
            file_output: false,
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from("timers_state.json"),
            keep_backup: true,
        }
    }
}

impl AppConfig {
    /// 有序的状态名列表
    pub fn status_names(&self) -> Vec<String> {
        self.spot_statuses.iter().map(|s| s.name.clone()).collect()
    }

    /// 默认状态（列表第一个）
    pub fn default_status(&self) -> String {
        self.spot_statuses
            .first()
            .map(|s| s.name.clone())
            .unwrap_or_default()
    }

    /// 生效的自动状态切换：两端状态都必须在状态列表中，否则视为关闭
    pub fn effective_auto_status(&self) -> Option<StatusTransition> {
        let transition = self.timer_settings.auto_status_on_start.as_ref()?;
        let configured = |name: &str| self.spot_statuses.iter().any(|s| s.name == name);
        if configured(&transition.from) && configured(&transition.to) {
            Some(transition.clone())
        } else {
            None
        }
    }
}

/// 配置管理器
/// 负责加载、保存和校验应用程序配置。配置缺失或损坏时回退到默认值，从不致命。
pub struct ConfigManager {
    config: AppConfig,
    config_file_path: PathBuf,
    /// 加载过程中产生的警告，日志初始化后再输出
    warnings: Vec<String>,
}

impl ConfigManager {
    /// 创建新的配置管理器
    pub fn new(config_file_path: PathBuf) -> Self {
        Self {
            config: AppConfig::default(),
            config_file_path,
            warnings: Vec::new(),
        }
    }

    /// 从文件加载配置
    pub async fn load_from_file(&mut self) -> AppResult<()> {
        if !self.config_file_path.exists() {
            // 如果配置文件不存在，创建默认配置文件
            self.save_to_file().await?;
            return Ok(());
        }

        let content = tokio::fs::read_to_string(&self.config_file_path)
            .await
            .map_err(|e| AppError::io_error(format!("读取配置文件失败: {}", e), e.kind().to_string()))?;

        self.config = serde_json::from_str(&content)
            .map_err(|e| AppError::configuration_error(format!("解析配置文件失败: {}", e)))?;

        Ok(())
    }

    /// 加载配置，任何失败都回退到默认配置
    ///
    /// 此时日志通常尚未初始化，问题记录在 `warnings()` 中，由调用方在日志初始化后输出
    pub async fn load_or_default(config_file_path: PathBuf) -> Self {
        let mut manager = Self::new(config_file_path);

        if let Err(e) = manager.load_from_file().await {
            manager.warnings.push(format!(
                "配置文件 {:?} 不可用，使用默认配置: {}",
                manager.config_file_path, e
            ));
            manager.reset_to_default();
        }

        manager.override_from_env();

        if let Err(e) = manager.validate_config() {
            manager.warnings.push(format!("配置校验失败，使用默认配置: {}", e));
            manager.reset_to_default();
        }

        if let Some(transition) = &manager.config.timer_settings.auto_status_on_start {
            if manager.config.effective_auto_status().is_none() {
                manager.warnings.push(format!(
                    "自动状态切换 {} -> {} 引用了未配置的状态，已关闭",
                    transition.from, transition.to
                ));
            }
        }

        manager
    }

    /// 将配置保存到文件
    pub async fn save_to_file(&self) -> AppResult<()> {
        // 确保目录存在
        if let Some(parent) = self.config_file_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await
                    .map_err(|e| AppError::io_error(format!("创建配置目录失败: {}", e), e.kind().to_string()))?;
            }
        }

        let content = serde_json::to_string_pretty(&self.config)
            .map_err(|e| AppError::json_error(format!("序列化配置失败: {}", e)))?;

        tokio::fs::write(&self.config_file_path, content)
            .await
            .map_err(|e| AppError::io_error(format!("写入配置文件失败: {}", e), e.kind().to_string()))?;

        Ok(())
    }

    /// 从环境变量覆盖配置
    pub fn override_from_env(&mut self) {
        if let Ok(state_file) = std::env::var("STATION_STATE_FILE") {
            self.config.persistence_config.state_file = PathBuf::from(state_file);
        }
        if let Ok(search_dir) = std::env::var("STATION_SEARCH_DIR") {
            self.config.customization_settings.search_directory = PathBuf::from(search_dir);
        }
        if let Ok(log_level) = std::env::var("LOG_LEVEL") {
            self.config.logging_config.log_level = log_level;
        }
    }

    /// 获取配置的只读引用
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    /// 获取配置的可变引用
    pub fn get_config_mut(&mut self) -> &mut AppConfig {
        &mut self.config
    }

    /// 加载过程中产生的警告
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// 取出配置
    pub fn into_config(self) -> AppConfig {
        self.config
    }

    /// 验证配置的有效性
    pub fn validate_config(&self) -> AppResult<()> {
        let settings = &self.config.app_settings;
        if settings.stations == 0 {
            return Err(AppError::configuration_error("工位数量不能为0"));
        }
        if settings.spots == 0 {
            return Err(AppError::configuration_error("每工位spot数量不能为0"));
        }

        if self.config.spot_statuses.is_empty() {
            return Err(AppError::configuration_error("状态列表不能为空"));
        }

        let mut seen = HashSet::new();
        for status in &self.config.spot_statuses {
            if status.name.trim().is_empty() {
                return Err(AppError::configuration_error("状态名称不能为空"));
            }
            if !seen.insert(status.name.as_str()) {
                return Err(AppError::configuration_error(format!("重复的状态名称: {}", status.name)));
            }
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.config.logging_config.log_level.as_str()) {
            return Err(AppError::configuration_error(format!(
                "无效的日志级别: {}，有效值: {:?}",
                self.config.logging_config.log_level, valid_log_levels
            )));
        }

        if self.config.timer_settings.tick_interval_ms == 0 {
            return Err(AppError::configuration_error("刷新周期不能为0"));
        }
        if self.config.timer_settings.usb_poll_interval_ms == 0 {
            return Err(AppError::configuration_error("U盘轮询周期不能为0"));
        }

        Ok(())
    }

    /// 重置为默认配置
    pub fn reset_to_default(&mut self) {
        self.config = AppConfig::default();
    }
}
