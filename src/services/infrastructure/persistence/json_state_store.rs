/// JSON文件计时状态存储
/// 整个状态作为一个JSON对象写入单个文件，启动时整体加载，每次变更后整体重写

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::models::{PersistedState, SpotRecord};
use crate::services::traits::BaseService;
use crate::utils::config::PersistenceConfig;
use crate::utils::error::{AppError, AppResult};

/// 计时状态存储接口
#[async_trait]
pub trait IStateStore: BaseService {
    /// 加载全部状态。文件缺失或损坏时返回空映射，从不报错
    async fn load(&self) -> PersistedState;

    /// 尽力保存：失败只记录日志并计数
    async fn save(&self, state: &PersistedState);

    /// 立即保存：失败返回给调用方（退出前使用）
    async fn save_immediate(&self, state: &PersistedState) -> AppResult<()>;

    /// 启动以来尽力保存失败的次数
    fn failed_write_count(&self) -> usize;

    /// 状态文件路径
    fn state_file_path(&self) -> &Path;
}

/// JSON文件状态存储实现
#[derive(Debug)]
pub struct JsonStateStore {
    /// 配置信息
    config: PersistenceConfig,
    /// 尽力保存失败次数
    failed_writes: AtomicUsize,
}

impl JsonStateStore {
    /// 创建新的JSON状态存储
    pub fn new(config: PersistenceConfig) -> Self {
        Self {
            config,
            failed_writes: AtomicUsize::new(0),
        }
    }

    /// 上一代文件 `<state_file>.bak`
    pub fn backup_file_path(&self) -> PathBuf {
        Self::sibling_with_suffix(&self.config.state_file, "bak")
    }

    /// 写入中的临时文件 `<state_file>.tmp`
    fn temp_file_path(&self) -> PathBuf {
        Self::sibling_with_suffix(&self.config.state_file, "tmp")
    }

    fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
        let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".");
        name.push(suffix);
        path.with_file_name(name)
    }

    /// 确保父目录存在
    async fn ensure_parent_exists(&self) -> AppResult<()> {
        if let Some(parent) = self.config.state_file.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await
                    .map_err(|e| AppError::io_error(format!("创建目录 {:?} 失败: {}", parent, e), e.kind().to_string()))?;
            }
        }
        Ok(())
    }

    /// 读取并解析一个状态文件
    ///
    /// 文件不存在返回 `Ok(None)`；单个条目解析失败时跳过该条目
    async fn read_state_file(path: &Path) -> AppResult<Option<PersistedState>> {
        if !path.exists() {
            return Ok(None);
        }

        let json_content = tokio::fs::read_to_string(path).await
            .map_err(|e| AppError::io_error(format!("读取文件 {:?} 失败: {}", path, e), e.kind().to_string()))?;

        let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&json_content)
            .map_err(|e| AppError::json_error(format!("反序列化文件 {:?} 内容失败: {}", path, e)))?;

        let mut state = PersistedState::new();
        for (key, value) in raw {
            match serde_json::from_value::<SpotRecord>(value) {
                Ok(record) => {
                    state.insert(key, record);
                }
                Err(e) => {
                    // 记录错误但继续处理其他条目
                    log::error!("状态条目 {} 解析失败: {}. 跳过此条目.", key, e);
                }
            }
        }
        Ok(Some(state))
    }

    /// 写文件：先备份旧文件，再写临时文件并改名覆盖
    async fn write_state_file(&self, state: &PersistedState) -> AppResult<()> {
        self.ensure_parent_exists().await?;

        let json_content = serde_json::to_string_pretty(state)
            .map_err(|e| AppError::json_error(format!("序列化计时状态失败: {}", e)))?;

        let target = &self.config.state_file;
        if self.config.keep_backup && target.exists() {
            let backup = self.backup_file_path();
            if let Err(e) = tokio::fs::copy(target, &backup).await {
                log::warn!("备份状态文件到 {:?} 失败: {}", backup, e);
            }
        }

        let temp = self.temp_file_path();
        tokio::fs::write(&temp, json_content).await
            .map_err(|e| AppError::io_error(format!("写入文件 {:?} 失败: {}", temp, e), e.kind().to_string()))?;

        tokio::fs::rename(&temp, target).await
            .map_err(|e| AppError::io_error(format!("替换文件 {:?} 失败: {}", target, e), e.kind().to_string()))?;

        log::debug!("计时状态已写入 {:?} ({} 条)", target, state.len());
        Ok(())
    }
}

#[async_trait]
impl BaseService for JsonStateStore {
    fn service_name(&self) -> &'static str {
        "JsonStateStore"
    }

    async fn initialize(&mut self) -> AppResult<()> {
        self.ensure_parent_exists().await?;
        log::info!("{} initialized. State file: {:?}", self.service_name(), self.config.state_file);
        Ok(())
    }

    async fn shutdown(&mut self) -> AppResult<()> {
        log::info!("{} shutting down.", self.service_name());
        Ok(())
    }

    async fn health_check(&self) -> AppResult<()> {
        match self.config.state_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
                Err(AppError::persistence_error(format!("状态文件目录 {:?} 不可访问", parent)))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl IStateStore for JsonStateStore {
    async fn load(&self) -> PersistedState {
        let path = &self.config.state_file;
        match Self::read_state_file(path).await {
            Ok(Some(state)) => {
                log::info!("已加载 {} 条spot状态: {:?}", state.len(), path);
                state
            }
            Ok(None) => {
                log::info!("状态文件 {:?} 不存在，使用默认状态", path);
                PersistedState::new()
            }
            Err(e) => {
                crate::log_persistence_failure!("状态文件 {:?} 无法读取: {}", path, e);
                let backup = self.backup_file_path();
                match Self::read_state_file(&backup).await {
                    Ok(Some(state)) => {
                        log::warn!("已从备份 {:?} 恢复 {} 条spot状态", backup, state.len());
                        state
                    }
                    _ => PersistedState::new(),
                }
            }
        }
    }

    async fn save(&self, state: &PersistedState) {
        if let Err(e) = self.write_state_file(state).await {
            self.failed_writes.fetch_add(1, Ordering::SeqCst);
            crate::log_persistence_failure!("保存计时状态失败，继续使用内存状态: {}", e);
        }
    }

    async fn save_immediate(&self, state: &PersistedState) -> AppResult<()> {
        self.write_state_file(state).await.map_err(|e| {
            crate::log_persistence_failure!("立即保存计时状态失败: {}", e);
            AppError::persistence_error(format!("保存 {:?} 失败: {}", self.config.state_file, e))
        })
    }

    fn failed_write_count(&self) -> usize {
        self.failed_writes.load(Ordering::SeqCst)
    }

    fn state_file_path(&self) -> &Path {
        &self.config.state_file
    }
}
