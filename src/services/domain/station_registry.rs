/// 工位注册表
///
/// 持有全部spot记录的内存副本，是唯一可以修改计时状态的组件。
/// 每次修改都在返回前整体写盘；持久化闸门保证写盘顺序与调用顺序一致。

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::models::{
    LaborTime, PersistedState, Place, SpotKey, SpotRecord, SpotView, StationSummary, StatusCount,
};
use crate::services::domain::spot_timer;
use crate::services::infrastructure::persistence::IStateStore;
use crate::utils::config::{AppConfig, StatusTransition};
use crate::utils::error::{AppError, AppResult};
use crate::utils::time_utils::{format_elapsed, Clock};

/// 工位拓扑和状态配置
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryConfig {
    /// 工位数量
    pub stations: u32,
    /// 每个工位的spot数量
    pub spots: u32,
    /// 有序状态名，第一个为默认状态
    pub statuses: Vec<String>,
    /// 开始计时时的自动状态切换
    pub auto_status_on_start: Option<StatusTransition>,
}

impl RegistryConfig {
    /// 引用未配置状态的自动切换被丢弃
    pub fn from_app_config(config: &AppConfig) -> Self {
        let auto_status_on_start = config.effective_auto_status();
        if auto_status_on_start.is_none() && config.timer_settings.auto_status_on_start.is_some() {
            crate::log_config_warning!("自动状态切换引用了未配置的状态，已关闭");
        }
        Self {
            stations: config.app_settings.stations,
            spots: config.app_settings.spots,
            statuses: config.status_names(),
            auto_status_on_start,
        }
    }

    pub fn default_status(&self) -> &str {
        self.statuses.first().map(String::as_str).unwrap_or_default()
    }
}

/// 工位注册表接口
#[async_trait]
pub trait IStationRegistry: Send + Sync {
    /// 全部工位号 `1..=stations`
    fn list_stations(&self) -> Vec<u32>;

    /// 工位内全部spot；未知工位返回空
    fn list_spots(&self, station_id: u32) -> Vec<SpotKey>;

    /// 有序状态名
    fn status_names(&self) -> Vec<String>;

    /// 获取spot记录，不存在时在内存中创建默认记录（下次修改时才写盘）
    fn get_spot(&self, station_id: u32, key: &SpotKey) -> AppResult<SpotRecord>;

    /// spot界面视图（纯读取）
    fn snapshot(&self, key: &SpotKey) -> AppResult<SpotView>;

    /// 当前已用时间（纯读取）
    fn read_elapsed(&self, key: &SpotKey) -> f64;

    /// 是否正在计时
    fn is_running(&self, key: &SpotKey) -> bool;

    /// 正在计时的spot
    fn running_spots(&self) -> Vec<SpotKey>;

    /// 工位汇总
    fn station_summary(&self, station_id: u32) -> AppResult<StationSummary>;

    /// 开始计时
    async fn start(&self, key: &SpotKey) -> AppResult<SpotView>;

    /// 暂停计时
    async fn pause(&self, key: &SpotKey) -> AppResult<SpotView>;

    /// 停止计时，返回工时
    async fn stop(&self, key: &SpotKey) -> AppResult<LaborTime>;

    /// 重置spot
    async fn reset(&self, key: &SpotKey) -> AppResult<SpotView>;

    /// 开始/暂停切换，返回新的运行标志
    async fn toggle(&self, key: &SpotKey) -> AppResult<bool>;

    /// 设置状态（必须是已配置的状态）
    async fn set_status(&self, key: &SpotKey, status: &str) -> AppResult<SpotView>;

    /// 设置工单号（原样保存）
    async fn set_work_order(&self, key: &SpotKey, wo_number: &str) -> AppResult<SpotView>;

    /// 设置看板坐标
    async fn set_place(&self, key: &SpotKey, place: Place) -> AppResult<SpotView>;

    /// 退出路径：暂停所有计时并立即写盘，返回被暂停的数量
    async fn pause_all_and_flush(&self) -> AppResult<usize>;

    /// 尽力写盘失败次数
    fn failed_write_count(&self) -> usize;
}

/// 工位注册表实现
pub struct StationRegistry {
    /// 拓扑和状态配置
    config: RegistryConfig,
    /// 状态存储
    store: Arc<dyn IStateStore>,
    /// 时钟
    clock: Arc<dyn Clock>,
    /// 全部spot记录（键为 `"<工位>_<序号>"`）
    state: RwLock<PersistedState>,
    /// 持久化闸门：修改和写盘在同一临界区内完成
    persist_gate: tokio::sync::Mutex<()>,
}

impl StationRegistry {
    /// 从存储加载状态并创建注册表
    pub async fn open(
        config: RegistryConfig,
        store: Arc<dyn IStateStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = store.load().await;
        let running = state.values().filter(|r| r.running).count();
        log::info!(
            "工位注册表已加载: {} 个工位 x {} 个spot, {} 条记录, {} 个正在计时",
            config.stations,
            config.spots,
            state.len(),
            running
        );
        Self {
            config,
            store,
            clock,
            state: RwLock::new(state),
            persist_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// 当前内存状态副本
    pub fn state_copy(&self) -> AppResult<PersistedState> {
        Ok(self.read_state()?.clone())
    }

    fn read_state(&self) -> AppResult<std::sync::RwLockReadGuard<'_, PersistedState>> {
        self.state
            .read()
            .map_err(|e| AppError::concurrency_error(format!("读取spot状态锁失败: {}", e)))
    }

    fn write_state(&self) -> AppResult<std::sync::RwLockWriteGuard<'_, PersistedState>> {
        self.state
            .write()
            .map_err(|e| AppError::concurrency_error(format!("写入spot状态锁失败: {}", e)))
    }

    fn is_known(&self, key: &SpotKey) -> bool {
        (1..=self.config.stations).contains(&key.station_id)
            && (1..=self.config.spots).contains(&key.spot_index)
    }

    fn ensure_known(&self, key: &SpotKey) -> AppResult<()> {
        if self.is_known(key) {
            Ok(())
        } else {
            Err(AppError::validation_error(format!(
                "spot {} 不在配置的工位范围内 ({} 个工位 x {} 个spot)",
                key, self.config.stations, self.config.spots
            )))
        }
    }

    fn default_record(&self) -> SpotRecord {
        SpotRecord::new_default(self.config.default_status())
    }

    fn view_of(key: &SpotKey, record: &SpotRecord, now: f64) -> SpotView {
        let elapsed = spot_timer::read_elapsed(record, now);
        SpotView {
            key: *key,
            station_id: key.station_id,
            spot_index: key.spot_index,
            status: record.status.clone(),
            wo_number: record.wo_number.clone(),
            elapsed_seconds: elapsed,
            running: record.running,
            phase: spot_timer::phase(record),
            display_text: format_elapsed(elapsed),
            place: record.place,
        }
    }

    /// 修改一个spot并写盘
    ///
    /// 闸门在修改前获取、写盘后释放；状态锁只在修改期间持有
    async fn mutate<R, F>(&self, key: &SpotKey, op: F) -> AppResult<(R, SpotView)>
    where
        F: FnOnce(&mut SpotRecord, f64) -> R + Send,
        R: Send,
    {
        self.ensure_known(key)?;
        let _gate = self.persist_gate.lock().await;
        let now = self.clock.now_secs();

        let (result, view, snapshot) = {
            let mut state = self.write_state()?;
            let default_record = self.default_record();
            let record = state.entry(key.to_string()).or_insert(default_record);
            let result = op(record, now);
            let view = Self::view_of(key, record, now);
            (result, view, state.clone())
        };

        self.store.save(&snapshot).await;
        Ok((result, view))
    }
}

#[async_trait]
impl IStationRegistry for StationRegistry {
    fn list_stations(&self) -> Vec<u32> {
        (1..=self.config.stations).collect()
    }

    fn list_spots(&self, station_id: u32) -> Vec<SpotKey> {
        if !(1..=self.config.stations).contains(&station_id) {
            return Vec::new();
        }
        (1..=self.config.spots)
            .map(|index| SpotKey::new(station_id, index))
            .collect()
    }

    fn status_names(&self) -> Vec<String> {
        self.config.statuses.clone()
    }

    fn get_spot(&self, station_id: u32, key: &SpotKey) -> AppResult<SpotRecord> {
        if key.station_id != station_id {
            return Err(AppError::validation_error(format!(
                "spot {} 不属于工位 {}",
                key, station_id
            )));
        }
        self.ensure_known(key)?;

        let key_text = key.to_string();
        if let Some(record) = self.read_state()?.get(&key_text) {
            return Ok(record.clone());
        }

        let mut state = self.write_state()?;
        let default_record = self.default_record();
        Ok(state.entry(key_text).or_insert(default_record).clone())
    }

    fn snapshot(&self, key: &SpotKey) -> AppResult<SpotView> {
        self.ensure_known(key)?;
        let now = self.clock.now_secs();
        let state = self.read_state()?;
        let view = match state.get(&key.to_string()) {
            Some(record) => Self::view_of(key, record, now),
            None => Self::view_of(key, &self.default_record(), now),
        };
        Ok(view)
    }

    fn read_elapsed(&self, key: &SpotKey) -> f64 {
        let now = self.clock.now_secs();
        self.read_state()
            .ok()
            .and_then(|state| state.get(&key.to_string()).map(|r| spot_timer::read_elapsed(r, now)))
            .unwrap_or(0.0)
    }

    fn is_running(&self, key: &SpotKey) -> bool {
        self.read_state()
            .ok()
            .and_then(|state| state.get(&key.to_string()).map(|r| r.running))
            .unwrap_or(false)
    }

    fn running_spots(&self) -> Vec<SpotKey> {
        let state = match self.read_state() {
            Ok(state) => state,
            Err(e) => {
                log::error!("{}", e);
                return Vec::new();
            }
        };
        state
            .iter()
            .filter(|(_, record)| record.running)
            .filter_map(|(key, _)| SpotKey::parse(key).ok())
            .collect()
    }

    fn station_summary(&self, station_id: u32) -> AppResult<StationSummary> {
        let spots = self.list_spots(station_id);
        if spots.is_empty() {
            return Err(AppError::not_found_error("station", format!("工位 {} 不存在", station_id)));
        }

        let state = self.read_state()?;
        let default_status = self.config.default_status();
        let mut status_counts: Vec<StatusCount> = self
            .config
            .statuses
            .iter()
            .map(|status| StatusCount { status: status.clone(), count: 0 })
            .collect();
        let mut running_count = 0;

        for key in &spots {
            let (status, running) = match state.get(&key.to_string()) {
                Some(record) => (record.status.as_str(), record.running),
                None => (default_status, false),
            };
            if running {
                running_count += 1;
            }
            if let Some(entry) = status_counts.iter_mut().find(|c| c.status == status) {
                entry.count += 1;
            }
        }

        Ok(StationSummary {
            station_id,
            spot_count: spots.len(),
            running_count,
            status_counts,
        })
    }

    async fn start(&self, key: &SpotKey) -> AppResult<SpotView> {
        let transition = self.config.auto_status_on_start.clone();
        let (changed, view) = self
            .mutate(key, move |record, now| {
                let changed = spot_timer::start(record, now);
                if changed {
                    if let Some(t) = transition {
                        if record.status == t.from {
                            record.status = t.to;
                        }
                    }
                }
                changed
            })
            .await?;
        if changed {
            crate::log_user_operation!("开始计时 spot {} (状态: {})", key, view.status);
        }
        Ok(view)
    }

    async fn pause(&self, key: &SpotKey) -> AppResult<SpotView> {
        let (changed, view) = self.mutate(key, spot_timer::pause).await?;
        if changed {
            crate::log_user_operation!("暂停计时 spot {} ({})", key, view.display_text);
        }
        Ok(view)
    }

    async fn stop(&self, key: &SpotKey) -> AppResult<LaborTime> {
        let (labor, _) = self.mutate(key, spot_timer::stop).await?;
        crate::log_user_operation!("停止计时 spot {}: {}", key, labor.display_text);
        Ok(labor)
    }

    async fn reset(&self, key: &SpotKey) -> AppResult<SpotView> {
        let default_status = self.config.default_status().to_string();
        let (_, view) = self
            .mutate(key, move |record, _| spot_timer::reset(record, &default_status))
            .await?;
        crate::log_user_operation!("重置 spot {}", key);
        Ok(view)
    }

    async fn toggle(&self, key: &SpotKey) -> AppResult<bool> {
        let view = if self.is_running(key) {
            self.pause(key).await?
        } else {
            self.start(key).await?
        };
        Ok(view.running)
    }

    async fn set_status(&self, key: &SpotKey, status: &str) -> AppResult<SpotView> {
        if !self.config.statuses.iter().any(|s| s == status) {
            return Err(AppError::validation_error(format!("未配置的状态: {}", status)));
        }
        let new_status = status.to_string();
        let (_, view) = self.mutate(key, move |record, _| record.status = new_status).await?;
        crate::log_user_operation!("spot {} 状态改为 {}", key, view.status);
        Ok(view)
    }

    async fn set_work_order(&self, key: &SpotKey, wo_number: &str) -> AppResult<SpotView> {
        let wo = wo_number.to_string();
        let (_, view) = self.mutate(key, move |record, _| record.wo_number = wo).await?;
        crate::log_user_operation!("spot {} 工单号设为 '{}'", key, view.wo_number);
        Ok(view)
    }

    async fn set_place(&self, key: &SpotKey, place: Place) -> AppResult<SpotView> {
        let (_, view) = self.mutate(key, move |record, _| record.place = Some(place)).await?;
        log::debug!("spot {} 看板坐标: ({}, {})", key, place.x, place.y);
        Ok(view)
    }

    async fn pause_all_and_flush(&self) -> AppResult<usize> {
        let _gate = self.persist_gate.lock().await;
        let now = self.clock.now_secs();

        let (paused, snapshot) = {
            let mut state = self.write_state()?;
            let mut paused = 0;
            for record in state.values_mut() {
                if spot_timer::pause(record, now) {
                    paused += 1;
                }
            }
            (paused, state.clone())
        };

        self.store.save_immediate(&snapshot).await?;
        log::info!("已暂停 {} 个计时并写盘", paused);
        Ok(paused)
    }

    fn failed_write_count(&self) -> usize {
        self.store.failed_write_count()
    }
}
