/// 界面命令返回的视图结构

use serde::{Deserialize, Serialize};

use super::spot::{Place, SpotKey};

/// 计时阶段（仅用于显示；持久化层只有 elapsed + running）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerPhase {
    /// 未开始或已重置
    Stopped,
    Running,
    Paused,
}

/// 单个spot的界面视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotView {
    pub key: SpotKey,
    pub station_id: u32,
    pub spot_index: u32,
    pub status: String,
    pub wo_number: String,
    pub elapsed_seconds: f64,
    pub running: bool,
    pub phase: TimerPhase,
    pub display_text: String,
    pub place: Option<Place>,
}

/// 某个状态的spot数量
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: String,
    pub count: usize,
}

/// 工位汇总（看板使用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationSummary {
    pub station_id: u32,
    pub spot_count: usize,
    pub running_count: usize,
    /// 按配置顺序排列
    pub status_counts: Vec<StatusCount>,
}

/// 停止计时后的工时
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaborTime {
    pub hours: f64,
    pub display_text: String,
}

/// 计时显示刷新
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayUpdate {
    pub key: SpotKey,
    pub text: String,
    pub running: bool,
}
