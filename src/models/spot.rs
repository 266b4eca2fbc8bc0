/// Spot 数据模型
///
/// spot 是工位内的一个作业位，也是计时的最小单位。
/// 持久化格式为扁平的 `{ "<工位号>_<序号>": SpotRecord }` JSON 对象。

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::utils::error::AppError;

/// spot 复合键 `(station_id, spot_index)`，外部表示为 `"<station_id>_<spot_index>"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpotKey {
    pub station_id: u32,
    pub spot_index: u32,
}

impl SpotKey {
    pub fn new(station_id: u32, spot_index: u32) -> Self {
        Self { station_id, spot_index }
    }

    /// 解析 `"1_3"` 形式的键
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let (station, index) = raw
            .split_once('_')
            .ok_or_else(|| AppError::validation_error(format!("无效的spot键: {}", raw)))?;

        let station_id = parse_key_part(station, "工位号", raw)?;
        let spot_index = parse_key_part(index, "spot序号", raw)?;
        Ok(Self { station_id, spot_index })
    }
}

/// 键的一段：只允许ASCII数字、不允许前导零，保证解析后再格式化得到同一个字符串
fn parse_key_part(part: &str, what: &str, raw: &str) -> Result<u32, AppError> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::validation_error(format!("无效的{}: {}", what, raw)));
    }
    if part.starts_with('0') {
        return Err(AppError::validation_error(format!("{}从1开始且不能有前导零: {}", what, raw)));
    }
    part.parse::<u32>()
        .map_err(|_| AppError::validation_error(format!("{}超出范围: {}", what, raw)))
}

impl fmt::Display for SpotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.station_id, self.spot_index)
    }
}

impl FromStr for SpotKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for SpotKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SpotKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        SpotKey::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// 看板坐标（仅看板界面使用）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Place {
    pub x: f64,
    pub y: f64,
}

/// 旧版本写入的 `"wo_number": null` 读作空字符串
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// spot 持久化记录
///
/// 运行中时真实已用时间 = `elapsed_time + (now - start_time)`；
/// `elapsed_time` 只在非运行状态下才是准确值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotRecord {
    /// 当前状态名（配置中的状态列表之一）
    #[serde(default)]
    pub status: String,
    /// 工单号，原样保存
    #[serde(default, deserialize_with = "null_as_empty")]
    pub wo_number: String,
    /// 累计有效时间（秒）
    #[serde(default)]
    pub elapsed_time: f64,
    /// 是否正在计时
    #[serde(default)]
    pub running: bool,
    /// 最近一次开始计时的时间戳（Unix秒），仅运行中有意义
    #[serde(default)]
    pub start_time: Option<f64>,
    /// 看板坐标
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<Place>,
}

impl SpotRecord {
    /// 首次访问时创建的默认记录
    pub fn new_default(default_status: impl Into<String>) -> Self {
        Self {
            status: default_status.into(),
            wo_number: String::new(),
            elapsed_time: 0.0,
            running: false,
            start_time: None,
            place: None,
        }
    }
}

/// 持久化状态：spot键字符串 -> 记录
///
/// 使用字符串键，配置拓扑以外的键也原样保留。
pub type PersistedState = BTreeMap<String, SpotRecord>;
