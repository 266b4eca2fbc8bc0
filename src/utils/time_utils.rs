use chrono::Utc;
use std::sync::Mutex;

/// 时间源抽象，计时器只通过它获取当前时间（秒，Unix纪元，带小数）
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> f64;
}

/// 系统时钟
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now_secs(&self) -> f64 {
        Utc::now().timestamp_micros() as f64 / 1_000_000.0
    }
}

/// 手动时钟，测试中用来精确推进时间
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    pub fn new(start_secs: f64) -> Self {
        Self { now: Mutex::new(start_secs) }
    }

    pub fn set(&self, secs: f64) {
        if let Ok(mut now) = self.now.lock() {
            *now = secs;
        }
    }

    pub fn advance(&self, delta_secs: f64) {
        if let Ok(mut now) = self.now.lock() {
            *now += delta_secs;
        }
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> f64 {
        self.now.lock().map(|now| *now).unwrap_or_default()
    }
}

/// 保留两位小数
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 秒数换算为工时（小时，两位小数）
#[inline]
pub fn labor_hours(elapsed_seconds: f64) -> f64 {
    round2(elapsed_seconds / 3600.0)
}

/// 计时显示格式：不足一小时为 `MM:SS`，否则为 `HH:MM`
pub fn format_elapsed(elapsed_seconds: f64) -> String {
    let total = if elapsed_seconds.is_finite() && elapsed_seconds > 0.0 {
        elapsed_seconds.floor() as u64
    } else {
        0
    };

    if total < 3600 {
        format!("{:02}:{:02}", total / 60, total % 60)
    } else {
        format!("{:02}:{:02}", total / 3600, (total % 3600) / 60)
    }
}

/// 工时显示文本
pub fn format_labor_time(hours: f64) -> String {
    format!("Labor time: {:.2} h", hours)
}
