/// Spot计时状态机
///
/// 计时只有两种存储状态：空闲（累计 `elapsed_time` 秒）和运行（从 `start_time`
/// 开始的一段时间加上之前的累计）。已用时间按需计算，不依赖周期回调。
///
/// 所有操作接收调用方提供的 `now`（Unix秒），本模块不读取时钟。

use crate::models::{LaborTime, SpotRecord, TimerPhase};
use crate::utils::time_utils::{format_labor_time, labor_hours};

/// 运行区间长度，时钟回拨时按0处理
#[inline]
fn running_delta(record: &SpotRecord, now: f64) -> f64 {
    match record.start_time {
        Some(start) if record.running => {
            let delta = now - start;
            if delta.is_finite() && delta > 0.0 {
                delta
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// 把当前运行区间并入累计时间并进入空闲
fn fold_running(record: &mut SpotRecord, now: f64) {
    record.elapsed_time = read_elapsed(record, now);
    record.running = false;
    record.start_time = None;
}

/// 开始计时。已在运行时不做任何事，返回是否发生了变化
pub fn start(record: &mut SpotRecord, now: f64) -> bool {
    if record.running {
        return false;
    }
    record.start_time = Some(now);
    record.running = true;
    true
}

/// 暂停计时。未运行时不做任何事，返回是否发生了变化
pub fn pause(record: &mut SpotRecord, now: f64) -> bool {
    if !record.running {
        return false;
    }
    fold_running(record, now);
    true
}

/// 停止计时并返回工时。累计时间保留，供工时显示
pub fn stop(record: &mut SpotRecord, now: f64) -> LaborTime {
    if record.running {
        fold_running(record, now);
    } else {
        record.running = false;
        record.start_time = None;
    }
    labor_time(record.elapsed_time)
}

/// 重置：清空时间和工单，状态回到默认。看板坐标保留
pub fn reset(record: &mut SpotRecord, default_status: &str) {
    record.elapsed_time = 0.0;
    record.running = false;
    record.start_time = None;
    record.status = default_status.to_string();
    record.wo_number.clear();
}

/// 当前已用时间（秒），纯读取
pub fn read_elapsed(record: &SpotRecord, now: f64) -> f64 {
    let stored = if record.elapsed_time.is_finite() && record.elapsed_time > 0.0 {
        record.elapsed_time
    } else {
        0.0
    };
    stored + running_delta(record, now)
}

/// 显示用阶段
pub fn phase(record: &SpotRecord) -> TimerPhase {
    if record.running {
        TimerPhase::Running
    } else if record.elapsed_time > 0.0 {
        TimerPhase::Paused
    } else {
        TimerPhase::Stopped
    }
}

/// 秒数对应的工时
pub fn labor_time(elapsed_seconds: f64) -> LaborTime {
    let hours = labor_hours(elapsed_seconds);
    LaborTime {
        hours,
        display_text: format_labor_time(hours),
    }
}
