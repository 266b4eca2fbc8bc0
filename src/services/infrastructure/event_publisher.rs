/// 前端事件发布
///
/// 计时显示刷新和U盘列表变化通过 Tauri 事件推送到界面。
/// AppHandle 在窗口创建后才可用，之前发布的事件直接丢弃。

use once_cell::sync::OnceCell;
use serde::Serialize;
use tauri::{AppHandle, Emitter, Runtime};

use crate::models::{DisplayUpdate, RemovableDrive};
use crate::services::application::IDisplaySink;
use crate::utils::error::{AppError, AppResult};

/// 计时显示刷新事件
pub const SPOT_TIMER_TICK_EVENT: &str = "spot-timer-tick";

/// U盘列表变化事件
pub const USB_DRIVES_CHANGED_EVENT: &str = "usb-drives-changed";

/// Tauri 事件发布器
pub struct TauriEventPublisher<R: Runtime = tauri::Wry> {
    handle: OnceCell<AppHandle<R>>,
}

impl<R: Runtime> TauriEventPublisher<R> {
    pub fn new() -> Self {
        Self {
            handle: OnceCell::new(),
        }
    }

    /// 绑定 AppHandle，只能绑定一次
    pub fn attach(&self, handle: AppHandle<R>) {
        if self.handle.set(handle).is_err() {
            log::warn!("[EventPublisher] AppHandle已经设置过了");
        } else {
            log::info!("[EventPublisher] AppHandle设置成功");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.handle.get().is_some()
    }

    fn emit_to_frontend<S: Serialize + Clone>(&self, event_name: &str, payload: S) -> AppResult<()> {
        let Some(handle) = self.handle.get() else {
            log::trace!("[EventPublisher] AppHandle未设置，丢弃事件: {}", event_name);
            return Ok(());
        };
        handle.emit(event_name, payload).map_err(|e| {
            log::error!("[EventPublisher] 发布事件到前端失败: {} - {}", event_name, e);
            AppError::generic(format!("发布事件失败: {}", e))
        })
    }

    /// 推送当前U盘列表
    pub fn publish_drives(&self, drives: &[RemovableDrive]) {
        // 错误已在 emit_to_frontend 中记录
        let _ = self.emit_to_frontend(USB_DRIVES_CHANGED_EVENT, drives.to_vec());
    }
}

impl<R: Runtime> Default for TauriEventPublisher<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Runtime> IDisplaySink for TauriEventPublisher<R> {
    fn publish(&self, update: DisplayUpdate) {
        let _ = self.emit_to_frontend(SPOT_TIMER_TICK_EVENT, update);
    }
}
