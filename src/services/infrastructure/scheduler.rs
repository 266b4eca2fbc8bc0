/// 周期任务
///
/// 在tokio运行时上按固定周期执行一个闭包，直到闭包返回 `ControlFlow::Break`
/// 或者取消令牌被触发。计时显示刷新使用它实现每秒重绘。

use std::ops::ControlFlow;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::utils::error::{AppError, AppResult};

/// 已启动的周期任务句柄
#[derive(Debug)]
pub struct PeriodicTask {
    /// 任务名称（日志用）
    name: String,
    /// 取消令牌
    cancellation_token: CancellationToken,
    /// 任务句柄
    task_handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// 启动周期任务，第一次调用立即发生
    pub fn spawn<F>(name: impl Into<String>, period: Duration, tick: F) -> Self
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        Self::spawn_with_token(name, period, CancellationToken::new(), tick)
    }

    /// 使用外部令牌启动（可传入父令牌的 `child_token()` 实现级联取消）
    pub fn spawn_with_token<F>(
        name: impl Into<String>,
        period: Duration,
        cancellation_token: CancellationToken,
        mut tick: F,
    ) -> Self
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let name = name.into();
        let task_name = name.clone();
        let token = cancellation_token.clone();

        let task_handle = tokio::spawn(async move {
            let mut ticker = interval(period.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        log::debug!("周期任务已取消: {}", task_name);
                        break;
                    }
                    _ = ticker.tick() => {
                        if tick().is_break() {
                            log::debug!("周期任务自行结束: {}", task_name);
                            break;
                        }
                    }
                }
            }
        });

        Self {
            name,
            cancellation_token,
            task_handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 请求取消；已结束的任务无影响
    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }

    /// 任务是否已经结束
    pub fn is_finished(&self) -> bool {
        self.task_handle.is_finished()
    }

    /// 等待任务结束
    pub async fn join(self) -> AppResult<()> {
        self.task_handle
            .await
            .map_err(|e| AppError::concurrency_error(format!("周期任务 {} 异常结束: {}", self.name, e)))
    }

    /// 取消并等待结束
    pub async fn cancel_and_join(self) -> AppResult<()> {
        self.cancel();
        self.join().await
    }
}
