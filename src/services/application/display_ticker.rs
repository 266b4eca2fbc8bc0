/// 计时显示刷新
///
/// 每个正在显示的spot有一个周期任务，每个周期读取一次已用时间并推送给界面。
/// 观察到计时已停止时推送最后一次读数后自行结束。

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::models::{DisplayUpdate, SpotKey};
use crate::services::domain::IStationRegistry;
use crate::services::infrastructure::scheduler::PeriodicTask;
use crate::utils::error::{AppError, AppResult};
use crate::utils::time_utils::format_elapsed;

/// 显示输出接口
pub trait IDisplaySink: Send + Sync {
    fn publish(&self, update: DisplayUpdate);
}

/// 把显示刷新转发到通道，测试中用来观察刷新
#[derive(Debug, Clone)]
pub struct ChannelDisplaySink {
    sender: mpsc::UnboundedSender<DisplayUpdate>,
}

impl ChannelDisplaySink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DisplayUpdate>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl IDisplaySink for ChannelDisplaySink {
    fn publish(&self, update: DisplayUpdate) {
        // 接收端已关闭说明窗口正在退出
        if self.sender.send(update).is_err() {
            log::trace!("显示通道已关闭，丢弃刷新");
        }
    }
}

/// 单个spot的显示刷新
pub struct DisplayTicker;

impl DisplayTicker {
    /// 启动刷新任务
    pub fn spawn(
        key: SpotKey,
        registry: Arc<dyn IStationRegistry>,
        sink: Arc<dyn IDisplaySink>,
        period: Duration,
        cancellation_token: CancellationToken,
    ) -> PeriodicTask {
        PeriodicTask::spawn_with_token(
            format!("display-{}", key),
            period,
            cancellation_token,
            move || {
                let running = registry.is_running(&key);
                let text = format_elapsed(registry.read_elapsed(&key));
                sink.publish(DisplayUpdate { key, text, running });
                if running {
                    ControlFlow::Continue(())
                } else {
                    ControlFlow::Break(())
                }
            },
        )
    }
}

/// 显示刷新管理器：每个spot最多一个刷新任务
pub struct TickerManager {
    registry: Arc<dyn IStationRegistry>,
    sink: Arc<dyn IDisplaySink>,
    period: Duration,
    /// 父令牌，`stop_all` 时一并取消
    root_token: CancellationToken,
    tickers: Mutex<HashMap<SpotKey, PeriodicTask>>,
}

impl TickerManager {
    pub fn new(
        registry: Arc<dyn IStationRegistry>,
        sink: Arc<dyn IDisplaySink>,
        period: Duration,
    ) -> Self {
        Self {
            registry,
            sink,
            period,
            root_token: CancellationToken::new(),
            tickers: Mutex::new(HashMap::new()),
        }
    }

    fn lock_tickers(&self) -> AppResult<std::sync::MutexGuard<'_, HashMap<SpotKey, PeriodicTask>>> {
        self.tickers
            .lock()
            .map_err(|e| AppError::concurrency_error(format!("刷新任务表锁失败: {}", e)))
    }

    /// 为spot启动刷新；已有的任务被取消并替换
    pub fn restart(&self, key: SpotKey) -> AppResult<()> {
        if self.root_token.is_cancelled() {
            return Err(AppError::concurrency_error("显示刷新已全部停止"));
        }
        let ticker = DisplayTicker::spawn(
            key,
            self.registry.clone(),
            self.sink.clone(),
            self.period,
            self.root_token.child_token(),
        );

        let mut tickers = self.lock_tickers()?;
        tickers.retain(|_, task| !task.is_finished());
        if let Some(previous) = tickers.insert(key, ticker) {
            previous.cancel();
        }
        Ok(())
    }

    /// 为所有正在计时的spot启动刷新（启动时恢复）
    pub fn resume_running(&self) -> AppResult<usize> {
        let running = self.registry.running_spots();
        for key in &running {
            self.restart(*key)?;
        }
        Ok(running.len())
    }

    /// 当前仍在运行的刷新任务数
    pub fn active_count(&self) -> usize {
        self.lock_tickers()
            .map(|tickers| tickers.values().filter(|t| !t.is_finished()).count())
            .unwrap_or(0)
    }

    /// 取消全部刷新并等待结束（窗口关闭）
    pub async fn stop_all(&self) -> AppResult<()> {
        self.root_token.cancel();
        let tasks: Vec<PeriodicTask> = {
            let mut tickers = self.lock_tickers()?;
            tickers.drain().map(|(_, task)| task).collect()
        };
        let count = tasks.len();
        let results = futures::future::join_all(tasks.into_iter().map(PeriodicTask::join)).await;
        for e in results.into_iter().filter_map(Result::err) {
            log::warn!("{}", e);
        }
        log::info!("已停止 {} 个显示刷新任务", count);
        Ok(())
    }
}
