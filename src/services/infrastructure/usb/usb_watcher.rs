/// U盘插拔监视
///
/// 独立线程按周期枚举可移动磁盘，只在磁盘集合变化时通过通道发送；
/// 回调在tokio事件循环上的分发任务中执行，线程本身不接触任何界面或计时状态。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use super::drive_enumerator::IDriveEnumerator;
use crate::models::RemovableDrive;
use crate::utils::error::{AppError, AppResult};

/// 磁盘集合变化回调
pub type DrivesChangedCallback = Box<dyn Fn(&[RemovableDrive]) + Send + Sync>;

/// 停止标志的检查粒度
const STOP_CHECK_SLICE: Duration = Duration::from_millis(50);

/// U盘监视器
pub struct UsbWatcher {
    enumerator: Arc<dyn IDriveEnumerator>,
    poll_interval: Duration,
    callbacks: Arc<Mutex<Vec<DrivesChangedCallback>>>,
    /// 最近一次分发的磁盘集合
    current: Arc<RwLock<Vec<RemovableDrive>>>,
    stop_flag: Arc<AtomicBool>,
    poll_thread: Mutex<Option<thread::JoinHandle<()>>>,
    dispatcher: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl UsbWatcher {
    pub fn new(enumerator: Arc<dyn IDriveEnumerator>, poll_interval: Duration) -> Self {
        Self {
            enumerator,
            poll_interval,
            callbacks: Arc::new(Mutex::new(Vec::new())),
            current: Arc::new(RwLock::new(Vec::new())),
            stop_flag: Arc::new(AtomicBool::new(false)),
            poll_thread: Mutex::new(None),
            dispatcher: Mutex::new(None),
        }
    }

    /// 注册磁盘变化回调
    pub fn register_callback(&self, callback: DrivesChangedCallback) -> AppResult<()> {
        self.callbacks
            .lock()
            .map_err(|e| AppError::concurrency_error(format!("U盘回调表锁失败: {}", e)))?
            .push(callback);
        Ok(())
    }

    /// 最近一次观察到的磁盘集合
    pub fn current_drives(&self) -> Vec<RemovableDrive> {
        self.current.read().map(|d| d.clone()).unwrap_or_default()
    }

    pub fn is_running(&self) -> bool {
        self.poll_thread.lock().map(|t| t.is_some()).unwrap_or(false)
    }

    /// 启动轮询线程和分发任务，必须在tokio运行时内调用
    pub fn start(&self) -> AppResult<()> {
        let mut poll_thread = self
            .poll_thread
            .lock()
            .map_err(|e| AppError::concurrency_error(format!("U盘监视线程锁失败: {}", e)))?;
        if poll_thread.is_some() {
            return Ok(());
        }

        self.stop_flag.store(false, Ordering::SeqCst);
        let (sender, mut receiver) = mpsc::unbounded_channel::<Vec<RemovableDrive>>();

        let enumerator = Arc::clone(&self.enumerator);
        let stop_flag = Arc::clone(&self.stop_flag);
        let poll_interval = self.poll_interval;
        let handle = thread::Builder::new()
            .name("usb-watcher".to_string())
            .spawn(move || {
                let mut last_seen: Vec<RemovableDrive> = Vec::new();
                while !stop_flag.load(Ordering::SeqCst) {
                    let drives = enumerator.removable_drives();
                    if drives != last_seen {
                        last_seen = drives.clone();
                        if sender.send(drives).is_err() {
                            break;
                        }
                    }

                    let deadline = Instant::now() + poll_interval;
                    while Instant::now() < deadline && !stop_flag.load(Ordering::SeqCst) {
                        thread::sleep(STOP_CHECK_SLICE.min(poll_interval));
                    }
                }
                log::debug!("U盘监视线程退出");
            })
            .map_err(|e| AppError::service_initialization_error("UsbWatcher", format!("无法启动U盘监视线程: {}", e)))?;
        *poll_thread = Some(handle);

        let callbacks = Arc::clone(&self.callbacks);
        let current = Arc::clone(&self.current);
        let dispatcher = tokio::spawn(async move {
            while let Some(drives) = receiver.recv().await {
                log::info!(
                    "U盘变化: [{}]",
                    drives.iter().map(|d| d.display_label.as_str()).collect::<Vec<_>>().join(", ")
                );
                if let Ok(mut current) = current.write() {
                    *current = drives.clone();
                }
                match callbacks.lock() {
                    Ok(callbacks) => {
                        for callback in callbacks.iter() {
                            callback(&drives);
                        }
                    }
                    Err(e) => log::error!("U盘回调表锁失败: {}", e),
                }
            }
        });
        *self
            .dispatcher
            .lock()
            .map_err(|e| AppError::concurrency_error(format!("U盘分发任务锁失败: {}", e)))? = Some(dispatcher);

        log::info!("U盘监视已启动，轮询周期 {:?}", self.poll_interval);
        Ok(())
    }

    /// 停止线程并等待分发任务结束
    pub async fn stop(&self) -> AppResult<()> {
        self.stop_flag.store(true, Ordering::SeqCst);

        let poll_thread = self
            .poll_thread
            .lock()
            .map_err(|e| AppError::concurrency_error(format!("U盘监视线程锁失败: {}", e)))?
            .take();
        if let Some(handle) = poll_thread {
            tokio::task::spawn_blocking(move || handle.join())
                .await
                .map_err(|e| AppError::concurrency_error(format!("等待U盘监视线程失败: {}", e)))?
                .map_err(|_| AppError::concurrency_error("U盘监视线程异常退出"))?;
        }

        let dispatcher = self
            .dispatcher
            .lock()
            .map_err(|e| AppError::concurrency_error(format!("U盘分发任务锁失败: {}", e)))?
            .take();
        if let Some(dispatcher) = dispatcher {
            dispatcher
                .await
                .map_err(|e| AppError::concurrency_error(format!("U盘分发任务异常结束: {}", e)))?;
        }

        log::info!("U盘监视已停止");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::infrastructure::usb::drive_enumerator::MockIDriveEnumerator;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;

    fn drive(label: &str) -> RemovableDrive {
        RemovableDrive {
            drive_path: PathBuf::from(format!("/media/{}", label)),
            display_label: label.to_string(),
        }
    }

    #[tokio::test]
    async fn test_only_changes_are_dispatched() {
        let polls = Arc::new(AtomicUsize::new(0));
        let poll_counter = polls.clone();
        let mut enumerator = MockIDriveEnumerator::new();
        enumerator.expect_removable_drives().returning(move || {
            // 第3次轮询插入U盘，第6次拔出
            match poll_counter.fetch_add(1, Ordering::SeqCst) {
                0..=1 => vec![],
                2..=4 => vec![drive("USB")],
                _ => vec![],
            }
        });

        let watcher = UsbWatcher::new(Arc::new(enumerator), Duration::from_millis(5));
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        watcher
            .register_callback(Box::new(move |drives: &[RemovableDrive]| {
                let _ = seen_tx.send(drives.len());
            }))
            .unwrap();
        watcher.start().unwrap();

        let first = tokio::time::timeout(Duration::from_secs(5), seen_rx.recv()).await.unwrap();
        assert_eq!(first, Some(1));
        let second = tokio::time::timeout(Duration::from_secs(5), seen_rx.recv()).await.unwrap();
        assert_eq!(second, Some(0));

        watcher.stop().await.unwrap();
        assert!(!watcher.is_running());
        assert!(watcher.current_drives().is_empty());
        // 稳定状态期间没有重复分发
        assert!(seen_rx.try_recv().is_err());
    }
}
