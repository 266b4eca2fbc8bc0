//! 计时生命周期集成测试
//!
//! 通过命令层驱动由 Tauri 托管的完整应用状态：手动时钟、临时状态文件、固定U盘列表。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use station_app_lib::commands;
use station_app_lib::models::{PersistedState, RemovableDrive, SpotRecord, TimerPhase};
use station_app_lib::services::application::ChannelDisplaySink;
use station_app_lib::services::infrastructure::usb::IDriveEnumerator;
use station_app_lib::utils::{AppConfig, ManualClock};
use station_app_lib::AppState;
use tauri::async_runtime::block_on;
use tauri::test::{mock_app, MockRuntime};
use tauri::{App, Manager, State};
use tempfile::TempDir;

struct FixedDrives(Vec<RemovableDrive>);

impl IDriveEnumerator for FixedDrives {
    fn removable_drives(&self) -> Vec<RemovableDrive> {
        self.0.clone()
    }
}

fn test_config(state_file: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.persistence_config.state_file = state_file.to_path_buf();
    config.timer_settings.usb_poll_interval_ms = 50;
    config
}

fn build_app(state_file: &Path, clock: Arc<ManualClock>) -> App<MockRuntime> {
    let (sink, _display_rx) = ChannelDisplaySink::new();
    let state = block_on(AppState::with_services(
        test_config(state_file),
        clock,
        Arc::new(FixedDrives(Vec::new())),
        Arc::new(sink),
    ))
    .unwrap();
    let app = mock_app();
    app.manage(state);
    app
}

fn state(app: &App<MockRuntime>) -> State<'_, AppState> {
    app.state::<AppState>()
}

fn read_state_file(path: &Path) -> PersistedState {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn state_path(dir: &TempDir) -> PathBuf {
    dir.path().join("timers_state.json")
}

#[test]
fn test_start_pause_resume_stop_accumulates_time() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(0.0));
    let app = build_app(&state_path(&dir), clock.clone());

    block_on(async {
        let view = commands::start_spot(state(&app), "1_1".to_string()).await.unwrap();
        assert!(view.running);
        assert_eq!(view.status, "In Progress");

        clock.set(5.0);
        let view = commands::pause_spot(state(&app), "1_1".to_string()).await.unwrap();
        assert_eq!(view.elapsed_seconds, 5.0);
        assert_eq!(view.phase, TimerPhase::Paused);

        clock.set(10.0);
        commands::start_spot(state(&app), "1_1".to_string()).await.unwrap();

        clock.set(12.0);
        let view = commands::get_spot(state(&app), 1, "1_1".to_string()).unwrap();
        assert_eq!(view.elapsed_seconds, 7.0);

        let labor = commands::stop_spot(state(&app), "1_1".to_string()).await.unwrap();
        assert_eq!(labor.hours, 0.0);

        let persisted = read_state_file(&state_path(&dir));
        let record = &persisted["1_1"];
        assert_eq!(record.elapsed_time, 7.0);
        assert!(!record.running);

        let report = state(&app).shutdown().await.unwrap();
        assert_eq!(report.paused_timers, 0);
        assert_eq!(report.failed_writes, 0);
    });
}

#[test]
fn test_missing_state_file_yields_default_spot() {
    let dir = TempDir::new().unwrap();
    let app = build_app(&state_path(&dir), Arc::new(ManualClock::new(100.0)));

    let view = commands::get_spot(state(&app), 2, "2_4".to_string()).unwrap();
    assert_eq!(view.status, "Unblocked");
    assert_eq!(view.wo_number, "");
    assert_eq!(view.elapsed_seconds, 0.0);
    assert_eq!(view.phase, TimerPhase::Stopped);
}

#[test]
fn test_edits_survive_restart() {
    let dir = TempDir::new().unwrap();
    let path = state_path(&dir);
    let clock = Arc::new(ManualClock::new(0.0));

    {
        let app = build_app(&path, clock.clone());
        block_on(async {
            commands::set_work_order(state(&app), "1_2".to_string(), " 12345678 ".to_string())
                .await
                .unwrap();
            commands::set_spot_status(state(&app), "1_2".to_string(), "Blocked".to_string())
                .await
                .unwrap();
            commands::set_spot_place(state(&app), "1_2".to_string(), 3.0, 4.5).await.unwrap();
            state(&app).shutdown().await.unwrap();
        });
    }

    let app = build_app(&path, clock);
    let view = commands::get_spot(state(&app), 1, "1_2".to_string()).unwrap();
    assert_eq!(view.wo_number, " 12345678 ");
    assert_eq!(view.status, "Blocked");
    let place = view.place.unwrap();
    assert_eq!((place.x, place.y), (3.0, 4.5));
}

#[test]
fn test_running_timer_recovered_after_crash() {
    let dir = TempDir::new().unwrap();
    let path = state_path(&dir);

    let mut persisted = PersistedState::new();
    let mut record = SpotRecord::new_default("In Progress");
    record.elapsed_time = 30.0;
    record.running = true;
    record.start_time = Some(1_000.0);
    persisted.insert("1_3".to_string(), record);
    // 配置拓扑以外的键原样保留
    persisted.insert("9_9".to_string(), SpotRecord::new_default("Finished"));
    std::fs::write(&path, serde_json::to_string(&persisted).unwrap()).unwrap();

    let app = build_app(&path, Arc::new(ManualClock::new(1_060.0)));

    block_on(async {
        state(&app).start_background().unwrap();

        let view = commands::get_spot(state(&app), 1, "1_3".to_string()).unwrap();
        assert!(view.running);
        assert_eq!(view.elapsed_seconds, 90.0);
        assert_eq!(commands::get_system_status(state(&app)).running_timers, 1);
        assert_eq!(state(&app).ticker_manager.active_count(), 1);

        let report = state(&app).shutdown().await.unwrap();
        assert_eq!(report.paused_timers, 1);
    });

    let persisted = read_state_file(&path);
    assert!(!persisted["1_3"].running);
    assert_eq!(persisted["1_3"].elapsed_time, 90.0);
    assert_eq!(persisted["9_9"].status, "Finished");
}

#[test]
fn test_invalid_command_input_is_rejected() {
    let dir = TempDir::new().unwrap();
    let app = build_app(&state_path(&dir), Arc::new(ManualClock::new(0.0)));

    block_on(async {
        assert!(commands::start_spot(state(&app), "abc".to_string()).await.is_err());
        assert!(commands::start_spot(state(&app), "01_1".to_string()).await.is_err());
        assert!(commands::get_spot(state(&app), 2, "1_1".to_string()).is_err());
        assert!(commands::start_spot(state(&app), "7_1".to_string()).await.is_err());
        assert!(commands::set_spot_status(state(&app), "1_1".to_string(), "Lost".to_string())
            .await
            .is_err());
        assert!(commands::set_spot_place(state(&app), "1_1".to_string(), f64::NAN, 0.0)
            .await
            .is_err());
    });

    // 拒绝的操作不写盘
    assert!(!state_path(&dir).exists());
}

#[test]
fn test_toggle_and_reset_keep_place() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(0.0));
    let app = build_app(&state_path(&dir), clock.clone());

    block_on(async {
        commands::set_spot_place(state(&app), "2_1".to_string(), 1.0, 2.0).await.unwrap();
        assert!(commands::toggle_spot(state(&app), "2_1".to_string()).await.unwrap());
        clock.set(20.0);
        assert!(!commands::toggle_spot(state(&app), "2_1".to_string()).await.unwrap());

        let summary = commands::get_station_summary(state(&app), 2).unwrap();
        assert_eq!(summary.spot_count, 6);
        assert_eq!(summary.running_count, 0);

        let view = commands::reset_spot(state(&app), "2_1".to_string()).await.unwrap();
        assert_eq!(view.elapsed_seconds, 0.0);
        assert_eq!(view.status, "Unblocked");
        assert!(view.place.is_some());

        state(&app).shutdown().await.unwrap();
    });
}

#[test]
fn test_shutdown_reports_failed_final_save() {
    let dir = TempDir::new().unwrap();
    let state_dir = dir.path().join("state");
    let path = state_dir.join("timers_state.json");
    let clock = Arc::new(ManualClock::new(0.0));
    let app = build_app(&path, clock.clone());

    block_on(async {
        commands::start_spot(state(&app), "1_1".to_string()).await.unwrap();
        assert!(path.is_file());

        // 状态目录被替换成普通文件，之后所有写盘都会失败
        std::fs::remove_dir_all(&state_dir).unwrap();
        std::fs::write(&state_dir, "not a directory").unwrap();

        // 尽力写盘失败不影响操作本身
        clock.set(30.0);
        let view = commands::set_work_order(state(&app), "1_1".to_string(), "12345678".to_string())
            .await
            .unwrap();
        assert_eq!(view.wo_number, "12345678");
        assert!(commands::get_system_status(state(&app)).failed_writes >= 1);

        let err = state(&app).shutdown().await.unwrap_err();
        assert_eq!(err.error_code(), "PERSISTENCE_ERROR");

        // 内存中的计时仍然被暂停
        let view = commands::get_spot(state(&app), 1, "1_1".to_string()).unwrap();
        assert!(!view.running);
        assert_eq!(view.elapsed_seconds, 30.0);
    });
}
