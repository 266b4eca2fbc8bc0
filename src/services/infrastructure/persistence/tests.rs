#[cfg(test)]
mod tests {
    use crate::models::{PersistedState, Place, SpotRecord};
    use crate::services::infrastructure::persistence::{IStateStore, JsonStateStore};
    use crate::services::traits::BaseService;
    use crate::utils::config::PersistenceConfig;
    use tempfile::TempDir;

    /// 创建测试用的状态存储
    async fn create_test_store(keep_backup: bool) -> (JsonStateStore, TempDir) {
        let _ = env_logger::builder().is_test(true).try_init();
        let temp_dir = TempDir::new().unwrap();
        let config = PersistenceConfig {
            state_file: temp_dir.path().join("state").join("timers_state.json"),
            keep_backup,
        };
        let mut store = JsonStateStore::new(config);
        store.initialize().await.unwrap();
        (store, temp_dir)
    }

    fn sample_state() -> PersistedState {
        let mut state = PersistedState::new();
        let mut running = SpotRecord::new_default("In Progress");
        running.wo_number = "12345678".to_string();
        running.elapsed_time = 42.5;
        running.running = true;
        running.start_time = Some(1_700_000_000.25);
        state.insert("1_1".to_string(), running);

        let mut placed = SpotRecord::new_default("Unblocked");
        placed.place = Some(Place { x: 50.0, y: 150.0 });
        state.insert("2_3".to_string(), placed);
        state
    }

    #[tokio::test]
    async fn test_load_missing_file_returns_empty() {
        let (store, _dir) = create_test_store(true).await;
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_returns_same_state() {
        let (store, _dir) = create_test_store(true).await;
        let state = sample_state();

        store.save(&state).await;
        assert_eq!(store.failed_write_count(), 0);

        let loaded = store.load().await;
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn test_save_keeps_previous_generation_as_backup() {
        let (store, _dir) = create_test_store(true).await;
        let first = sample_state();
        store.save(&first).await;

        let mut second = first.clone();
        second.remove("2_3");
        store.save(&second).await;

        let backup = std::fs::read_to_string(store.backup_file_path()).unwrap();
        let backup_state: PersistedState = serde_json::from_str(&backup).unwrap();
        assert_eq!(backup_state, first);
        assert_eq!(store.load().await, second);
    }

    #[tokio::test]
    async fn test_backup_disabled() {
        let (store, _dir) = create_test_store(false).await;
        store.save(&sample_state()).await;
        store.save(&sample_state()).await;
        assert!(!store.backup_file_path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_falls_back_to_backup() {
        let (store, _dir) = create_test_store(true).await;
        let state = sample_state();
        store.save(&state).await;
        store.save(&state).await;

        // 模拟写到一半被中断的文件
        std::fs::write(store.state_file_path(), "{\"1_1\": {\"status\": ").unwrap();
        assert_eq!(store.load().await, state);
    }

    #[tokio::test]
    async fn test_corrupt_file_without_backup_returns_empty() {
        let (store, _dir) = create_test_store(true).await;
        std::fs::write(store.state_file_path(), "not json at all").unwrap();
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_bad_entry_is_skipped() {
        let (store, _dir) = create_test_store(true).await;
        std::fs::write(
            store.state_file_path(),
            r#"{"1_1": {"status": "Packing", "elapsed_time": 10.0}, "1_2": {"elapsed_time": "ten"}}"#,
        )
        .unwrap();

        let loaded = store.load().await;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded["1_1"].status, "Packing");
        assert_eq!(loaded["1_1"].elapsed_time, 10.0);
    }

    #[tokio::test]
    async fn test_unwritable_location() {
        let temp_dir = TempDir::new().unwrap();
        // 用一个普通文件占住父目录位置，写入必然失败
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let store = JsonStateStore::new(PersistenceConfig {
            state_file: blocker.join("timers_state.json"),
            keep_backup: true,
        });

        store.save(&sample_state()).await;
        assert_eq!(store.failed_write_count(), 1);

        let err = store.save_immediate(&sample_state()).await.unwrap_err();
        assert_eq!(err.error_code(), "PERSISTENCE_ERROR");
        // 立即保存失败不计入尽力保存计数
        assert_eq!(store.failed_write_count(), 1);
    }
}
