#[cfg(test)]
mod tests {
    use crate::utils::error::AppError;
    use crate::utils::config::{AppConfig, ConfigManager, SpotStatusConfig, StatusTransition};
    use tempfile::tempdir;

    /// 测试AppError的创建和错误代码
    #[test]
    fn test_app_error_creation() {
        let error = AppError::generic("测试错误");
        assert_eq!(error.error_code(), "GENERIC");
        assert!(error.to_string().contains("测试错误"));

        let not_found = AppError::not_found_error("WorkOrder", "12345678");
        assert_eq!(not_found.error_code(), "NOT_FOUND_ERROR");
        assert!(not_found.to_string().contains("WorkOrder"));

        let io_error = AppError::io_error("文件读取失败", "Unknown");
        assert_eq!(io_error.error_code(), "IO_ERROR");
        assert!(io_error.to_string().contains("文件读取失败"));
    }

    /// 测试错误转换 (From trait)
    #[test]
    fn test_error_conversion() {
        let string_error: AppError = String::from("字符串错误").into();
        assert_eq!(string_error.error_code(), "GENERIC");

        let str_error: AppError = "字符串错误".into();
        assert_eq!(str_error.error_code(), "GENERIC");

        let json_error = serde_json::from_str::<serde_json::Value>("{invalid json}")
            .expect_err("应该产生JSON错误");
        let app_error: AppError = json_error.into();
        assert_eq!(app_error.error_code(), "JSON_ERROR");

        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let app_error: AppError = io_error.into();
        assert_eq!(app_error.error_code(), "IO_ERROR");
        assert!(app_error.to_string().contains("PermissionDenied"));
    }

    /// 测试应用配置的默认值
    #[test]
    fn test_app_config_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.app_settings.stations, 2);
        assert_eq!(config.app_settings.spots, 6);
        assert_eq!(config.default_status(), "Unblocked");
        assert_eq!(config.status_names()[1], "In Progress");
        assert_eq!(config.timer_settings.tick_interval_ms, 1000);
        assert_eq!(config.timer_settings.usb_poll_interval_ms, 2000);
        assert_eq!(config.persistence_config.state_file.to_str(), Some("timers_state.json"));
        assert!(config.persistence_config.keep_backup);
    }

    /// 部分字段缺失的配置文件使用默认值补齐
    #[test]
    fn test_partial_config_deserialization() {
        let json = r#"{
            "app_settings": { "title": "Bay 3", "stations": 4, "spots": 3, "columns": 3 },
            "spot_statuses": [ { "name": "Idle" }, { "name": "Busy", "color": "red" } ]
        }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.app_settings.stations, 4);
        assert_eq!(config.default_status(), "Idle");
        assert_eq!(config.spot_statuses[0].color, "");
        assert_eq!(config.timer_settings.tick_interval_ms, 1000);
    }

    /// 测试配置管理器基本功能
    #[tokio::test]
    async fn test_config_manager_creates_default_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config").join("station_config.json");

        let mut manager = ConfigManager::new(config_path.clone());
        manager.load_from_file().await.unwrap();
        assert!(config_path.exists());

        manager.get_config_mut().app_settings.stations = 5;
        manager.save_to_file().await.unwrap();

        let mut reloaded = ConfigManager::new(config_path);
        reloaded.load_from_file().await.unwrap();
        assert_eq!(reloaded.get_config().app_settings.stations, 5);
    }

    /// 损坏的配置文件回退到默认值而不是报错
    #[tokio::test]
    async fn test_corrupt_config_falls_back_to_defaults() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("station_config.json");
        std::fs::write(&config_path, "{ not json").unwrap();

        let manager = ConfigManager::load_or_default(config_path).await;
        assert_eq!(manager.get_config().app_settings.spots, 6);
        // 日志初始化后由调用方输出
        assert_eq!(manager.warnings().len(), 1);
        assert!(manager.warnings()[0].contains("station_config.json"));
    }

    /// timer_settings 只写部分字段时其余字段取默认值，不影响其他配置段
    #[tokio::test]
    async fn test_partial_timer_settings_keeps_rest_of_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("station_config.json");
        std::fs::write(
            &config_path,
            r#"{
                "app_settings": { "title": "Bay 3", "stations": 4, "spots": 3, "columns": 3 },
                "timer_settings": { "tick_interval_ms": 500 }
            }"#,
        )
        .unwrap();

        let manager = ConfigManager::load_or_default(config_path).await;
        let config = manager.get_config();
        assert!(manager.warnings().is_empty());
        assert_eq!(config.app_settings.stations, 4);
        assert_eq!(config.timer_settings.tick_interval_ms, 500);
        assert_eq!(config.timer_settings.usb_poll_interval_ms, 2000);
        assert_eq!(
            config.timer_settings.auto_status_on_start,
            Some(StatusTransition {
                from: "Unblocked".to_string(),
                to: "In Progress".to_string(),
            })
        );
    }

    /// 显式 null 关闭自动状态切换
    #[test]
    fn test_auto_status_can_be_disabled() {
        let json = r#"{ "timer_settings": { "auto_status_on_start": null } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.timer_settings.auto_status_on_start, None);
        assert_eq!(config.timer_settings.tick_interval_ms, 1000);
    }

    /// 自动切换引用未配置的状态时不生效，并给出警告
    #[tokio::test]
    async fn test_auto_status_with_unknown_status_is_dropped() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("station_config.json");
        std::fs::write(
            &config_path,
            r#"{ "spot_statuses": [ { "name": "Unblocked" }, { "name": "Packing" }, { "name": "Done" } ] }"#,
        )
        .unwrap();

        let manager = ConfigManager::load_or_default(config_path).await;
        let config = manager.get_config();
        assert_eq!(config.status_names(), vec!["Unblocked", "Packing", "Done"]);
        assert_eq!(config.effective_auto_status(), None);
        assert_eq!(manager.warnings().len(), 1);
        assert!(manager.warnings()[0].contains("In Progress"));

        assert_eq!(
            AppConfig::default().effective_auto_status().map(|t| t.to),
            Some("In Progress".to_string())
        );
    }

    /// 测试配置验证
    #[test]
    fn test_config_validation() {
        let temp_dir = tempdir().unwrap();
        let mut manager = ConfigManager::new(temp_dir.path().join("c.json"));
        assert!(manager.validate_config().is_ok());

        manager.get_config_mut().app_settings.stations = 0;
        assert!(manager.validate_config().is_err());
        manager.reset_to_default();

        manager.get_config_mut().spot_statuses.clear();
        assert!(manager.validate_config().is_err());
        manager.reset_to_default();

        manager.get_config_mut().spot_statuses.push(SpotStatusConfig {
            name: "Unblocked".to_string(),
            color: String::new(),
        });
        let err = manager.validate_config().unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
        manager.reset_to_default();

        manager.get_config_mut().logging_config.log_level = "verbose".to_string();
        assert!(manager.validate_config().is_err());
        manager.reset_to_default();

        manager.get_config_mut().timer_settings.tick_interval_ms = 0;
        assert!(manager.validate_config().is_err());
        manager.reset_to_default();

        manager.get_config_mut().timer_settings.usb_poll_interval_ms = 0;
        let err = manager.validate_config().unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
    }
}
