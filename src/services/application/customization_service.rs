/// 定制工具服务
///
/// 界面上 "Check WO"、"Create SW"、"AOA Folder"、"Find DT"、"Move backups" 等按钮背后的操作。
/// 所有失败都以 `AppResult` 错误返回，由界面显示为短暂提示，不会触及计时状态。

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::models::{UsbSoftwareVersion, WorkOrderFiles, WorkOrderNumber};
use crate::services::infrastructure::usb::orderfil;
use crate::services::infrastructure::work_order::{BomLocator, IWorkOrderLookup};
use crate::services::traits::BaseService;
use crate::utils::error::{AppError, AppResult};

/// 定制工具接口
#[async_trait]
pub trait ICustomizationService: BaseService {
    /// 校验工单号并查找工单文件
    async fn check_work_order(&self, wo_number: &str) -> AppResult<WorkOrderFiles>;

    /// 把工单的 `.dat` 复制为U盘上的 `orderfil.dat`，返回目标路径
    async fn create_software(&self, wo_number: &str, drive: &Path) -> AppResult<PathBuf>;

    /// 在U盘上创建AOA文件夹
    async fn create_aoa_folder(&self, wo_number: &str, e_number: &str, drive: &Path) -> AppResult<PathBuf>;

    /// 查找DT表格
    async fn find_dt_file(&self, e_number: &str) -> AppResult<PathBuf>;

    /// 把U盘上的AOA文件夹移动到备份目录
    async fn backup_usb_folders(&self, drives: &[PathBuf]) -> AppResult<Vec<String>>;

    /// U盘软件版本
    async fn usb_software_version(&self, drive: &Path) -> AppResult<UsbSoftwareVersion>;

    /// U盘订单文件中的E号
    async fn usb_order_e_number(&self, drive: &Path) -> Option<String>;
}

pub struct CustomizationService {
    lookup: Arc<dyn IWorkOrderLookup>,
    bom_locator: BomLocator,
    backup_dir: PathBuf,
}

impl CustomizationService {
    pub fn new(lookup: Arc<dyn IWorkOrderLookup>, bom_locator: BomLocator, backup_dir: PathBuf) -> Self {
        Self {
            lookup,
            bom_locator,
            backup_dir,
        }
    }

    /// 默认备份目录：桌面下的 `backup`
    pub fn default_backup_dir() -> PathBuf {
        let home = std::env::var_os("USERPROFILE")
            .or_else(|| std::env::var_os("HOME"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        home.join("Desktop").join("backup")
    }
}

#[async_trait]
impl BaseService for CustomizationService {
    fn service_name(&self) -> &'static str {
        "CustomizationService"
    }

    async fn initialize(&mut self) -> AppResult<()> {
        log::info!("{} initialized. Backup dir: {:?}", self.service_name(), self.backup_dir);
        Ok(())
    }

    async fn shutdown(&mut self) -> AppResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl ICustomizationService for CustomizationService {
    async fn check_work_order(&self, wo_number: &str) -> AppResult<WorkOrderFiles> {
        let wo = WorkOrderNumber::parse(wo_number)?;
        crate::log_user_operation!("检查工单 {}", wo);
        self.lookup.find(&wo).await?.ok_or_else(|| {
            AppError::not_found_error("work_order", format!("No file found for WO Number {}", wo))
        })
    }

    async fn create_software(&self, wo_number: &str, drive: &Path) -> AppResult<PathBuf> {
        let files = self.check_work_order(wo_number).await?;
        let destination = orderfil::orderfil_destination(drive).await?;
        orderfil::copy_order_file(&files.dat_file, &destination).await?;
        crate::log_user_operation!("工单 {} 软件已创建: {:?}", wo_number, destination);
        Ok(destination)
    }

    async fn create_aoa_folder(&self, wo_number: &str, e_number: &str, drive: &Path) -> AppResult<PathBuf> {
        orderfil::create_aoa_folder(drive, wo_number, e_number).await
    }

    async fn find_dt_file(&self, e_number: &str) -> AppResult<PathBuf> {
        if e_number.is_empty() {
            return Err(AppError::validation_error(
                "No E-number found. Please enter a valid WO number first.",
            ));
        }
        self.bom_locator.find_dt_file(e_number).await
    }

    async fn backup_usb_folders(&self, drives: &[PathBuf]) -> AppResult<Vec<String>> {
        let moved = orderfil::backup_usb_folders(drives, &self.backup_dir).await?;
        crate::log_user_operation!("已移动 {} 个文件夹到 {:?}", moved.len(), self.backup_dir);
        Ok(moved)
    }

    async fn usb_software_version(&self, drive: &Path) -> AppResult<UsbSoftwareVersion> {
        orderfil::detect_software_version(drive).await
    }

    async fn usb_order_e_number(&self, drive: &Path) -> Option<String> {
        orderfil::read_orderfil_e_number(drive).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::infrastructure::work_order::lookup::MockIWorkOrderLookup;
    use tempfile::TempDir;

    fn service_with(lookup: MockIWorkOrderLookup, backup_dir: PathBuf) -> CustomizationService {
        CustomizationService::new(Arc::new(lookup), BomLocator::new(PathBuf::from("bom")), backup_dir)
    }

    #[tokio::test]
    async fn test_invalid_work_order_never_reaches_lookup() {
        let mut lookup = MockIWorkOrderLookup::new();
        lookup.expect_find().never();
        let service = service_with(lookup, PathBuf::from("backup"));

        let err = service.check_work_order("1234").await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_work_order() {
        let mut lookup = MockIWorkOrderLookup::new();
        lookup.expect_find().returning(|_| Ok(None));
        let service = service_with(lookup, PathBuf::from("backup"));

        let err = service.check_work_order("12345678").await.unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND_ERROR");
    }

    #[tokio::test]
    async fn test_create_software_for_v10_drive() {
        let share = TempDir::new().unwrap();
        let drive = TempDir::new().unwrap();
        let dat = share.path().join("12345678_E123456.dat");
        std::fs::write(&dat, "!STARTING CONFIGURATION : IND.ROBOT R-2000iC\n").unwrap();
        std::fs::write(drive.path().join("version.txt"), "V10.10P").unwrap();

        let mut lookup = MockIWorkOrderLookup::new();
        let found = WorkOrderFiles {
            dat_file: dat.clone(),
            pdf_file: None,
            e_number: Some("E123456".to_string()),
            model: "R-2000iC".to_string(),
        };
        lookup.expect_find().returning(move |_| Ok(Some(found.clone())));
        let service = service_with(lookup, PathBuf::from("backup"));

        let dest = service.create_software(" 12345678 ", drive.path()).await.unwrap();
        assert_eq!(dest, drive.path().join("config/p1/orderfil.dat"));
        assert_eq!(
            std::fs::read_to_string(&dest).unwrap(),
            std::fs::read_to_string(&dat).unwrap()
        );
        assert_eq!(service.usb_order_e_number(drive.path()).await, None);
    }

    #[tokio::test]
    async fn test_create_software_without_version_file() {
        let drive = TempDir::new().unwrap();
        let mut lookup = MockIWorkOrderLookup::new();
        lookup.expect_find().returning(|_| {
            Ok(Some(WorkOrderFiles {
                dat_file: PathBuf::from("x.dat"),
                pdf_file: None,
                e_number: None,
                model: String::new(),
            }))
        });
        let service = service_with(lookup, PathBuf::from("backup"));

        let err = service.create_software("12345678", drive.path()).await.unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND_ERROR");
        assert!(!drive.path().join("orderfil.dat").exists());
    }

    #[tokio::test]
    async fn test_backup_into_configured_dir() {
        let drive = TempDir::new().unwrap();
        let backup = TempDir::new().unwrap();
        std::fs::create_dir(drive.path().join("12345678_E123456")).unwrap();

        let service = service_with(MockIWorkOrderLookup::new(), backup.path().to_path_buf());
        let moved = service.backup_usb_folders(&[drive.path().to_path_buf()]).await.unwrap();
        assert_eq!(moved.len(), 1);
        assert!(backup.path().join("12345678_E123456").is_dir());
    }

    #[tokio::test]
    async fn test_find_dt_requires_e_number() {
        let service = service_with(MockIWorkOrderLookup::new(), PathBuf::from("backup"));
        assert_eq!(service.find_dt_file("").await.unwrap_err().error_code(), "VALIDATION_ERROR");
    }
}
