/// DT数据表生成流程
///
/// U盘上的AOA文件夹 `<wo>_<e>` → `sysmast.sv` → 转换为文本 → 读取主计数值 →
/// 定位DT模板 → 生成数据表。任何一步失败都转为失败结果返回给界面，从不影响计时。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::models::DtOutcome;
use crate::services::infrastructure::excel::{parse_master_counts, IDtGenerator, ISvConverter};
use crate::services::infrastructure::usb::orderfil::aoa_folder_path;
use crate::services::infrastructure::work_order::BomLocator;
use crate::utils::error::{AppError, AppResult};

/// 控制器备份中的系统变量文件
pub const SYSMAST_FILE: &str = "sysmast.sv";

pub struct DtWorkflowService {
    converter: Arc<dyn ISvConverter>,
    generator: Arc<dyn IDtGenerator>,
    bom_locator: BomLocator,
    target_dir: PathBuf,
}

impl DtWorkflowService {
    pub fn new(
        converter: Arc<dyn ISvConverter>,
        generator: Arc<dyn IDtGenerator>,
        bom_locator: BomLocator,
        target_dir: PathBuf,
    ) -> Self {
        Self {
            converter,
            generator,
            bom_locator,
            target_dir,
        }
    }

    /// 读取U盘备份中的9个主计数值
    async fn read_master_counts(&self, wo_number: &str, e_number: &str, usb_path: &Path) -> AppResult<[i64; 9]> {
        let folder = aoa_folder_path(usb_path, wo_number, e_number)?;
        if !folder.is_dir() {
            return Err(AppError::not_found_error("folder", format!("Folder not found: {}", folder.display())));
        }

        let sv_path = folder.join(SYSMAST_FILE);
        if !sv_path.is_file() {
            return Err(AppError::not_found_error(
                "sysmast",
                format!("{} not found in {}", SYSMAST_FILE, folder.display()),
            ));
        }

        let txt_path = sv_path.with_extension("txt");
        self.converter.convert(&sv_path, &txt_path).await?;

        let bytes = tokio::fs::read(&txt_path).await.map_err(|e| {
            AppError::io_error(format!("Error reading txt {:?}: {}", txt_path, e), e.kind().to_string())
        })?;
        parse_master_counts(&String::from_utf8_lossy(&bytes))
    }

    /// 生成DT数据表
    pub async fn generate_dt(&self, wo_number: &str, e_number: &str, usb_path: &Path) -> DtOutcome {
        crate::log_user_operation!("生成DT: 工单 {} / {} / U盘 {:?}", wo_number, e_number, usb_path);

        let values = match self.read_master_counts(wo_number, e_number, usb_path).await {
            Ok(values) => values,
            Err(e) => {
                crate::log_lookup_failure!("{}", e);
                return DtOutcome::failed(e.to_string());
            }
        };
        log::info!("主计数值: {:?}", values);

        let dt_path = match self.bom_locator.find_dt_file(e_number).await {
            Ok(path) => path,
            Err(e) => {
                crate::log_lookup_failure!("{}", e);
                return DtOutcome::failed(format!("DT file not found for {}: {}", e_number, e));
            }
        };

        let generator = Arc::clone(&self.generator);
        let target_dir = self.target_dir.clone();
        tokio::task::spawn_blocking(move || generator.generate(&dt_path, &values, &target_dir))
            .await
            .unwrap_or_else(|e| DtOutcome::failed(format!("DT生成任务异常结束: {}", e)))
    }
}
