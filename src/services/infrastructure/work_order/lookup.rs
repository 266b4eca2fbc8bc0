/// 工单文件查找
///
/// 在网络共享目录中递归查找文件名包含工单号的 `.dat` 和 `.pdf` 文件，
/// 并从 `.dat` 内容中读取机器人型号。

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{WorkOrderFiles, WorkOrderNumber};
use crate::services::infrastructure::usb::orderfil::E_NUMBER_PATTERN;
use crate::utils::error::{AppError, AppResult};

/// `.dat` 中型号行的前缀
pub const ROBOT_MODEL_MARKER: &str = "!STARTING CONFIGURATION : IND.ROBOT";

/// 工单文件查找接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IWorkOrderLookup: Send + Sync {
    /// 查找工单文件；没有匹配的 `.dat` 时返回 `None`
    async fn find(&self, wo_number: &WorkOrderNumber) -> AppResult<Option<WorkOrderFiles>>;
}

/// 基于文件系统的工单查找
#[derive(Debug, Clone)]
pub struct FsWorkOrderLookup {
    search_directory: PathBuf,
}

impl FsWorkOrderLookup {
    pub fn new(search_directory: PathBuf) -> Self {
        Self { search_directory }
    }

    pub fn search_directory(&self) -> &Path {
        &self.search_directory
    }

    /// 递归收集文件，同一目录内按文件名排序
    fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> AppResult<()> {
        let mut entries: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(|e| AppError::io_error(format!("读取目录 {:?} 失败: {}", dir, e), e.kind().to_string()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        entries.sort();

        for path in entries {
            if path.is_dir() {
                if let Err(e) = Self::collect_files(&path, files) {
                    // 单个子目录无权限不影响其他目录
                    crate::log_lookup_failure!("{}", e);
                }
            } else if path.is_file() {
                files.push(path);
            }
        }
        Ok(())
    }

    fn name_matches(path: &Path, wo_number: &str, extension: &str) -> bool {
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        name.contains(wo_number) && name.to_ascii_lowercase().ends_with(extension)
    }

    /// 从 `.dat` 内容读取型号
    fn read_robot_model(path: &Path) -> Option<String> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                crate::log_lookup_failure!("读取文件 {:?} 失败: {}", path, e);
                return None;
            }
        };
        String::from_utf8_lossy(&bytes)
            .lines()
            .find_map(|line| line.strip_prefix(ROBOT_MODEL_MARKER).map(|rest| rest.trim().to_string()))
    }

    fn e_number_of(path: &Path) -> Option<String> {
        let name = path.file_name()?.to_string_lossy().into_owned();
        E_NUMBER_PATTERN.find(&name).map(|m| m.as_str().to_string())
    }

    fn find_blocking(search_directory: &Path, wo_number: &str) -> AppResult<Option<WorkOrderFiles>> {
        if !search_directory.is_dir() {
            return Err(AppError::not_found_error(
                "directory",
                format!("Directory {} not found", search_directory.display()),
            ));
        }

        let mut files = Vec::new();
        Self::collect_files(search_directory, &mut files)?;

        let dat_files: Vec<&PathBuf> = files
            .iter()
            .filter(|p| Self::name_matches(p, wo_number, ".dat"))
            .collect();
        let pdf_file = files
            .iter()
            .find(|p| Self::name_matches(p, wo_number, ".pdf"))
            .cloned();

        // 优先选择带型号行的 .dat
        let with_model = dat_files
            .iter()
            .find_map(|path| Self::read_robot_model(path).map(|model| ((*path).clone(), model)));
        let (dat_file, model) = match with_model {
            Some(found) => found,
            None => match dat_files.first() {
                Some(path) => ((*path).clone(), String::new()),
                None => return Ok(None),
            },
        };

        Ok(Some(WorkOrderFiles {
            e_number: Self::e_number_of(&dat_file),
            dat_file,
            pdf_file,
            model,
        }))
    }
}

#[async_trait]
impl IWorkOrderLookup for FsWorkOrderLookup {
    async fn find(&self, wo_number: &WorkOrderNumber) -> AppResult<Option<WorkOrderFiles>> {
        let search_directory = self.search_directory.clone();
        let wo = wo_number.as_str().to_string();
        let result = tokio::task::spawn_blocking(move || Self::find_blocking(&search_directory, &wo))
            .await
            .map_err(|e| AppError::concurrency_error(format!("工单查找任务异常结束: {}", e)))??;

        match &result {
            Some(files) => log::info!(
                "工单 {} -> {:?} (E号: {:?}, 型号: '{}')",
                wo_number,
                files.dat_file,
                files.e_number,
                files.model
            ),
            None => crate::log_lookup_failure!("No file found for WO Number {}", wo_number),
        }
        Ok(result)
    }
}
