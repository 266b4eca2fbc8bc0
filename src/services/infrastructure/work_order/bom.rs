/// BOM / DT 表格定位
///
/// 表格按E号每1000个一组存放：`<base>/E123000-E123999/`，
/// 其中可能有一个 `DT` 子目录专门存放数据表。

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct BomLocator {
    base_dir: PathBuf,
}

impl BomLocator {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// 解析 `E123456` 的数字部分
    fn e_digits(e_number: &str) -> AppResult<u32> {
        let digits = e_number
            .strip_prefix('E')
            .filter(|d| d.len() == 6 && d.chars().all(|c| c.is_ascii_digit()))
            .ok_or_else(|| AppError::validation_error(format!("无效的E号: {}", e_number)))?;
        digits
            .parse::<u32>()
            .map_err(|_| AppError::validation_error(format!("无效的E号: {}", e_number)))
    }

    /// 返回 `(DT目录, 区间目录)`
    pub fn directories(&self, e_number: &str) -> AppResult<(PathBuf, PathBuf)> {
        let n = Self::e_digits(e_number)?;
        let range_start = (n / 1000) * 1000;
        let range_end = range_start + 999;
        let range_dir = self
            .base_dir
            .join(format!("E{:06}-E{:06}", range_start, range_end));
        Ok((range_dir.join("DT"), range_dir))
    }

    /// 文件名包含 `E123456` 或 `E-123456` 的Excel表格
    fn is_sheet_for(name: &str, e_number: &str) -> bool {
        let with_hyphen = format!("E-{}", &e_number[1..]);
        let lower = name.to_ascii_lowercase();
        (name.contains(e_number) || name.contains(&with_hyphen))
            && (lower.ends_with(".xls") || lower.ends_with(".xlsx"))
    }

    async fn find_in(dir: &Path, e_number: &str) -> AppResult<Option<PathBuf>> {
        let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
            AppError::io_error(format!("读取目录 {:?} 失败: {}", dir, e), e.kind().to_string())
        })?;
        let mut matches = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            AppError::io_error(format!("读取目录项 {:?} 失败: {}", dir, e), e.kind().to_string())
        })? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if Self::is_sheet_for(&name, e_number) {
                matches.push(entry.path());
            }
        }
        matches.sort();
        Ok(matches.into_iter().next())
    }

    /// 查找DT表格：DT子目录存在时只在其中查找，否则在区间目录中查找
    pub async fn find_dt_file(&self, e_number: &str) -> AppResult<PathBuf> {
        let (dt_dir, range_dir) = self.directories(e_number)?;

        let search_dir = if dt_dir.is_dir() {
            dt_dir
        } else if range_dir.is_dir() {
            range_dir
        } else {
            return Err(AppError::not_found_error(
                "directory",
                format!("Directory {} does not exist.", range_dir.display()),
            ));
        };

        Self::find_in(&search_dir, e_number).await?.ok_or_else(|| {
            AppError::not_found_error(
                "dt_file",
                format!("No BOM file found for E-number {} in {}.", e_number, search_dir.display()),
            )
        })
    }
}
