/// DT数据表生成
///
/// 读取DT模板的第一个工作表，复制到新工作簿，并把 F22..F30 替换为9个主计数值。

use calamine::{open_workbook_auto, DataType, Reader};
use rust_xlsxwriter::{Workbook, Worksheet};
use std::path::{Path, PathBuf};

use super::sysmast::MASTER_COUNT_LEN;
use crate::models::DtOutcome;
use crate::utils::error::{AppError, AppResult};

/// 主计数值写入的首行（F22，0起始为21）
pub const MASTER_COUNT_FIRST_ROW: u32 = 21;
/// 主计数值写入的列（F，0起始为5）
pub const MASTER_COUNT_COLUMN: u16 = 5;

/// DT表格生成接口
#[cfg_attr(test, mockall::automock)]
pub trait IDtGenerator: Send + Sync {
    /// 以 `source` 为模板生成数据表，保存到 `target_dir`
    fn generate(&self, source: &Path, values: &[i64; MASTER_COUNT_LEN], target_dir: &Path) -> DtOutcome;
}

/// 基于 calamine + rust_xlsxwriter 的生成器
#[derive(Debug, Default, Clone)]
pub struct XlsxDtGenerator;

impl XlsxDtGenerator {
    pub fn new() -> Self {
        Self
    }

    /// 输出文件名：模板文件名，扩展名统一为 `.xlsx`
    pub fn output_path(source: &Path, target_dir: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "DT".to_string());
        target_dir.join(format!("{}.xlsx", stem))
    }

    fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, cell: &DataType) -> AppResult<()> {
        match cell {
            DataType::Int(v) => {
                sheet.write_number(row, col, *v as f64)?;
            }
            DataType::Float(v) | DataType::DateTime(v) | DataType::Duration(v) => {
                sheet.write_number(row, col, *v)?;
            }
            DataType::String(v) | DataType::DateTimeIso(v) | DataType::DurationIso(v) => {
                sheet.write_string(row, col, v)?;
            }
            DataType::Bool(v) => {
                sheet.write_boolean(row, col, *v)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn try_generate(source: &Path, values: &[i64; MASTER_COUNT_LEN], target_dir: &Path) -> AppResult<PathBuf> {
        if !source.is_file() {
            return Err(AppError::not_found_error("dt_file", format!("DT file not found: {}", source.display())));
        }

        let mut template = open_workbook_auto(source)
            .map_err(|e| AppError::excel_error(format!("无法打开DT模板 {:?}: {}", source, e)))?;
        let sheet_name = template
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| AppError::excel_error(format!("DT模板 {:?} 中没有工作表", source)))?;
        let range = template
            .worksheet_range_at(0)
            .ok_or_else(|| AppError::excel_error(format!("DT模板 {:?} 中没有工作表", source)))??;

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet().set_name(&sheet_name)?;

        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        for (row, col, cell) in range.cells() {
            let abs_row = start_row + row as u32;
            let abs_col = start_col + col as u32;
            let Ok(abs_col) = u16::try_from(abs_col) else {
                continue;
            };
            Self::write_cell(sheet, abs_row, abs_col, cell)?;
        }

        for (offset, value) in values.iter().enumerate() {
            sheet.write_number(MASTER_COUNT_FIRST_ROW + offset as u32, MASTER_COUNT_COLUMN, *value as f64)?;
        }

        std::fs::create_dir_all(target_dir).map_err(|e| {
            AppError::io_error(format!("创建目录 {:?} 失败: {}", target_dir, e), e.kind().to_string())
        })?;
        let output = Self::output_path(source, target_dir);
        workbook
            .save(&output)
            .map_err(|e| AppError::excel_error(format!("保存Excel文件失败: {}", e)))?;
        Ok(output)
    }
}

impl IDtGenerator for XlsxDtGenerator {
    fn generate(&self, source: &Path, values: &[i64; MASTER_COUNT_LEN], target_dir: &Path) -> DtOutcome {
        match Self::try_generate(source, values, target_dir) {
            Ok(output) => {
                log::info!("DT文件已生成: {:?}", output);
                DtOutcome::ok(format!("DT file updated and saved to {}", output.display()))
            }
            Err(e) => {
                crate::log_lookup_failure!("DT生成失败: {}", e);
                DtOutcome::failed(format!("Error editing/saving DT file: {}", e))
            }
        }
    }
}
