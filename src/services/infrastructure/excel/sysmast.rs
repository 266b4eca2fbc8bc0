/// sysmast.sv 主计数值提取
///
/// 控制器备份中的 `sysmast.sv` 是二进制文件，先用外部转换程序转成文本，
/// 再从 `$DMR_GRP[1].$MASTER_COUN` 字段读取9个轴的主计数值。

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// 主计数字段标记
pub const MASTER_COUNT_FIELD: &str = "Field: $DMR_GRP[1].$MASTER_COUN";

/// 主计数值个数
pub const MASTER_COUNT_LEN: usize = 9;

static ARRAY_ELEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\d+\]\s*=\s*(-?\d+)").unwrap_or_else(|e| panic!("数组元素正则无效: {}", e)));

/// 从转换后的文本中读取9个主计数值
///
/// 只看字段标记之后的9行，不匹配的行被忽略；结果不是恰好9个时报错
pub fn parse_master_counts(text: &str) -> AppResult<[i64; MASTER_COUNT_LEN]> {
    let mut lines = text.lines();
    if !lines.any(|line| line.contains(MASTER_COUNT_FIELD)) {
        return Err(AppError::validation_error(format!(
            "Could not find {} in converted text",
            MASTER_COUNT_FIELD
        )));
    }

    let values: Vec<i64> = lines
        .take(MASTER_COUNT_LEN)
        .filter_map(|line| ARRAY_ELEMENT.captures(line))
        .filter_map(|caps| caps.get(1).and_then(|m| m.as_str().parse::<i64>().ok()))
        .collect();

    values.try_into().map_err(|values: Vec<i64>| {
        AppError::validation_error(format!(
            "Could not extract 9 values from $DMR_GRP[1].$MASTER_COUN (found {})",
            values.len()
        ))
    })
}

/// `.sv` 转文本接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ISvConverter: Send + Sync {
    /// 把 `sv_path` 转换为 `txt_path`
    async fn convert(&self, sv_path: &Path, txt_path: &Path) -> AppResult<()>;
}

/// 调用外部 kconvars 程序：`<exe> <sv> <txt>`
#[derive(Debug, Clone)]
pub struct KconvarsConverter {
    executable: PathBuf,
}

impl KconvarsConverter {
    pub fn new(executable: PathBuf) -> Self {
        Self { executable }
    }
}

#[async_trait]
impl ISvConverter for KconvarsConverter {
    async fn convert(&self, sv_path: &Path, txt_path: &Path) -> AppResult<()> {
        log::debug!("运行 {:?} {:?} {:?}", self.executable, sv_path, txt_path);
        let output = tokio::process::Command::new(&self.executable)
            .arg(sv_path)
            .arg(txt_path)
            .output()
            .await
            .map_err(|e| AppError::external_tool_error("kconvars", format!("Error running kconvars: {}", e)))?;

        // 转换程序的退出码不可靠，以输出文件是否生成为准
        if !txt_path.is_file() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(AppError::external_tool_error(
                "kconvars",
                format!("Failed to convert {}: {}", sv_path.display(), detail.trim()),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
[*SYSTEM*]$DMR_GRP  Storage: SHADOW  Access: RW  : ARRAY[1] OF DMR_GRP_T
  Field: $DMR_GRP[1].$MASTER_DONE  Access: RW  : BOOLEAN = TRUE
  Field: $DMR_GRP[1].$MASTER_COUN  Access: RW  : ARRAY[9] OF INTEGER
    [1] = 123456
    [2] = -7890
    [3] = 0
    [4] = 42
    [5] = 1
    [6] = 2
    [7] = 3
    [8] = 4
    [9] = 5
  Field: $DMR_GRP[1].$REF_DONE  Access: RW  : BOOLEAN = FALSE
";

    #[test]
    fn test_parse_master_counts() {
        let values = parse_master_counts(SAMPLE).unwrap();
        assert_eq!(values, [123456, -7890, 0, 42, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_missing_field() {
        let err = parse_master_counts("nothing here").unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_short_array_is_rejected() {
        let truncated: String = SAMPLE.lines().take(8).collect::<Vec<_>>().join("\n");
        let err = parse_master_counts(&truncated).unwrap_err();
        assert!(err.to_string().contains("found 5"));
    }

    #[tokio::test]
    async fn test_missing_converter_executable() {
        let dir = tempfile::TempDir::new().unwrap();
        let converter = KconvarsConverter::new(dir.path().join("no_such_kconvars"));
        let err = converter
            .convert(&dir.path().join("sysmast.sv"), &dir.path().join("sysmast.txt"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "EXTERNAL_TOOL_ERROR");
    }
}
