/// U盘上的订单文件工具
///
/// 控制器软件版本由U盘根目录的 `version.txt` 判断：
/// V8/V9 的 `orderfil.dat` 在根目录，V10 的在 `config/p1` 下。

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::UsbSoftwareVersion;
use crate::utils::error::{AppError, AppResult};

pub const VERSION_FILE: &str = "version.txt";
pub const ORDERFIL_NAME: &str = "orderfil.dat";

/// 配置E号，例如 `E123456`
pub static E_NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"E\d{6}").unwrap_or_else(|e| panic!("E号正则无效: {}", e)));

/// 需要备份的AOA文件夹名 `<8位工单号>_E<6位数字>`
static AOA_FOLDER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{8}_E\d{6}$").unwrap_or_else(|e| panic!("AOA目录正则无效: {}", e)));

/// 由 version.txt 内容判断软件版本
pub fn classify_version(content: &str) -> UsbSoftwareVersion {
    let content = content.trim();
    if content.contains("V8") || content.contains("V9") {
        UsbSoftwareVersion::V8V9
    } else if content.contains("V10") {
        UsbSoftwareVersion::V10
    } else {
        UsbSoftwareVersion::Unknown(content.to_string())
    }
}

/// 读取U盘软件版本
pub async fn detect_software_version(drive: &Path) -> AppResult<UsbSoftwareVersion> {
    let version_file = drive.join(VERSION_FILE);
    if !version_file.is_file() {
        return Ok(UsbSoftwareVersion::NotFound);
    }
    let content = tokio::fs::read_to_string(&version_file).await.map_err(|e| {
        AppError::io_error(format!("读取文件 {:?} 失败: {}", version_file, e), e.kind().to_string())
    })?;
    Ok(classify_version(&content))
}

/// 订单文件在U盘上的目标路径；V10 会先创建 `config/p1`
pub async fn orderfil_destination(drive: &Path) -> AppResult<PathBuf> {
    match detect_software_version(drive).await? {
        UsbSoftwareVersion::V8V9 => Ok(drive.join(ORDERFIL_NAME)),
        UsbSoftwareVersion::V10 => {
            let dir = drive.join("config").join("p1");
            tokio::fs::create_dir_all(&dir).await.map_err(|e| {
                AppError::io_error(format!("创建目录 {:?} 失败: {}", dir, e), e.kind().to_string())
            })?;
            Ok(dir.join(ORDERFIL_NAME))
        }
        UsbSoftwareVersion::Unknown(content) => Err(AppError::validation_error(format!(
            "SW version on disk {}: Unknown ({})",
            drive.display(),
            content
        ))),
        UsbSoftwareVersion::NotFound => Err(AppError::not_found_error(
            "version.txt",
            format!("SW version on disk {}: Not Found", drive.display()),
        )),
    }
}

/// 读取U盘订单文件中的E号（两种版本的位置依次尝试）
pub async fn read_orderfil_e_number(drive: &Path) -> Option<String> {
    let candidates = [
        drive.join(ORDERFIL_NAME),
        drive.join("config").join("p1").join(ORDERFIL_NAME),
    ];
    for path in candidates.iter().filter(|p| p.is_file()) {
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                let content = String::from_utf8_lossy(&bytes);
                if let Some(found) = E_NUMBER_PATTERN.find(&content) {
                    return Some(found.as_str().to_string());
                }
            }
            Err(e) => {
                crate::log_lookup_failure!("读取 {:?} 失败: {}", path, e);
            }
        }
    }
    None
}

/// 复制订单文件，非UTF-8字节替换为U+FFFD
pub async fn copy_order_file(source: &Path, destination: &Path) -> AppResult<()> {
    let bytes = tokio::fs::read(source).await.map_err(|e| {
        AppError::io_error(format!("读取文件 {:?} 失败: {}", source, e), e.kind().to_string())
    })?;
    let content = String::from_utf8_lossy(&bytes);
    tokio::fs::write(destination, content.as_bytes()).await.map_err(|e| {
        AppError::io_error(format!("写入文件 {:?} 失败: {}", destination, e), e.kind().to_string())
    })?;
    log::info!("订单文件 {:?} 已复制到 {:?}", source, destination);
    Ok(())
}

/// AOA文件夹路径 `<drive>/<wo>_<e>`，名称必须是 8位工单号_E+6位数字
pub fn aoa_folder_path(drive: &Path, wo_number: &str, e_number: &str) -> AppResult<PathBuf> {
    if wo_number.is_empty() || e_number.is_empty() {
        return Err(AppError::validation_error("WO number or E-number missing"));
    }
    let name = format!("{}_{}", wo_number, e_number);
    if !AOA_FOLDER_PATTERN.is_match(&name) {
        return Err(AppError::validation_error(format!(
            "Invalid WO number or E-number: {} / {}",
            wo_number, e_number
        )));
    }
    Ok(drive.join(name))
}

/// 在U盘上创建AOA文件夹（已存在时直接返回）
pub async fn create_aoa_folder(drive: &Path, wo_number: &str, e_number: &str) -> AppResult<PathBuf> {
    let folder = aoa_folder_path(drive, wo_number, e_number)?;
    tokio::fs::create_dir_all(&folder).await.map_err(|e| {
        AppError::io_error(format!("Failed to create AOA folder {:?}: {}", folder, e), e.kind().to_string())
    })?;
    log::info!("AOA文件夹已创建: {:?}", folder);
    Ok(folder)
}

/// 把所有U盘根目录下的AOA文件夹移动到备份目录，返回移动的文件夹名
pub async fn backup_usb_folders(drives: &[PathBuf], backup_dir: &Path) -> AppResult<Vec<String>> {
    let drives = drives.to_vec();
    let backup_dir = backup_dir.to_path_buf();
    tokio::task::spawn_blocking(move || backup_usb_folders_blocking(&drives, &backup_dir))
        .await
        .map_err(|e| AppError::concurrency_error(format!("U盘备份任务异常结束: {}", e)))?
}

fn backup_usb_folders_blocking(drives: &[PathBuf], backup_dir: &Path) -> AppResult<Vec<String>> {
    if drives.is_empty() {
        return Err(AppError::not_found_error("usb", "USB not detected"));
    }
    fs::create_dir_all(backup_dir).map_err(|e| {
        AppError::io_error(format!("创建备份目录 {:?} 失败: {}", backup_dir, e), e.kind().to_string())
    })?;

    let mut moved = Vec::new();
    for drive in drives {
        log::info!("扫描 {:?}", drive);
        let entries = fs::read_dir(drive).map_err(|e| {
            AppError::io_error(format!("读取目录 {:?} 失败: {}", drive, e), e.kind().to_string())
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| {
                AppError::io_error(format!("读取目录项 {:?} 失败: {}", drive, e), e.kind().to_string())
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let source = entry.path();
            if !source.is_dir() || !AOA_FOLDER_PATTERN.is_match(&name) {
                continue;
            }
            let target = backup_dir.join(&name);
            move_directory(&source, &target)?;
            log::info!("已移动 {} 到 {:?}", name, target);
            moved.push(name);
        }
    }
    Ok(moved)
}

/// 移动目录；跨盘时改名失败则复制后删除源目录
fn move_directory(source: &Path, target: &Path) -> AppResult<()> {
    if fs::rename(source, target).is_ok() {
        return Ok(());
    }
    copy_directory_contents(source, target)?;
    fs::remove_dir_all(source).map_err(|e| {
        AppError::io_error(format!("删除目录 {:?} 失败: {}", source, e), e.kind().to_string())
    })
}

fn copy_directory_contents(source: &Path, target: &Path) -> AppResult<()> {
    if !target.exists() {
        fs::create_dir_all(target).map_err(|e| {
            AppError::io_error(format!("创建目标目录 {:?} 失败: {}", target, e), e.kind().to_string())
        })?;
    }

    for entry_result in fs::read_dir(source).map_err(|e| {
        AppError::io_error(format!("读取源目录 {:?} 失败: {}", source, e), e.kind().to_string())
    })? {
        let entry = entry_result.map_err(|e| {
            AppError::io_error(format!("读取源目录项 {:?} 失败: {}", source, e), e.kind().to_string())
        })?;
        let source_path = entry.path();
        let target_path = target.join(entry.file_name());

        if source_path.is_dir() {
            copy_directory_contents(&source_path, &target_path)?;
        } else if source_path.is_file() {
            fs::copy(&source_path, &target_path).map_err(|e| {
                AppError::io_error(
                    format!("复制文件 {:?} 到 {:?} 失败: {}", source_path, target_path, e),
                    e.kind().to_string(),
                )
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_classify_version() {
        assert_eq!(classify_version("R-30iB V8.30"), UsbSoftwareVersion::V8V9);
        assert_eq!(classify_version("V9.10P/40\n"), UsbSoftwareVersion::V8V9);
        assert_eq!(classify_version("V10.10"), UsbSoftwareVersion::V10);
        assert_eq!(classify_version(" 7DC3 "), UsbSoftwareVersion::Unknown("7DC3".to_string()));
    }

    #[tokio::test]
    async fn test_orderfil_destination_by_version() {
        let drive = TempDir::new().unwrap();
        assert_eq!(
            orderfil_destination(drive.path()).await.unwrap_err().error_code(),
            "NOT_FOUND_ERROR"
        );

        std::fs::write(drive.path().join(VERSION_FILE), "V9.40").unwrap();
        assert_eq!(
            orderfil_destination(drive.path()).await.unwrap(),
            drive.path().join("orderfil.dat")
        );

        std::fs::write(drive.path().join(VERSION_FILE), "V10.10").unwrap();
        let dest = orderfil_destination(drive.path()).await.unwrap();
        assert_eq!(dest, drive.path().join("config").join("p1").join("orderfil.dat"));
        assert!(drive.path().join("config").join("p1").is_dir());

        std::fs::write(drive.path().join(VERSION_FILE), "unknown").unwrap();
        assert_eq!(
            orderfil_destination(drive.path()).await.unwrap_err().error_code(),
            "VALIDATION_ERROR"
        );
    }

    #[tokio::test]
    async fn test_copy_and_read_e_number() {
        let drive = TempDir::new().unwrap();
        let source = drive.path().join("source.dat");
        let mut bytes = b"!ORDER 12345678\n!E654321 robot\n".to_vec();
        bytes.push(0xFF);
        std::fs::write(&source, &bytes).unwrap();

        assert_eq!(read_orderfil_e_number(drive.path()).await, None);

        let p1 = drive.path().join("config").join("p1");
        std::fs::create_dir_all(&p1).unwrap();
        copy_order_file(&source, &p1.join(ORDERFIL_NAME)).await.unwrap();

        let copied = std::fs::read_to_string(p1.join(ORDERFIL_NAME)).unwrap();
        assert!(copied.ends_with('\u{FFFD}'));
        assert_eq!(read_orderfil_e_number(drive.path()).await, Some("E654321".to_string()));
    }

    #[tokio::test]
    async fn test_create_aoa_folder() {
        let drive = TempDir::new().unwrap();
        let folder = create_aoa_folder(drive.path(), "12345678", "E123456").await.unwrap();
        assert_eq!(folder, drive.path().join("12345678_E123456"));
        assert!(folder.is_dir());
        // 重复创建不报错
        create_aoa_folder(drive.path(), "12345678", "E123456").await.unwrap();
        assert!(create_aoa_folder(drive.path(), "", "E123456").await.is_err());
    }

    #[tokio::test]
    async fn test_create_aoa_folder_rejects_path_segments() {
        let root = TempDir::new().unwrap();
        let drive = root.path().join("usb");
        std::fs::create_dir(&drive).unwrap();

        for e_number in ["../x", "E123456/../../x", "E12345", "E1234567", "e123456", "E123456 "] {
            let err = create_aoa_folder(&drive, "12345678", e_number).await.unwrap_err();
            assert_eq!(err.error_code(), "VALIDATION_ERROR", "{}", e_number);
        }
        assert!(create_aoa_folder(&drive, "../../tmp", "E123456").await.is_err());

        // 什么都没有创建
        assert_eq!(std::fs::read_dir(&drive).unwrap().count(), 0);
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_backup_moves_only_matching_folders() {
        let drive = TempDir::new().unwrap();
        let backup = TempDir::new().unwrap();
        let aoa = drive.path().join("12345678_E123456");
        std::fs::create_dir_all(aoa.join("nested")).unwrap();
        std::fs::write(aoa.join("nested").join("sysmast.sv"), "sv").unwrap();
        std::fs::create_dir(drive.path().join("1234_E123456")).unwrap();
        std::fs::create_dir(drive.path().join("config")).unwrap();
        std::fs::write(drive.path().join("87654321_E654321"), "a file, not a folder").unwrap();

        let moved = backup_usb_folders(&[drive.path().to_path_buf()], &backup.path().join("backup"))
            .await
            .unwrap();
        assert_eq!(moved, vec!["12345678_E123456".to_string()]);
        assert!(!aoa.exists());
        assert!(backup.path().join("backup/12345678_E123456/nested/sysmast.sv").is_file());
        assert!(drive.path().join("1234_E123456").is_dir());

        let err = backup_usb_folders(&[], backup.path()).await.unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND_ERROR");
    }
}
