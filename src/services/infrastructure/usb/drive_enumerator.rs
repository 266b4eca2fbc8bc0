/// 可移动磁盘枚举

use std::path::PathBuf;
#[cfg(not(windows))]
use std::path::Path;

use crate::models::RemovableDrive;
use crate::utils::config::CustomizationSettings;

/// 可移动磁盘枚举接口
#[cfg_attr(test, mockall::automock)]
pub trait IDriveEnumerator: Send + Sync {
    /// 当前插入的可移动磁盘，按路径排序
    fn removable_drives(&self) -> Vec<RemovableDrive>;
}

/// 系统磁盘枚举
///
/// Windows 下检查 `D:` 到 `Z:` 中未被排除且类型为可移动磁盘的盘符；
/// 其他平台列出挂载根目录下的子目录。
#[derive(Debug, Clone)]
pub struct SystemDriveEnumerator {
    excluded_letters: Vec<char>,
    mount_roots: Vec<PathBuf>,
}

impl SystemDriveEnumerator {
    pub fn new(excluded_letters: Vec<char>, mount_roots: Vec<PathBuf>) -> Self {
        Self {
            excluded_letters: excluded_letters.iter().map(|c| c.to_ascii_uppercase()).collect(),
            mount_roots,
        }
    }

    pub fn from_settings(settings: &CustomizationSettings) -> Self {
        Self::new(settings.excluded_drive_letters.clone(), settings.mount_roots.clone())
    }

    /// 按盘符类型筛选可移动磁盘，`drive_type` 对根路径返回 GetDriveTypeW 的结果
    #[cfg(any(windows, test))]
    fn lettered_drives(&self, drive_type: impl Fn(&str) -> u32) -> Vec<RemovableDrive> {
        ('D'..='Z')
            .filter(|letter| !self.excluded_letters.contains(letter))
            .map(|letter| (letter, format!("{}:\\", letter)))
            .filter(|(_, root)| drive_type(root) == DRIVE_REMOVABLE)
            .map(|(letter, root)| RemovableDrive {
                drive_path: PathBuf::from(root),
                display_label: format!("{}:", letter),
            })
            .collect()
    }

    #[cfg(windows)]
    fn windows_drives(&self) -> Vec<RemovableDrive> {
        self.lettered_drives(windows_drive_type)
    }

    #[cfg(not(windows))]
    fn mounted_drives(&self) -> Vec<RemovableDrive> {
        let mut drives: Vec<RemovableDrive> = self
            .mount_roots
            .iter()
            .flat_map(|root| list_mount_points(root))
            .collect();
        drives.sort();
        drives.dedup();
        drives
    }
}

/// GetDriveTypeW 的可移动磁盘类型值
#[cfg(any(windows, test))]
const DRIVE_REMOVABLE: u32 = 2;

#[cfg(windows)]
fn windows_drive_type(root: &str) -> u32 {
    use windows_sys::Win32::Storage::FileSystem::GetDriveTypeW;

    let wide: Vec<u16> = root.encode_utf16().chain(std::iter::once(0)).collect();
    // wide 以0结尾且在调用期间有效
    unsafe { GetDriveTypeW(wide.as_ptr()) }
}

#[cfg(not(windows))]
fn list_mount_points(root: &Path) -> Vec<RemovableDrive> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };
    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| RemovableDrive {
            display_label: entry.file_name().to_string_lossy().into_owned(),
            drive_path: entry.path(),
        })
        .collect()
}

impl IDriveEnumerator for SystemDriveEnumerator {
    fn removable_drives(&self) -> Vec<RemovableDrive> {
        #[cfg(windows)]
        {
            self.windows_drives()
        }
        #[cfg(not(windows))]
        {
            self.mounted_drives()
        }
    }
}
