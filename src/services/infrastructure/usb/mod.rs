/// U盘相关基础设施

pub mod drive_enumerator;
pub mod usb_watcher;
pub mod orderfil;

pub use drive_enumerator::{IDriveEnumerator, SystemDriveEnumerator};
pub use usb_watcher::{DrivesChangedCallback, UsbWatcher};
