/// 界面命令模块
///
/// 包含界面可调用的全部命令。命令是输入校验的边界：spot键、工单号、状态名在这里被检查，
/// 错误以字符串返回给界面显示为提示。

pub mod spot_commands;
pub mod tool_commands;

// 重新导出命令
pub use spot_commands::{
    get_spot, get_station_summary, get_status_options, get_system_status, list_spots, list_stations,
    pause_spot, reset_spot, set_spot_place, set_spot_status, set_work_order, start_spot, stop_spot,
    toggle_spot,
};

pub use tool_commands::{
    backup_usb_folders, check_work_order, create_aoa_folder, create_software, find_dt_file,
    generate_dt, get_usb_drive_info, list_usb_drives, select_usb_drive,
};
