/// spot 计时数据模型
pub mod spot;
/// 工单、U盘、DT生成数据结构
pub mod work_order;
/// 界面视图结构
pub mod views;

// 重新导出所有类型，方便其他模块使用
pub use spot::*;
pub use work_order::*;
pub use views::*;
