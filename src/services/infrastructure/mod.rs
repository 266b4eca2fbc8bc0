/// 基础设施层服务模块
/// 负责与外部系统的交互，如状态文件、网络共享目录、U盘、外部转换程序等

/// 计时状态持久化
pub mod persistence;

/// 周期任务
pub mod scheduler;

/// U盘枚举、监视和订单文件工具
pub mod usb;

/// 工单文件查找
pub mod work_order;

/// sysmast解析和DT表格生成
pub mod excel;

/// 前端事件发布
pub mod event_publisher;

// 重新导出常用接口和实现
pub use persistence::*;
pub use scheduler::PeriodicTask;
pub use usb::*;
pub use work_order::*;
pub use excel::*;
pub use event_publisher::TauriEventPublisher;
