/// 应用层服务模块
///
/// 应用层负责协调领域服务和基础设施服务，实现完整的业务流程

/// 计时显示刷新
pub mod display_ticker;

/// DT数据表生成流程
pub mod dt_workflow_service;

/// 定制工具（工单检查、软件创建、U盘备份）
pub mod customization_service;

pub use display_ticker::{ChannelDisplaySink, DisplayTicker, IDisplaySink, TickerManager};
pub use dt_workflow_service::DtWorkflowService;
pub use customization_service::{CustomizationService, ICustomizationService};
