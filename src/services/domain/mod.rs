/// 领域服务层模块
/// 包含计时核心逻辑

/// spot计时状态机 - 纯函数，不读时钟也不写盘
pub mod spot_timer;

/// 工位注册表 - 唯一负责修改spot计时状态的地方
pub mod station_registry;

// 重新导出常用类型
pub use station_registry::{IStationRegistry, RegistryConfig, StationRegistry};
