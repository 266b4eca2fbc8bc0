/// 服务层基础trait定义
/// 提供各层服务的接口规范，支持依赖注入和测试

use async_trait::async_trait;
use crate::utils::error::AppResult;

/// 基础服务trait，所有有生命周期的服务都应实现
#[async_trait]
pub trait BaseService: Send + Sync {
    /// 服务名称
    fn service_name(&self) -> &'static str;

    /// 初始化服务
    async fn initialize(&mut self) -> AppResult<()>;

    /// 关闭服务
    async fn shutdown(&mut self) -> AppResult<()>;

    /// 健康检查
    async fn health_check(&self) -> AppResult<()>;
}
