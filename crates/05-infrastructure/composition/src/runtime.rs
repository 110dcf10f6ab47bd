//! 组件容器运行时

use crate::builder::ContainerBuilder;
use di_impl::DefaultComponentFactory;
use infrastructure_common::{ComponentInstance, InfrastructureError, TypeInfo};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// 组件容器运行时
///
/// 包装一个已完成注册的 [`DefaultComponentFactory`]，负责启动时预实例化单例、
/// 停止时按依赖顺序销毁单例，并记录运行状态。
pub struct ComponentContainer {
    /// 组件工厂
    factory: DefaultComponentFactory,
    /// 启动时是否预实例化单例
    eager_singletons: bool,
    /// 运行状态
    status: Arc<RwLock<ContainerStatus>>,
    /// 统计信息
    metrics: Arc<RwLock<ContainerMetrics>>,
}

impl ComponentContainer {
    /// 创建容器构建器
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    pub(crate) fn new(factory: DefaultComponentFactory, eager_singletons: bool) -> Self {
        let metrics = ContainerMetrics {
            definition_count: factory.definition_count(),
            ..ContainerMetrics::default()
        };
        Self {
            factory,
            eager_singletons,
            status: Arc::new(RwLock::new(ContainerStatus::Initialized)),
            metrics: Arc::new(RwLock::new(metrics)),
        }
    }

    /// 启动容器
    ///
    /// 预实例化失败时已创建的单例会被销毁，状态置为 [`ContainerStatus::Failed`]。
    pub async fn start(&self) -> Result<(), InfrastructureError> {
        {
            let mut status = self.status.write().await;
            if *status == ContainerStatus::Running {
                warn!("容器已在运行");
                return Ok(());
            }
            *status = ContainerStatus::Starting;
        }
        info!("启动组件容器");

        if self.eager_singletons {
            if let Err(e) = self.factory.pre_instantiate_singletons().await {
                error!("单例预实例化失败: {}", e);
                self.factory.destroy_singletons().await;
                *self.status.write().await = ContainerStatus::Failed;
                return Err(e.into());
            }
        }

        {
            let mut metrics = self.metrics.write().await;
            metrics.started_at = Some(Instant::now());
            metrics.stopped_at = None;
            metrics.definition_count = self.factory.definition_count();
            metrics.singleton_count = self.factory.singleton_names().len();
        }
        *self.status.write().await = ContainerStatus::Running;

        info!("组件容器启动完成");
        Ok(())
    }

    /// 停止容器并销毁全部单例
    pub async fn stop(&self) -> Result<(), InfrastructureError> {
        info!("停止组件容器");
        *self.status.write().await = ContainerStatus::Stopping;

        self.factory.destroy_singletons().await;

        {
            let mut metrics = self.metrics.write().await;
            metrics.stopped_at = Some(Instant::now());
            metrics.singleton_count = 0;
        }
        *self.status.write().await = ContainerStatus::Stopped;

        info!("组件容器停止完成");
        Ok(())
    }

    /// 按名称获取组件
    pub async fn get_named(&self, name: &str) -> Result<ComponentInstance, InfrastructureError> {
        self.ensure_usable().await?;
        Ok(self.factory.get_named(name).await?)
    }

    /// 按类型获取唯一组件
    pub async fn resolve<T>(&self) -> Result<Arc<T>, InfrastructureError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.ensure_usable().await?;
        Ok(self.factory.get_typed::<T>().await?)
    }

    /// 获取某类型的全部组件，按注册顺序
    pub async fn resolve_all<T>(&self) -> Result<Vec<Arc<T>>, InfrastructureError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.ensure_usable().await?;
        let instances = self.factory.get_all_of_type(&TypeInfo::of::<T>()).await?;
        Ok(instances
            .into_values()
            .filter_map(|instance| instance.cast::<T>())
            .collect())
    }

    /// 检查组件名称是否已注册
    pub fn is_component_registered(&self, name: &str) -> bool {
        self.factory.contains_component(name)
    }

    /// 获取运行状态
    pub async fn get_status(&self) -> ContainerStatus {
        *self.status.read().await
    }

    /// 获取统计信息
    pub async fn get_metrics(&self) -> ContainerMetrics {
        self.metrics.read().await.clone()
    }

    /// 获取组件工厂引用
    pub fn factory(&self) -> &DefaultComponentFactory {
        &self.factory
    }

    async fn ensure_usable(&self) -> Result<(), InfrastructureError> {
        match *self.status.read().await {
            ContainerStatus::Stopping | ContainerStatus::Stopped | ContainerStatus::Failed => {
                Err(InfrastructureError::BootstrapFailed {
                    message: "组件容器未处于可用状态".to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// 容器运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerStatus {
    /// 已初始化
    Initialized,
    /// 启动中
    Starting,
    /// 运行中
    Running,
    /// 停止中
    Stopping,
    /// 已停止
    Stopped,
    /// 失败
    Failed,
}

/// 容器统计信息
#[derive(Debug, Clone, Default)]
pub struct ContainerMetrics {
    /// 启动时间
    pub started_at: Option<Instant>,
    /// 停止时间
    pub stopped_at: Option<Instant>,
    /// 定义数量
    pub definition_count: usize,
    /// 启动完成时的单例数量
    pub singleton_count: usize,
}

impl ContainerMetrics {
    /// 计算运行时间
    pub fn uptime(&self) -> Option<Duration> {
        match (self.started_at, self.stopped_at) {
            (Some(start), Some(stop)) => Some(stop.duration_since(start)),
            (Some(start), None) => Some(start.elapsed()),
            _ => None,
        }
    }
}
