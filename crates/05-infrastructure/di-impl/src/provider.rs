//! 延迟解析的组件提供者

use crate::container::FactoryInner;
use crate::context::ResolutionContext;
use di_abstractions::{DependencyDescriptor, DependencyShape};
use futures::future::{BoxFuture, FutureExt};
use infrastructure_common::{
    ComponentError, ComponentInstance, ComponentProvider, ComponentResult, DependencyError,
    InjectionValue, ProviderSource, TypeInfo,
};
use std::sync::{Arc, Weak};
use tracing::trace;

/// 回到容器重新解析的提供者数据源
///
/// 只持有容器的弱引用，容器释放后访问会得到 `ContainerClosed`。
/// 在组件创建过程中访问时沿用当前任务的调用链，否则开启新链。
struct FactoryProviderSource {
    inner: Weak<FactoryInner>,
    descriptor: DependencyDescriptor,
}

impl FactoryProviderSource {
    fn factory(&self) -> ComponentResult<Arc<FactoryInner>> {
        self.inner.upgrade().ok_or_else(|| {
            ComponentError::from(DependencyError::ContainerClosed {
                name: self.descriptor.required_type.short_name().to_string(),
            })
        })
    }

    async fn resolve(&self, shape: DependencyShape, required: bool) -> ComponentResult<InjectionValue> {
        let factory = self.factory()?;
        let descriptor = self
            .descriptor
            .clone()
            .with_shape(shape)
            .with_required(required);
        let ctx = ResolutionContext::current();
        trace!(
            "提供者解析 {} ({:?})",
            descriptor.required_type.short_name(),
            shape
        );
        factory.resolve_dependency_in(&descriptor, &ctx).await
    }
}

impl ProviderSource for FactoryProviderSource {
    fn required_type(&self) -> TypeInfo {
        self.descriptor.required_type
    }

    fn get(&self) -> BoxFuture<'_, ComponentResult<ComponentInstance>> {
        async move {
            let value = self.resolve(DependencyShape::Single, true).await?;
            value.into_instance().ok_or_else(|| {
                ComponentError::from(DependencyError::NoMatchingComponent {
                    type_name: self.descriptor.required_type.name.to_string(),
                    requested_by: self.descriptor.requesting_component.clone(),
                    injection_point: self.descriptor.injection_point(),
                })
            })
        }
        .boxed()
    }

    fn get_if_available(&self) -> BoxFuture<'_, ComponentResult<Option<ComponentInstance>>> {
        async move {
            let value = self.resolve(DependencyShape::Single, false).await?;
            Ok(value.into_instance())
        }
        .boxed()
    }

    fn get_if_unique(&self) -> BoxFuture<'_, ComponentResult<Option<ComponentInstance>>> {
        async move {
            match self.resolve(DependencyShape::Single, false).await {
                Ok(value) => Ok(value.into_instance()),
                Err(err) if matches!(err.dependency_error(), Some(DependencyError::NotUnique { .. })) => {
                    trace!("提供者找到多个候选: {}", err);
                    Ok(None)
                }
                Err(err) => Err(err),
            }
        }
        .boxed()
    }

    fn stream(&self, ordered: bool) -> BoxFuture<'_, ComponentResult<Vec<ComponentInstance>>> {
        async move {
            let shape = if ordered {
                DependencyShape::List
            } else {
                DependencyShape::Map
            };
            let instances = match self.resolve(shape, false).await? {
                InjectionValue::List(items) => items,
                InjectionValue::Map(entries) => entries.into_values().collect(),
                _ => Vec::new(),
            };
            Ok(instances)
        }
        .boxed()
    }
}

impl FactoryInner {
    /// 为依赖描述符创建提供者
    pub(crate) fn provider_for(&self, descriptor: DependencyDescriptor) -> ComponentProvider {
        ComponentProvider::new(Arc::new(FactoryProviderSource {
            inner: self.this.clone(),
            descriptor,
        }))
    }
}
