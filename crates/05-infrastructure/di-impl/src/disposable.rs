//! 销毁适配器
//!
//! 把销毁感知处理器、类型上的销毁回调和定义中声明的销毁方法合并为一个销毁动作。

use di_abstractions::{
    Arguments, ComponentDefinition, ComponentPostProcessor, LifecycleCallback, MethodDescriptor,
    TypeDescriptor,
};
use futures::future::FutureExt;
use infrastructure_common::{
    ComponentInstance, DefinitionError, DefinitionResult, DestructionCallback, LifecycleError,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// 单个组件的销毁动作
pub struct DisposableAdapter {
    name: String,
    instance: ComponentInstance,
    processors: Vec<Arc<dyn ComponentPostProcessor>>,
    destroy_callback: Option<LifecycleCallback>,
    destroy_methods: Vec<MethodDescriptor>,
}

impl DisposableAdapter {
    /// 构建销毁动作，组件没有任何销毁逻辑时返回 `None`
    ///
    /// 定义中声明了销毁方法、类型却没有对应方法时报错。
    pub fn build(
        name: &str,
        instance: ComponentInstance,
        definition: &ComponentDefinition,
        descriptor: Option<&TypeDescriptor>,
        processors: Vec<Arc<dyn ComponentPostProcessor>>,
    ) -> DefinitionResult<Option<Self>> {
        if instance.is_null() {
            return Ok(None);
        }

        let processors: Vec<_> = processors
            .into_iter()
            .filter(|p| p.requires_destruction(name, &instance))
            .collect();

        let mut destroy_methods = Vec::with_capacity(definition.destroy_method_names.len());
        for method_name in &definition.destroy_method_names {
            let method = descriptor
                .and_then(|d| d.method_named(method_name))
                .ok_or_else(|| {
                    DefinitionError::invalid(
                        name,
                        format!(
                            "类型 {} 没有销毁方法 {}",
                            instance.type_info().short_name(),
                            method_name
                        ),
                    )
                })?;
            destroy_methods.push(method.clone());
        }

        let destroy_callback = descriptor.and_then(|d| d.destroy_callback.clone());
        if processors.is_empty() && destroy_callback.is_none() && destroy_methods.is_empty() {
            return Ok(None);
        }

        Ok(Some(Self {
            name: name.to_string(),
            instance,
            processors,
            destroy_callback,
            destroy_methods,
        }))
    }

    fn report(&self, stage: &str, err: anyhow::Error) {
        let failure = LifecycleError::DestructionFailed {
            name: self.name.clone(),
            message: format!("{}: {:#}", stage, err),
        };
        warn!("{}", failure);
    }

    /// 执行销毁，失败只记录日志
    pub async fn destroy(self) {
        debug!("执行组件销毁: {}", self.name);
        for processor in &self.processors {
            if let Err(err) = processor.before_destruction(&self.name, &self.instance).await {
                self.report(&format!("处理器 {}", processor.name()), err);
            }
        }

        if let Some(callback) = &self.destroy_callback {
            if let Err(err) = callback(self.instance.clone()).await {
                self.report("销毁回调", err);
            }
        }

        for method in &self.destroy_methods {
            if let Err(err) = method
                .invoke(Some(self.instance.clone()), Arguments::new())
                .await
            {
                self.report(&format!("销毁方法 {}", method.name), err);
            }
        }
    }

    /// 转换为可登记的销毁回调
    pub fn into_callback(self) -> DestructionCallback {
        Box::new(move || self.destroy().boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Pool {
        events: Mutex<Vec<&'static str>>,
    }

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<Pool>()
            .on_destroy(|pool: Arc<Pool>| async move {
                pool.events.lock().push("callback");
                Ok(())
            })
            .method(MethodDescriptor::callback("close", |pool: Arc<Pool>| async move {
                pool.events.lock().push("close");
                Err::<(), _>(anyhow::anyhow!("连接已断开"))
            }))
    }

    #[tokio::test]
    async fn test_destroy_runs_every_step_despite_failures() {
        let pool = Arc::new(Pool::default());
        let definition = ComponentDefinition::of::<Pool>().with_destroy_method("close");
        let descriptor = descriptor();

        let adapter = DisposableAdapter::build(
            "pool",
            ComponentInstance::from_arc(Arc::clone(&pool)),
            &definition,
            Some(&descriptor),
            Vec::new(),
        )
        .unwrap()
        .expect("应当需要销毁");

        adapter.into_callback()().await;
        assert_eq!(*pool.events.lock(), vec!["callback", "close"]);
    }

    #[test]
    fn test_missing_destroy_method_is_rejected() {
        let definition = ComponentDefinition::of::<Pool>().with_destroy_method("shutdown");
        let result = DisposableAdapter::build(
            "pool",
            ComponentInstance::new(Pool::default()),
            &definition,
            Some(&descriptor()),
            Vec::new(),
        );
        assert!(result.is_err());

        let plain = DisposableAdapter::build(
            "plain",
            ComponentInstance::new(Pool::default()),
            &ComponentDefinition::of::<Pool>(),
            None,
            Vec::new(),
        )
        .unwrap();
        assert!(plain.is_none());
    }
}
