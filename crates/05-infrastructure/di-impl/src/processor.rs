//! 后置处理器管线
//!
//! 处理器按 `order()` 升序执行，相同排序值保持注册顺序。
//! 管线额外缓存全部处理器能力的并集，没有处理器声明某项能力时直接跳过该阶段。

use async_trait::async_trait;
use di_abstractions::{
    ComponentPostProcessor, DependencyDescriptor, DependencyShape, ProcessingContext,
    ProcessorCapabilities,
};
use infrastructure_common::{
    ComponentError, ComponentInstance, ComponentResult, PropertyValue, PropertyValues,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};

/// 后置处理器管线
pub struct ProcessorPipeline {
    processors: RwLock<Vec<Arc<dyn ComponentPostProcessor>>>,
    capabilities: RwLock<ProcessorCapabilities>,
}

impl Default for ProcessorPipeline {
    fn default() -> Self {
        Self {
            processors: RwLock::new(Vec::new()),
            capabilities: RwLock::new(ProcessorCapabilities::empty()),
        }
    }
}

fn processor_error(name: &str, processor: &dyn ComponentPostProcessor, err: anyhow::Error) -> ComponentError {
    ComponentError::creation(
        name,
        format!("processor:{}", processor.name()),
        "后置处理器执行失败",
        err,
    )
}

impl ProcessorPipeline {
    /// 创建空管线
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加处理器，同名处理器会被替换
    pub fn add(&self, processor: Arc<dyn ComponentPostProcessor>) {
        let mut processors = self.processors.write();
        let before = processors.len();
        processors.retain(|p| p.name() != processor.name());
        if processors.len() != before {
            info!("替换后置处理器: {}", processor.name());
        } else {
            debug!(
                "添加后置处理器: {} (order={}, capabilities={:?})",
                processor.name(),
                processor.order(),
                processor.capabilities()
            );
        }
        processors.push(processor);
        processors.sort_by_key(|p| p.order());

        *self.capabilities.write() = processors
            .iter()
            .fold(ProcessorCapabilities::empty(), |acc, p| acc | p.capabilities());
    }

    /// 按名称移除处理器
    pub fn remove(&self, name: &str) -> bool {
        let mut processors = self.processors.write();
        let before = processors.len();
        processors.retain(|p| p.name() != name);
        *self.capabilities.write() = processors
            .iter()
            .fold(ProcessorCapabilities::empty(), |acc, p| acc | p.capabilities());
        processors.len() != before
    }

    /// 处理器名称，按执行顺序
    pub fn names(&self) -> Vec<String> {
        self.processors.read().iter().map(|p| p.name().to_string()).collect()
    }

    /// 处理器数量
    pub fn len(&self) -> usize {
        self.processors.read().len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.processors.read().is_empty()
    }

    /// 是否有处理器声明了该能力
    pub fn has(&self, capability: ProcessorCapabilities) -> bool {
        self.capabilities.read().intersects(capability)
    }

    /// 声明了该能力的处理器快照
    pub fn with(&self, capability: ProcessorCapabilities) -> Vec<Arc<dyn ComponentPostProcessor>> {
        if !self.has(capability) {
            return Vec::new();
        }
        self.processors
            .read()
            .iter()
            .filter(|p| p.capabilities().contains(capability))
            .cloned()
            .collect()
    }

    /// 实例化前阶段，第一个返回实例的处理器终止后续处理
    pub async fn before_instantiation(
        &self,
        ctx: &ProcessingContext<'_>,
    ) -> ComponentResult<Option<ComponentInstance>> {
        for processor in self.with(ProcessorCapabilities::BEFORE_INSTANTIATION) {
            let result = processor
                .before_instantiation(ctx)
                .await
                .map_err(|e| processor_error(ctx.name, processor.as_ref(), e))?;
            if let Some(instance) = result {
                debug!("处理器 {} 在实例化前提供了组件 {}", processor.name(), ctx.name);
                return Ok(Some(instance));
            }
        }
        Ok(None)
    }

    /// 实例化后阶段，任一处理器返回 `false` 即跳过属性填充
    pub async fn after_instantiation(
        &self,
        ctx: &ProcessingContext<'_>,
        instance: &ComponentInstance,
    ) -> ComponentResult<bool> {
        for processor in self.with(ProcessorCapabilities::AFTER_INSTANTIATION) {
            let proceed = processor
                .after_instantiation(ctx, instance)
                .await
                .map_err(|e| processor_error(ctx.name, processor.as_ref(), e))?;
            if !proceed {
                debug!("处理器 {} 跳过了组件 {} 的属性填充", processor.name(), ctx.name);
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// 属性改写阶段
    pub async fn process_properties(
        &self,
        ctx: &ProcessingContext<'_>,
        instance: &ComponentInstance,
        mut values: PropertyValues,
    ) -> ComponentResult<PropertyValues> {
        for processor in self.with(ProcessorCapabilities::PROPERTIES) {
            values = processor
                .process_properties(ctx, instance, values)
                .await
                .map_err(|e| processor_error(ctx.name, processor.as_ref(), e))?;
        }
        Ok(values)
    }

    /// 初始化前阶段
    pub async fn before_initialization(
        &self,
        ctx: &ProcessingContext<'_>,
        mut instance: ComponentInstance,
    ) -> ComponentResult<ComponentInstance> {
        for processor in self.with(ProcessorCapabilities::BEFORE_INIT) {
            instance = processor
                .before_initialization(ctx, instance)
                .await
                .map_err(|e| processor_error(ctx.name, processor.as_ref(), e))?;
        }
        Ok(instance)
    }

    /// 初始化后阶段
    pub async fn after_initialization(
        &self,
        ctx: &ProcessingContext<'_>,
        mut instance: ComponentInstance,
    ) -> ComponentResult<ComponentInstance> {
        for processor in self.with(ProcessorCapabilities::AFTER_INIT) {
            instance = processor
                .after_initialization(ctx, instance)
                .await
                .map_err(|e| processor_error(ctx.name, processor.as_ref(), e))?;
        }
        Ok(instance)
    }

    /// 第一个给出非空提名的处理器决定候选构造器
    pub fn candidate_constructors(&self, ctx: &ProcessingContext<'_>) -> Option<Vec<usize>> {
        self.with(ProcessorCapabilities::SMART_INSTANTIATION)
            .iter()
            .find_map(|p| p.candidate_constructors(ctx).filter(|c| !c.is_empty()))
    }

    /// 依次经过处理器的早期引用钩子
    pub fn early_reference(
        processors: &[Arc<dyn ComponentPostProcessor>],
        name: &str,
        raw: ComponentInstance,
    ) -> ComponentResult<ComponentInstance> {
        processors.iter().try_fold(raw, |instance, processor| {
            processor
                .early_reference(name, instance)
                .map_err(|e| processor_error(name, processor.as_ref(), e))
        })
    }
}

/// 注解驱动的属性注入处理器
///
/// 对描述中标记为 `autowired` 且尚未赋值的属性按类型解析依赖，
/// 不受定义的自动注入模式影响。
#[derive(Debug, Default, Clone, Copy)]
pub struct AutowiredPropertyProcessor;

impl AutowiredPropertyProcessor {
    /// 处理器名称
    pub const NAME: &'static str = "autowired-property";
}

#[async_trait]
impl ComponentPostProcessor for AutowiredPropertyProcessor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> ProcessorCapabilities {
        ProcessorCapabilities::PROPERTIES
    }

    fn order(&self) -> i32 {
        i32::MAX - 2
    }

    async fn process_properties(
        &self,
        ctx: &ProcessingContext<'_>,
        _instance: &ComponentInstance,
        mut values: PropertyValues,
    ) -> anyhow::Result<PropertyValues> {
        let Some(descriptor) = ctx.descriptor else {
            return Ok(values);
        };

        for property in descriptor.properties.iter().filter(|p| p.autowired) {
            if values.contains(&property.name) {
                continue;
            }
            let dependency = DependencyDescriptor::new(property.type_info, property.shape)
                .requested_by(ctx.name)
                .named(property.name.clone())
                .with_required(property.required)
                .with_qualifier(property.qualifier.clone());
            let value = ctx.resolver.resolve_dependency(&dependency).await?;
            if value.is_null() && property.shape != DependencyShape::Optional {
                debug!("组件 {} 的可选属性 {} 没有可注入的值", ctx.name, property.name);
                continue;
            }
            values.add(property.name.clone(), PropertyValue::Resolved(value));
        }
        Ok(values)
    }
}
