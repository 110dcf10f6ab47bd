//! 组件后置处理器抽象
//!
//! 后置处理器在组件创建流程的固定阶段介入：实例化前后、属性填充、初始化前后、
//! 构造器选择、早期引用以及销毁。每个处理器通过 [`ProcessorCapabilities`]
//! 声明自己参与哪些阶段，容器按能力分组缓存。

use crate::definition::ComponentDefinition;
use crate::metadata::TypeDescriptor;
use crate::resolver::DependencyResolver;
use async_trait::async_trait;
use bitflags::bitflags;
use infrastructure_common::{ComponentInstance, PropertyValues};
use std::fmt;

bitflags! {
    /// 处理器参与的阶段
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ProcessorCapabilities: u32 {
        /// 实例化前，可以直接返回替代实例
        const BEFORE_INSTANTIATION = 1;
        /// 实例化后，可以跳过属性填充
        const AFTER_INSTANTIATION = 1 << 1;
        /// 属性填充前改写属性值
        const PROPERTIES = 1 << 2;
        /// 初始化回调之前
        const BEFORE_INIT = 1 << 3;
        /// 初始化回调之后
        const AFTER_INIT = 1 << 4;
        /// 构造器选择与早期引用
        const SMART_INSTANTIATION = 1 << 5;
        /// 销毁前
        const DESTRUCTION = 1 << 6;
    }
}

/// 处理上下文
///
/// `resolver` 沿用当前创建链，处理器通过它解析的依赖同样参与循环引用检测。
pub struct ProcessingContext<'a> {
    /// 组件名称
    pub name: &'a str,
    /// 合并后的组件定义
    pub definition: &'a ComponentDefinition,
    /// 声明类型的描述
    pub descriptor: Option<&'a TypeDescriptor>,
    /// 依赖解析器
    pub resolver: &'a dyn DependencyResolver,
}

impl fmt::Debug for ProcessingContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingContext")
            .field("name", &self.name)
            .field("definition", &self.definition.summary())
            .finish()
    }
}

/// 组件后置处理器 trait
///
/// 所有阶段方法都有默认实现，处理器只需覆盖自己声明的能力对应的方法。
#[async_trait]
pub trait ComponentPostProcessor: Send + Sync {
    /// 处理器名称，同名处理器注册时会替换旧的
    fn name(&self) -> &str;

    /// 参与的阶段
    fn capabilities(&self) -> ProcessorCapabilities;

    /// 排序值，数值小的先执行
    fn order(&self) -> i32 {
        0
    }

    /// 实例化前，返回 `Some` 时跳过正常创建流程
    async fn before_instantiation(
        &self,
        _ctx: &ProcessingContext<'_>,
    ) -> anyhow::Result<Option<ComponentInstance>> {
        Ok(None)
    }

    /// 实例化后，返回 `false` 时跳过属性填充
    async fn after_instantiation(
        &self,
        _ctx: &ProcessingContext<'_>,
        _instance: &ComponentInstance,
    ) -> anyhow::Result<bool> {
        Ok(true)
    }

    /// 改写即将应用的属性值
    async fn process_properties(
        &self,
        _ctx: &ProcessingContext<'_>,
        _instance: &ComponentInstance,
        values: PropertyValues,
    ) -> anyhow::Result<PropertyValues> {
        Ok(values)
    }

    /// 初始化回调之前
    async fn before_initialization(
        &self,
        _ctx: &ProcessingContext<'_>,
        instance: ComponentInstance,
    ) -> anyhow::Result<ComponentInstance> {
        Ok(instance)
    }

    /// 初始化回调之后，可以返回包装后的实例
    async fn after_initialization(
        &self,
        _ctx: &ProcessingContext<'_>,
        instance: ComponentInstance,
    ) -> anyhow::Result<ComponentInstance> {
        Ok(instance)
    }

    /// 提名候选构造器的下标
    fn candidate_constructors(&self, _ctx: &ProcessingContext<'_>) -> Option<Vec<usize>> {
        None
    }

    /// 为循环引用提前暴露的引用，可以返回包装后的实例
    fn early_reference(
        &self,
        _name: &str,
        instance: ComponentInstance,
    ) -> anyhow::Result<ComponentInstance> {
        Ok(instance)
    }

    /// 是否需要在销毁时回调
    fn requires_destruction(&self, _name: &str, _instance: &ComponentInstance) -> bool {
        true
    }

    /// 销毁前
    async fn before_destruction(&self, _name: &str, _instance: &ComponentInstance) -> anyhow::Result<()> {
        Ok(())
    }
}
