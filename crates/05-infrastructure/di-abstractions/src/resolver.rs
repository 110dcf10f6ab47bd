//! 依赖解析抽象接口
//!
//! 描述一个注入点需要什么，以及由谁来解析

use async_trait::async_trait;
use infrastructure_common::{ComponentResult, InjectionValue, TypeInfo};

/// 注入点的形态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyShape {
    /// 单个组件
    Single,
    /// 可选的单个组件
    Optional,
    /// 有序列表
    List,
    /// 去重集合
    Set,
    /// 以组件名为键的映射
    Map,
    /// 多值流，与列表相同的排序规则
    Stream,
    /// 首次使用时才解析的单个组件
    Deferred,
    /// 可反复访问的组件提供者
    Provider,
    /// 字面量值
    Value,
}

impl DependencyShape {
    /// 是否为多值形态
    pub fn is_multiple(self) -> bool {
        matches!(self, Self::List | Self::Set | Self::Map | Self::Stream)
    }

    /// 是否为延迟形态
    pub fn is_lazy(self) -> bool {
        matches!(self, Self::Deferred | Self::Provider)
    }
}

/// 依赖描述符
///
/// `required_type` 对单值形态是组件类型，对多值形态是元素类型。
#[derive(Debug, Clone)]
pub struct DependencyDescriptor {
    /// 要求的组件或元素类型
    pub required_type: TypeInfo,
    /// 注入点形态
    pub shape: DependencyShape,
    /// 发起请求的组件名称
    pub requesting_component: Option<String>,
    /// 属性名或参数名，用于按名称消歧
    pub dependency_name: Option<String>,
    /// 是否允许为类型判断而提前初始化候选
    pub eager: bool,
    /// 是否必须满足
    pub required: bool,
    /// 显式指定的查找名称
    pub lookup_name: Option<String>,
    /// 限定符
    pub qualifier: Option<String>,
}

impl DependencyDescriptor {
    /// 创建依赖描述符
    pub fn new(required_type: TypeInfo, shape: DependencyShape) -> Self {
        Self {
            required_type,
            shape,
            requesting_component: None,
            dependency_name: None,
            eager: true,
            required: shape != DependencyShape::Optional,
            lookup_name: None,
            qualifier: None,
        }
    }

    /// 创建单值依赖描述符
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeInfo::of::<T>(), DependencyShape::Single)
    }

    /// 设置发起请求的组件
    pub fn requested_by(mut self, component: impl Into<String>) -> Self {
        self.requesting_component = Some(component.into());
        self
    }

    /// 设置注入点名称
    pub fn named(mut self, dependency_name: impl Into<String>) -> Self {
        self.dependency_name = Some(dependency_name.into());
        self
    }

    /// 设置显式查找名称
    pub fn with_lookup_name(mut self, lookup_name: impl Into<String>) -> Self {
        self.lookup_name = Some(lookup_name.into());
        self
    }

    /// 设置限定符
    pub fn with_qualifier(mut self, qualifier: Option<String>) -> Self {
        self.qualifier = qualifier;
        self
    }

    /// 设置是否必须满足
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// 设置是否允许提前初始化
    pub fn with_eager(mut self, eager: bool) -> Self {
        self.eager = eager;
        self
    }

    /// 改变形态，保留其余信息
    pub fn with_shape(mut self, shape: DependencyShape) -> Self {
        self.shape = shape;
        self
    }

    /// 是否必须满足，可选形态永远不是必需的
    pub fn is_required(&self) -> bool {
        self.required && self.shape != DependencyShape::Optional
    }

    /// 注入点描述，用于错误信息
    pub fn injection_point(&self) -> String {
        match (&self.requesting_component, &self.dependency_name) {
            (Some(component), Some(name)) => format!("组件 {} 的 {}", component, name),
            (Some(component), None) => format!("组件 {}", component),
            (None, Some(name)) => name.clone(),
            (None, None) => "直接查找".to_string(),
        }
    }
}

/// 依赖解析器 trait
///
/// 后置处理器通过它解析注解驱动的注入点，解析过程沿用当前的创建链。
#[async_trait]
pub trait DependencyResolver: Send + Sync {
    /// 解析依赖描述符
    async fn resolve_dependency(
        &self,
        descriptor: &DependencyDescriptor,
    ) -> ComponentResult<InjectionValue>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Repository;

    #[test]
    fn test_optional_is_never_required() {
        let descriptor = DependencyDescriptor::of::<Repository>();
        assert!(descriptor.is_required());

        let optional = descriptor.with_shape(DependencyShape::Optional);
        assert!(!optional.is_required());
        assert!(!optional.shape.is_multiple());
    }

    #[test]
    fn test_injection_point_description() {
        let descriptor = DependencyDescriptor::of::<Repository>()
            .requested_by("orderService")
            .named("repository");
        assert_eq!(descriptor.injection_point(), "组件 orderService 的 repository");
        assert!(DependencyShape::Map.is_multiple());
        assert!(DependencyShape::Provider.is_lazy());
    }
}
