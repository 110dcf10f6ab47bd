//! 组件定义
//!
//! 组件定义描述“如何得到一个组件”：声明类型、作用域、工厂方法、构造参数、
//! 属性值以及自动注入策略。定义可以继承父定义，使用前会合并为最终定义。

use futures::future::{BoxFuture, FutureExt};
use indexmap::IndexMap;
use infrastructure_common::{
    is_prototype_scope, is_singleton_scope, Annotations, ComponentInstance, DefinitionError,
    DefinitionResult, PropertyValue, PropertyValues, TypeInfo, SCOPE_PROTOTYPE,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// 自动注入模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutowireMode {
    /// 不自动注入
    #[default]
    No,
    /// 按属性名匹配组件名
    ByName,
    /// 按属性类型匹配组件
    ByType,
}

/// 依赖检查策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyCheck {
    /// 不检查
    #[default]
    None,
    /// 只检查简单值属性
    Simple,
    /// 只检查组件引用属性
    Objects,
    /// 检查全部属性
    All,
}

/// 组件角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentRole {
    /// 应用组件
    #[default]
    Application,
    /// 支撑组件
    Support,
    /// 容器基础设施组件
    Infrastructure,
}

/// 实例提供者
///
/// 定义上预先给定的创建函数，优先于工厂方法和构造器。
#[derive(Clone)]
pub struct InstanceSupplier(
    Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<ComponentInstance>> + Send + Sync>,
);

impl InstanceSupplier {
    /// 创建实例提供者
    pub fn new<T, F, Fut>(supplier: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self(Arc::new(move || {
            supplier()
                .map(|result| result.map(ComponentInstance::new))
                .boxed()
        }))
    }

    /// 获取实例
    pub fn get(&self) -> BoxFuture<'static, anyhow::Result<ComponentInstance>> {
        (self.0)()
    }
}

impl fmt::Debug for InstanceSupplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InstanceSupplier(<function>)")
    }
}

/// 构造参数
#[derive(Debug, Clone, Default)]
pub struct ConstructorArguments {
    indexed: BTreeMap<usize, PropertyValue>,
    named: IndexMap<String, PropertyValue>,
}

impl ConstructorArguments {
    /// 按位置添加参数
    pub fn add_indexed(&mut self, index: usize, value: PropertyValue) {
        self.indexed.insert(index, value);
    }

    /// 按名称添加参数
    pub fn add_named(&mut self, name: impl Into<String>, value: PropertyValue) {
        self.named.insert(name.into(), value);
    }

    /// 按位置获取
    pub fn indexed(&self, index: usize) -> Option<&PropertyValue> {
        self.indexed.get(&index)
    }

    /// 按名称获取
    pub fn named(&self, name: &str) -> Option<&PropertyValue> {
        self.named.get(name)
    }

    /// 参数总数
    pub fn len(&self) -> usize {
        self.indexed.len() + self.named.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.indexed.is_empty() && self.named.is_empty()
    }

    /// 用另一组参数覆盖
    pub fn merge(&mut self, other: &ConstructorArguments) {
        for (index, value) in &other.indexed {
            self.indexed.insert(*index, value.clone());
        }
        for (name, value) in &other.named {
            self.named.insert(name.clone(), value.clone());
        }
    }
}

/// 组件定义
#[derive(Debug, Clone)]
pub struct ComponentDefinition {
    /// 声明类型
    pub type_info: Option<TypeInfo>,
    /// 作用域标识，空字符串表示单例
    pub scope: String,
    /// 工厂组件名称
    pub factory_component_name: Option<String>,
    /// 工厂方法名称
    pub factory_method_name: Option<String>,
    /// 构造参数
    pub constructor_args: ConstructorArguments,
    /// 属性值
    pub property_values: PropertyValues,
    /// 自动注入模式
    pub autowire_mode: AutowireMode,
    /// 依赖检查策略
    pub dependency_check: DependencyCheck,
    /// 是否为首选候选
    pub primary: bool,
    /// 是否为合成定义，合成定义不经过后置处理器
    pub synthetic: bool,
    /// 组件角色
    pub role: ComponentRole,
    /// 排序值，数值越大越优先
    pub order: Option<i32>,
    /// 是否懒加载
    pub lazy_init: bool,
    /// 必须先于本组件创建的组件
    pub depends_on: Vec<String>,
    /// 是否参与按类型自动注入
    pub autowire_candidate: bool,
    /// 限定符
    pub qualifiers: Vec<String>,
    /// 是否为抽象定义
    pub is_abstract: bool,
    /// 父定义名称
    pub parent_name: Option<String>,
    /// 实例提供者
    pub instance_supplier: Option<InstanceSupplier>,
    /// 初始化方法名称
    pub init_method_names: Vec<String>,
    /// 销毁方法名称
    pub destroy_method_names: Vec<String>,
    /// 定义注解
    pub annotations: Annotations,
    /// 描述
    pub description: Option<String>,
}

impl Default for ComponentDefinition {
    fn default() -> Self {
        Self {
            type_info: None,
            scope: String::new(),
            factory_component_name: None,
            factory_method_name: None,
            constructor_args: ConstructorArguments::default(),
            property_values: PropertyValues::new(),
            autowire_mode: AutowireMode::No,
            dependency_check: DependencyCheck::None,
            primary: false,
            synthetic: false,
            role: ComponentRole::Application,
            order: None,
            lazy_init: false,
            depends_on: Vec::new(),
            autowire_candidate: true,
            qualifiers: Vec::new(),
            is_abstract: false,
            parent_name: None,
            instance_supplier: None,
            init_method_names: Vec::new(),
            destroy_method_names: Vec::new(),
            annotations: Annotations::new(),
            description: None,
        }
    }
}

impl ComponentDefinition {
    /// 创建指定类型的定义
    pub fn new(type_info: TypeInfo) -> Self {
        Self {
            type_info: Some(type_info),
            ..Self::default()
        }
    }

    /// 创建类型 `T` 的定义
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeInfo::of::<T>())
    }

    /// 创建由工厂组件的实例方法产生的定义
    pub fn from_factory_method(
        factory_component: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            factory_component_name: Some(factory_component.into()),
            factory_method_name: Some(method.into()),
            ..Self::default()
        }
    }

    /// 创建由类型 `T` 的静态方法产生的定义
    pub fn from_static_method<T: ?Sized + 'static>(method: impl Into<String>) -> Self {
        Self {
            factory_method_name: Some(method.into()),
            ..Self::of::<T>()
        }
    }

    /// 创建继承父定义的子定义
    pub fn child_of(parent: impl Into<String>) -> Self {
        Self {
            parent_name: Some(parent.into()),
            ..Self::default()
        }
    }

    /// 创建使用实例提供者的定义
    pub fn supplied<T, F, Fut>(supplier: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self {
            instance_supplier: Some(InstanceSupplier::new(supplier)),
            ..Self::of::<T>()
        }
    }

    /// 设置作用域
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// 设置为原型作用域
    pub fn prototype(self) -> Self {
        self.with_scope(SCOPE_PROTOTYPE)
    }

    /// 添加属性值
    pub fn with_property(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.property_values.add(name, value);
        self
    }

    /// 按位置添加构造参数
    pub fn with_constructor_arg(mut self, index: usize, value: PropertyValue) -> Self {
        self.constructor_args.add_indexed(index, value);
        self
    }

    /// 按名称添加构造参数
    pub fn with_named_constructor_arg(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.constructor_args.add_named(name, value);
        self
    }

    /// 设置自动注入模式
    pub fn with_autowire_mode(mut self, mode: AutowireMode) -> Self {
        self.autowire_mode = mode;
        self
    }

    /// 设置依赖检查策略
    pub fn with_dependency_check(mut self, check: DependencyCheck) -> Self {
        self.dependency_check = check;
        self
    }

    /// 标记为首选
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// 标记为合成定义
    pub fn synthetic(mut self) -> Self {
        self.synthetic = true;
        self
    }

    /// 设置角色
    pub fn with_role(mut self, role: ComponentRole) -> Self {
        self.role = role;
        self
    }

    /// 设置排序值
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    /// 标记为懒加载
    pub fn lazy(mut self) -> Self {
        self.lazy_init = true;
        self
    }

    /// 添加 depends-on 组件
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    /// 设置是否参与自动注入
    pub fn with_autowire_candidate(mut self, candidate: bool) -> Self {
        self.autowire_candidate = candidate;
        self
    }

    /// 添加限定符
    pub fn qualified(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifiers.push(qualifier.into());
        self
    }

    /// 标记为抽象定义
    pub fn abstract_definition(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// 添加初始化方法
    pub fn with_init_method(mut self, method: impl Into<String>) -> Self {
        self.init_method_names.push(method.into());
        self
    }

    /// 添加销毁方法
    pub fn with_destroy_method(mut self, method: impl Into<String>) -> Self {
        self.destroy_method_names.push(method.into());
        self
    }

    /// 添加注解
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.annotations.insert(key, value);
        self
    }

    /// 设置描述
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// 是否为单例
    pub fn is_singleton(&self) -> bool {
        is_singleton_scope(&self.scope)
    }

    /// 是否为原型
    pub fn is_prototype(&self) -> bool {
        is_prototype_scope(&self.scope)
    }

    /// 是否有工厂方法或实例提供者
    pub fn has_factory(&self) -> bool {
        self.factory_method_name.is_some() || self.instance_supplier.is_some()
    }

    /// 是否跳过后置处理器
    pub fn skips_processing(&self) -> bool {
        self.synthetic || self.role == ComponentRole::Infrastructure
    }

    /// 定义上的优先级
    pub fn priority(&self) -> Option<i32> {
        self.order.or_else(|| self.annotations.priority())
    }

    /// 与父定义合并，子定义中显式给出的值优先
    pub fn merged_with_parent(&self, parent: &ComponentDefinition) -> ComponentDefinition {
        let mut merged = parent.clone();

        if self.type_info.is_some() {
            merged.type_info = self.type_info;
        }
        if !self.scope.is_empty() {
            merged.scope = self.scope.clone();
        }
        if self.factory_component_name.is_some() {
            merged.factory_component_name = self.factory_component_name.clone();
        }
        if self.factory_method_name.is_some() {
            merged.factory_method_name = self.factory_method_name.clone();
        }
        merged.constructor_args.merge(&self.constructor_args);
        merged.property_values.merge(&self.property_values);
        merged.autowire_mode = self.autowire_mode;
        merged.dependency_check = self.dependency_check;
        merged.primary = self.primary;
        merged.synthetic = self.synthetic;
        merged.role = self.role;
        if self.order.is_some() {
            merged.order = self.order;
        }
        merged.lazy_init = self.lazy_init;
        if !self.depends_on.is_empty() {
            merged.depends_on = self.depends_on.clone();
        }
        merged.autowire_candidate = self.autowire_candidate;
        for qualifier in &self.qualifiers {
            if !merged.qualifiers.contains(qualifier) {
                merged.qualifiers.push(qualifier.clone());
            }
        }
        merged.is_abstract = self.is_abstract;
        merged.parent_name = None;
        if self.instance_supplier.is_some() {
            merged.instance_supplier = self.instance_supplier.clone();
        }
        if !self.init_method_names.is_empty() {
            merged.init_method_names = self.init_method_names.clone();
        }
        if !self.destroy_method_names.is_empty() {
            merged.destroy_method_names = self.destroy_method_names.clone();
        }
        merged.annotations.merge(&self.annotations);
        if self.description.is_some() {
            merged.description = self.description.clone();
        }
        merged
    }

    /// 校验定义本身的完整性
    pub fn validate(&self, name: &str) -> DefinitionResult<()> {
        if self.is_abstract || self.parent_name.is_some() {
            return Ok(());
        }
        if self.type_info.is_none() && !self.has_factory() {
            return Err(DefinitionError::invalid(name, "缺少声明类型、工厂方法或实例提供者"));
        }
        if self.factory_component_name.is_some() && self.factory_method_name.is_none() {
            return Err(DefinitionError::invalid(name, "指定了工厂组件但没有工厂方法"));
        }
        Ok(())
    }

    /// 简要描述，用于日志
    pub fn summary(&self) -> String {
        let type_name = self.type_info.map_or("<未声明>", |t| t.short_name());
        let scope = if self.scope.is_empty() { "singleton" } else { &self.scope };
        match (&self.factory_component_name, &self.factory_method_name) {
            (Some(host), Some(method)) => {
                format!("type={} scope={} factory={}.{}", type_name, scope, host, method)
            }
            (None, Some(method)) => format!("type={} scope={} factory={}::{}", type_name, scope, type_name, method),
            _ => format!("type={} scope={}", type_name, scope),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DataSource;

    #[test]
    fn test_child_definition_overrides_parent() {
        let parent = ComponentDefinition::of::<DataSource>()
            .with_property("url", PropertyValue::literal("jdbc:a"))
            .with_property("pool", PropertyValue::literal(4))
            .prototype()
            .abstract_definition();
        let child = ComponentDefinition::child_of("base")
            .with_property("url", PropertyValue::literal("jdbc:b"))
            .with_order(5);

        let merged = child.merged_with_parent(&parent);
        assert_eq!(merged.type_info, Some(TypeInfo::of::<DataSource>()));
        assert!(merged.is_prototype());
        assert!(!merged.is_abstract);
        assert_eq!(merged.priority(), Some(5));
        assert!(merged.parent_name.is_none());
        assert!(matches!(
            merged.property_values.get("url"),
            Some(PropertyValue::Literal(v)) if v == "jdbc:b"
        ));
        assert!(merged.property_values.contains("pool"));
    }

    #[test]
    fn test_validate_definition() {
        assert!(ComponentDefinition::default().validate("empty").is_err());
        assert!(ComponentDefinition::of::<DataSource>().validate("ds").is_ok());
        assert!(ComponentDefinition::from_factory_method("config", "dataSource")
            .validate("ds")
            .is_ok());
        assert!(ComponentDefinition::of::<DataSource>().is_singleton());
    }
}
