//! 注入值与属性值
//!
//! [`PropertyValue`] 是组件定义中声明的值（引用、字面量、表达式等），
//! [`InjectionValue`] 是依赖解析之后真正交给构造器或属性设置器的值。

use crate::component::ComponentInstance;
use crate::errors::{ComponentError, ComponentResult, DependencyError};
use crate::metadata::TypeInfo;
use anyhow::{anyhow, Context};
use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// 声明式属性值
#[derive(Debug, Clone)]
pub enum PropertyValue {
    /// 空值
    Null,
    /// 预先给定的实例
    Instance(ComponentInstance),
    /// 按名称引用另一个组件
    Reference(String),
    /// 字面量
    Literal(Value),
    /// 交给表达式求值器的表达式
    Expression(String),
    /// 值列表
    List(Vec<PropertyValue>),
    /// 按键组织的值
    Map(IndexMap<String, PropertyValue>),
    /// 已经解析完成的注入值
    Resolved(InjectionValue),
}

impl PropertyValue {
    /// 创建组件引用
    pub fn reference(name: impl Into<String>) -> Self {
        Self::Reference(name.into())
    }

    /// 创建字面量
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// 创建表达式
    pub fn expression(expression: impl Into<String>) -> Self {
        Self::Expression(expression.into())
    }
}

/// 有序的属性值集合
#[derive(Debug, Clone, Default)]
pub struct PropertyValues {
    values: IndexMap<String, PropertyValue>,
}

impl PropertyValues {
    /// 创建空集合
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加属性值，同名属性会被覆盖
    pub fn add(&mut self, name: impl Into<String>, value: PropertyValue) {
        self.values.insert(name.into(), value);
    }

    /// 链式添加属性值
    pub fn with(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.add(name, value);
        self
    }

    /// 获取属性值
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(name)
    }

    /// 是否包含属性
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// 移除属性
    pub fn remove(&mut self, name: &str) -> Option<PropertyValue> {
        self.values.shift_remove(name)
    }

    /// 用另一组值覆盖当前值
    pub fn merge(&mut self, other: &PropertyValues) {
        for (name, value) in &other.values {
            self.values.insert(name.clone(), value.clone());
        }
    }

    /// 属性数量
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 遍历属性
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.values.iter()
    }
}

impl IntoIterator for PropertyValues {
    type Item = (String, PropertyValue);
    type IntoIter = indexmap::map::IntoIter<String, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

/// 延迟解析的数据源
///
/// 由容器实现，[`ComponentProvider`] 在每次访问时回到容器重新解析。
pub trait ProviderSource: Send + Sync {
    /// 要求的组件类型
    fn required_type(&self) -> TypeInfo;

    /// 获取唯一组件，缺失或不唯一时报错
    fn get(&self) -> BoxFuture<'_, ComponentResult<ComponentInstance>>;

    /// 获取组件，缺失时返回 `None`
    fn get_if_available(&self) -> BoxFuture<'_, ComponentResult<Option<ComponentInstance>>>;

    /// 获取组件，缺失或不唯一时返回 `None`
    fn get_if_unique(&self) -> BoxFuture<'_, ComponentResult<Option<ComponentInstance>>>;

    /// 获取全部匹配组件，`ordered` 为真时按优先级排序
    fn stream(&self, ordered: bool) -> BoxFuture<'_, ComponentResult<Vec<ComponentInstance>>>;
}

/// 组件提供者句柄
///
/// 注入时不创建目标组件，直到第一次调用访问方法才解析。
#[derive(Clone)]
pub struct ComponentProvider {
    source: Arc<dyn ProviderSource>,
}

impl ComponentProvider {
    /// 创建提供者
    pub fn new(source: Arc<dyn ProviderSource>) -> Self {
        Self { source }
    }

    /// 要求的组件类型
    pub fn required_type(&self) -> TypeInfo {
        self.source.required_type()
    }

    /// 获取唯一组件
    pub async fn get(&self) -> ComponentResult<ComponentInstance> {
        self.source.get().await
    }

    /// 获取唯一组件并转换为目标类型
    pub async fn get_as<T: ?Sized + Send + Sync + 'static>(&self) -> ComponentResult<Arc<T>> {
        let instance = self.get().await?;
        instance.cast::<T>().ok_or_else(|| {
            ComponentError::from(DependencyError::TypeMismatch {
                name: self.required_type().short_name().to_string(),
                required: TypeInfo::of::<T>().name.to_string(),
                actual: instance.type_info().name.to_string(),
            })
        })
    }

    /// 获取组件，不存在时返回 `None`
    pub async fn get_if_available(&self) -> ComponentResult<Option<ComponentInstance>> {
        self.source.get_if_available().await
    }

    /// 获取组件，不存在或不唯一时返回 `None`
    pub async fn get_if_unique(&self) -> ComponentResult<Option<ComponentInstance>> {
        self.source.get_if_unique().await
    }

    /// 按注册顺序获取全部匹配组件
    pub async fn stream(&self) -> ComponentResult<Vec<ComponentInstance>> {
        self.source.stream(false).await
    }

    /// 按优先级顺序获取全部匹配组件
    pub async fn ordered_stream(&self) -> ComponentResult<Vec<ComponentInstance>> {
        self.source.stream(true).await
    }
}

impl fmt::Debug for ComponentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentProvider")
            .field("required_type", &self.required_type().short_name())
            .finish()
    }
}

/// 依赖解析结果
#[derive(Debug, Clone)]
pub enum InjectionValue {
    /// 无值
    Null,
    /// 单个组件
    Single(ComponentInstance),
    /// 可选组件
    Optional(Option<ComponentInstance>),
    /// 有序组件列表
    List(Vec<ComponentInstance>),
    /// 以组件名为键的组件映射，保持注册顺序
    Map(IndexMap<String, ComponentInstance>),
    /// 延迟解析的单个组件
    Deferred(ComponentProvider),
    /// 组件提供者
    Provider(ComponentProvider),
    /// 字面量
    Literal(Value),
}

impl InjectionValue {
    /// 是否为空值
    pub fn is_null(&self) -> bool {
        match self {
            Self::Null | Self::Optional(None) => true,
            Self::Single(instance) | Self::Optional(Some(instance)) => instance.is_null(),
            _ => false,
        }
    }

    /// 值的种类，用于错误信息
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Single(_) => "single",
            Self::Optional(_) => "optional",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Deferred(_) => "deferred",
            Self::Provider(_) => "provider",
            Self::Literal(_) => "literal",
        }
    }

    /// 取出单个组件实例
    pub fn into_instance(self) -> Option<ComponentInstance> {
        match self {
            Self::Single(instance) | Self::Optional(Some(instance)) if !instance.is_null() => {
                Some(instance)
            }
            _ => None,
        }
    }

    /// 作为必需组件取出
    pub fn component<T: ?Sized + Send + Sync + 'static>(&self) -> anyhow::Result<Arc<T>> {
        self.optional::<T>()?
            .ok_or_else(|| anyhow!("期望 {} 组件，实际为空值", TypeInfo::of::<T>().short_name()))
    }

    /// 作为可选组件取出
    pub fn optional<T: ?Sized + Send + Sync + 'static>(&self) -> anyhow::Result<Option<Arc<T>>> {
        match self {
            Self::Null | Self::Optional(None) => Ok(None),
            Self::Single(instance) | Self::Optional(Some(instance)) => {
                if instance.is_null() {
                    return Ok(None);
                }
                cast_instance::<T>(instance).map(Some)
            }
            other => Err(anyhow!("无法把 {} 值作为单个组件使用", other.kind())),
        }
    }

    /// 作为组件列表取出
    pub fn list<T: ?Sized + Send + Sync + 'static>(&self) -> anyhow::Result<Vec<Arc<T>>> {
        match self {
            Self::Null => Ok(Vec::new()),
            Self::List(items) => items.iter().map(cast_instance::<T>).collect(),
            Self::Single(_) | Self::Optional(_) => Ok(self.optional::<T>()?.into_iter().collect()),
            Self::Map(items) => items.values().map(cast_instance::<T>).collect(),
            other => Err(anyhow!("无法把 {} 值作为组件列表使用", other.kind())),
        }
    }

    /// 作为组件映射取出
    pub fn map<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> anyhow::Result<IndexMap<String, Arc<T>>> {
        match self {
            Self::Null => Ok(IndexMap::new()),
            Self::Map(items) => items
                .iter()
                .map(|(name, instance)| cast_instance::<T>(instance).map(|c| (name.clone(), c)))
                .collect(),
            other => Err(anyhow!("无法把 {} 值作为组件映射使用", other.kind())),
        }
    }

    /// 作为提供者取出
    pub fn provider(&self) -> anyhow::Result<ComponentProvider> {
        match self {
            Self::Deferred(provider) | Self::Provider(provider) => Ok(provider.clone()),
            other => Err(anyhow!("无法把 {} 值作为组件提供者使用", other.kind())),
        }
    }

    /// 作为字面量反序列化
    pub fn value<V: DeserializeOwned>(&self) -> anyhow::Result<V> {
        match self {
            Self::Literal(value) => serde_json::from_value(value.clone())
                .with_context(|| format!("字面量 {} 无法转换为目标类型", value)),
            Self::Null => serde_json::from_value(Value::Null).context("空值无法转换为目标类型"),
            other => Err(anyhow!("无法把 {} 值作为字面量使用", other.kind())),
        }
    }
}

fn cast_instance<T: ?Sized + Send + Sync + 'static>(
    instance: &ComponentInstance,
) -> anyhow::Result<Arc<T>> {
    instance.cast::<T>().ok_or_else(|| {
        anyhow!(
            "组件类型 {} 无法作为 {} 使用",
            instance.type_info().short_name(),
            TypeInfo::of::<T>().short_name()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plugin(&'static str);

    #[test]
    fn test_list_and_map_extraction() {
        let a = ComponentInstance::new(Plugin("a"));
        let b = ComponentInstance::new(Plugin("b"));

        let list = InjectionValue::List(vec![a.clone(), b.clone()]);
        let plugins = list.list::<Plugin>().unwrap();
        assert_eq!(plugins.iter().map(|p| p.0).collect::<Vec<_>>(), vec!["a", "b"]);

        let mut items = IndexMap::new();
        items.insert("second".to_string(), b);
        items.insert("first".to_string(), a);
        let map = InjectionValue::Map(items).map::<Plugin>().unwrap();
        assert_eq!(map.keys().cloned().collect::<Vec<_>>(), vec!["second", "first"]);
    }

    #[test]
    fn test_literal_and_null_values() {
        let port = InjectionValue::Literal(Value::from(8080)).value::<u16>().unwrap();
        assert_eq!(port, 8080);

        let missing: Option<String> = InjectionValue::Null.value().unwrap();
        assert!(missing.is_none());

        assert!(InjectionValue::Null.component::<Plugin>().is_err());
        assert!(InjectionValue::Optional(None).optional::<Plugin>().unwrap().is_none());
    }

    #[test]
    fn test_property_values_keep_insertion_order() {
        let mut values = PropertyValues::new()
            .with("b", PropertyValue::literal(1))
            .with("a", PropertyValue::reference("repo"));
        values.add("b", PropertyValue::literal(2));

        let names: Vec<_> = values.iter().map(|(name, _)| name.clone()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(matches!(values.get("b"), Some(PropertyValue::Literal(v)) if v == &Value::from(2)));
    }
}
