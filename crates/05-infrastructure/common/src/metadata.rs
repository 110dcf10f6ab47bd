//! 元数据定义
//!
//! 提供类型标识与注解信息

use serde_json::Value;
use std::any::TypeId;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// 优先级注解键，数值越大越优先
pub const PRIORITY_ANNOTATION: &str = "priority";

/// 类型信息
///
/// 相等性与哈希只取决于 [`TypeId`]，名称仅用于日志和错误信息。
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    /// 完整类型名称
    pub name: &'static str,
    /// 类型ID
    pub id: TypeId,
}

impl TypeInfo {
    /// 从类型获取类型信息，支持 `dyn Trait`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }

    /// 获取简短的类型名称（不包含模块路径）
    pub fn short_name(&self) -> &'static str {
        let name = self.name.split('<').next().unwrap_or(self.name);
        name.rsplit("::").next().unwrap_or(name)
    }

    /// 是否为指定类型
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 注解集合
///
/// 以键值形式承载类型或组件定义上的声明式标记，例如优先级、限定符。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    values: BTreeMap<String, Value>,
}

impl Annotations {
    /// 创建空注解集合
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加注解
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// 插入注解
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// 获取注解值
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// 是否包含注解
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// 读取整数注解
    pub fn get_i32(&self, key: &str) -> Option<i32> {
        self.get(key)
            .and_then(Value::as_i64)
            .and_then(|v| i32::try_from(v).ok())
    }

    /// 读取优先级注解
    pub fn priority(&self) -> Option<i32> {
        self.get_i32(PRIORITY_ANNOTATION)
    }

    /// 合并另一组注解，已有键被覆盖
    pub fn merge(&mut self, other: &Annotations) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 遍历注解
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}
