//! 组件实例
//!
//! 容器内部以类型擦除的 [`ComponentInstance`] 保存组件。每个实例附带一张转换表，
//! 记录它可以被当作哪些类型（包括 `dyn Trait`）取出。

use crate::metadata::TypeInfo;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 类型擦除后的共享实例
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// 转换函数：把擦除后的实例转换为装箱的 `Arc<T>`
pub type CastFn = Arc<dyn Fn(&AnyArc) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// 构造从具体类型 `S` 到目标类型 `T` 的转换函数
///
/// ```ignore
/// let cast = upcast::<EnglishGreeter, dyn Greeter>(|g| g as Arc<dyn Greeter>);
/// ```
pub fn upcast<S, T>(convert: fn(Arc<S>) -> Arc<T>) -> CastFn
where
    S: Send + Sync + 'static,
    T: ?Sized + Send + Sync + 'static,
{
    Arc::new(move |any: &AnyArc| {
        let concrete = Arc::clone(any).downcast::<S>().ok()?;
        Some(Box::new(convert(concrete)) as Box<dyn Any + Send + Sync>)
    })
}

/// 类型转换表
#[derive(Clone, Default)]
pub struct CastTable {
    entries: HashMap<TypeId, (TypeInfo, CastFn)>,
}

impl CastTable {
    /// 创建空转换表
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建仅包含自身类型的转换表
    pub fn identity<S: Send + Sync + 'static>() -> Self {
        let mut table = Self::new();
        table.insert(TypeInfo::of::<S>(), upcast::<S, S>(|s| s));
        table
    }

    /// 注册一个转换目标
    pub fn insert(&mut self, target: TypeInfo, cast: CastFn) {
        self.entries.insert(target.id, (target, cast));
    }

    /// 是否可以转换到目标类型
    pub fn contains(&self, target: &TypeInfo) -> bool {
        self.entries.contains_key(&target.id)
    }

    /// 合并另一张转换表
    pub fn merge(&mut self, other: &CastTable) {
        for (id, entry) in &other.entries {
            self.entries.insert(*id, entry.clone());
        }
    }

    /// 所有转换目标
    pub fn targets(&self) -> impl Iterator<Item = &TypeInfo> {
        self.entries.values().map(|(info, _)| info)
    }

    fn get(&self, id: TypeId) -> Option<&CastFn> {
        self.entries.get(&id).map(|(_, cast)| cast)
    }
}

impl fmt::Debug for CastTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.targets().map(TypeInfo::short_name))
            .finish()
    }
}

/// 空实例的类型标记
#[derive(Debug)]
pub struct NullComponent;

/// 组件实例
///
/// 克隆只复制引用，不复制组件本身。工厂方法可以产生“空实例”，
/// 它会被缓存为单例，但不会出现在集合注入结果中。
#[derive(Clone)]
pub struct ComponentInstance {
    value: Option<AnyArc>,
    type_info: TypeInfo,
    casts: Arc<CastTable>,
}

impl ComponentInstance {
    /// 从组件值创建实例
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// 从共享指针创建实例
    pub fn from_arc<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            value: Some(value as AnyArc),
            type_info: TypeInfo::of::<T>(),
            casts: Arc::new(CastTable::identity::<T>()),
        }
    }

    /// 创建空实例
    pub fn null() -> Self {
        Self {
            value: None,
            type_info: TypeInfo::of::<NullComponent>(),
            casts: Arc::new(CastTable::new()),
        }
    }

    /// 是否为空实例
    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// 实际类型
    pub fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    /// 附加额外的转换目标
    pub fn with_casts(mut self, casts: &CastTable) -> Self {
        if self.value.is_some() {
            Arc::make_mut(&mut self.casts).merge(casts);
        }
        self
    }

    /// 按具体类型取出
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.value.clone()?.downcast::<T>().ok()
    }

    /// 按已注册的转换目标取出，支持 `dyn Trait`
    pub fn cast<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let value = self.value.as_ref()?;
        let cast = self.casts.get(TypeId::of::<T>())?;
        cast(value)?.downcast::<Arc<T>>().ok().map(|boxed| *boxed)
    }

    /// 是否可以作为目标类型使用
    pub fn can_cast_to(&self, target: &TypeInfo) -> bool {
        self.value.is_some() && self.casts.contains(target)
    }

    /// 可转换到的全部类型
    pub fn cast_targets(&self) -> Vec<TypeInfo> {
        self.casts.targets().copied().collect()
    }

    /// 是否指向同一个组件
    pub fn ptr_eq(&self, other: &ComponentInstance) -> bool {
        match (&self.value, &other.value) {
            (Some(a), Some(b)) => std::ptr::eq(
                Arc::as_ptr(a).cast::<()>(),
                Arc::as_ptr(b).cast::<()>(),
            ),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("ComponentInstance(null)");
        }
        f.debug_struct("ComponentInstance")
            .field("type", &self.type_info.short_name())
            .field("casts", &self.casts)
            .finish()
    }
}
