//! 类型元数据抽象
//!
//! 容器不依赖反射：每个可被实例化的类型通过 [`TypeDescriptor`] 描述自己的构造器、
//! 可写属性、工厂方法、生命周期回调以及可以被当作哪些 trait 对象使用。
//! [`MetadataProvider`] 负责按类型查找这些描述。

use crate::resolver::DependencyShape;
use anyhow::{anyhow, Context};
use futures::future::{self, BoxFuture, FutureExt};
use indexmap::IndexMap;
use infrastructure_common::{
    upcast, Annotations, CastTable, ComponentInstance, ComponentProvider, InjectionValue, TypeInfo,
    PRIORITY_ANNOTATION,
};
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// 构造器调用函数
pub type ConstructorFn =
    Arc<dyn Fn(Arguments) -> BoxFuture<'static, anyhow::Result<ComponentInstance>> + Send + Sync>;

/// 属性设置函数
pub type SetterFn = Arc<dyn Fn(&ComponentInstance, InjectionValue) -> anyhow::Result<()> + Send + Sync>;

/// 方法调用函数，宿主为 `None` 表示静态方法
pub type MethodFn = Arc<
    dyn Fn(Option<ComponentInstance>, Arguments) -> BoxFuture<'static, anyhow::Result<Option<ComponentInstance>>>
        + Send
        + Sync,
>;

/// 生命周期回调
pub type LifecycleCallback =
    Arc<dyn Fn(ComponentInstance) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// 构造器或方法的实参
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: Vec<(String, InjectionValue)>,
}

impl Arguments {
    /// 创建空实参列表
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加实参
    pub fn push(&mut self, name: impl Into<String>, value: InjectionValue) {
        self.values.push((name.into(), value));
    }

    /// 链式追加实参
    pub fn with(mut self, name: impl Into<String>, value: InjectionValue) -> Self {
        self.push(name, value);
        self
    }

    /// 实参数量
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 按位置获取
    pub fn get(&self, index: usize) -> Option<&InjectionValue> {
        self.values.get(index).map(|(_, value)| value)
    }

    /// 按参数名获取
    pub fn by_name(&self, name: &str) -> Option<&InjectionValue> {
        self.values
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, value)| value)
    }

    fn at(&self, index: usize) -> anyhow::Result<(&str, &InjectionValue)> {
        self.values
            .get(index)
            .map(|(name, value)| (name.as_str(), value))
            .ok_or_else(|| anyhow!("缺少第 {} 个参数，共 {} 个", index, self.values.len()))
    }

    /// 取出必需组件参数
    pub fn component<T: ?Sized + Send + Sync + 'static>(&self, index: usize) -> anyhow::Result<Arc<T>> {
        let (name, value) = self.at(index)?;
        value.component::<T>().with_context(|| format!("参数 {} 无法注入", name))
    }

    /// 取出可选组件参数
    pub fn optional<T: ?Sized + Send + Sync + 'static>(
        &self,
        index: usize,
    ) -> anyhow::Result<Option<Arc<T>>> {
        let (name, value) = self.at(index)?;
        value.optional::<T>().with_context(|| format!("参数 {} 无法注入", name))
    }

    /// 取出组件列表参数
    pub fn list<T: ?Sized + Send + Sync + 'static>(&self, index: usize) -> anyhow::Result<Vec<Arc<T>>> {
        let (name, value) = self.at(index)?;
        value.list::<T>().with_context(|| format!("参数 {} 无法注入", name))
    }

    /// 取出组件映射参数
    pub fn map<T: ?Sized + Send + Sync + 'static>(
        &self,
        index: usize,
    ) -> anyhow::Result<IndexMap<String, Arc<T>>> {
        let (name, value) = self.at(index)?;
        value.map::<T>().with_context(|| format!("参数 {} 无法注入", name))
    }

    /// 取出组件提供者参数
    pub fn provider(&self, index: usize) -> anyhow::Result<ComponentProvider> {
        let (name, value) = self.at(index)?;
        value.provider().with_context(|| format!("参数 {} 无法注入", name))
    }

    /// 取出字面量参数
    pub fn value<V: DeserializeOwned>(&self, index: usize) -> anyhow::Result<V> {
        let (name, value) = self.at(index)?;
        value.value::<V>().with_context(|| format!("参数 {} 无法注入", name))
    }
}

/// 参数描述
#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    /// 参数名
    pub name: String,
    /// 参数类型，多值形态为元素类型
    pub type_info: TypeInfo,
    /// 注入形态
    pub shape: DependencyShape,
    /// 是否必需
    pub required: bool,
    /// 限定符
    pub qualifier: Option<String>,
}

impl ParameterDescriptor {
    /// 创建参数描述
    pub fn new(name: impl Into<String>, type_info: TypeInfo, shape: DependencyShape) -> Self {
        Self {
            name: name.into(),
            type_info,
            shape,
            required: shape != DependencyShape::Optional,
            qualifier: None,
        }
    }

    /// 单个组件参数
    pub fn component<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self::new(name, TypeInfo::of::<T>(), DependencyShape::Single)
    }

    /// 可选组件参数
    pub fn optional<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self::new(name, TypeInfo::of::<T>(), DependencyShape::Optional)
    }

    /// 组件列表参数
    pub fn list<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self::new(name, TypeInfo::of::<T>(), DependencyShape::List)
    }

    /// 组件集合参数
    pub fn set<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self::new(name, TypeInfo::of::<T>(), DependencyShape::Set)
    }

    /// 组件映射参数
    pub fn map<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self::new(name, TypeInfo::of::<T>(), DependencyShape::Map)
    }

    /// 延迟组件参数
    pub fn deferred<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self::new(name, TypeInfo::of::<T>(), DependencyShape::Deferred)
    }

    /// 组件提供者参数
    pub fn provider<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self::new(name, TypeInfo::of::<T>(), DependencyShape::Provider)
    }

    /// 字面量参数
    pub fn value<T: 'static>(name: impl Into<String>) -> Self {
        Self::new(name, TypeInfo::of::<T>(), DependencyShape::Value)
    }

    /// 设置限定符
    pub fn qualified(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    /// 标记为非必需
    pub fn not_required(mut self) -> Self {
        self.required = false;
        self
    }
}

/// 构造器描述
#[derive(Clone)]
pub struct ConstructorDescriptor {
    /// 参数列表
    pub parameters: Vec<ParameterDescriptor>,
    /// 存在多个构造器时是否首选
    pub primary: bool,
    invoker: ConstructorFn,
}

impl ConstructorDescriptor {
    /// 创建异步构造器
    pub fn new<T, F, Fut>(parameters: Vec<ParameterDescriptor>, constructor: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self {
            parameters,
            primary: false,
            invoker: Arc::new(move |args: Arguments| {
                constructor(args)
                    .map(|result| result.map(ComponentInstance::new))
                    .boxed()
            }),
        }
    }

    /// 创建同步构造器
    pub fn sync<T, F>(parameters: Vec<ParameterDescriptor>, constructor: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Arguments) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self {
            parameters,
            primary: false,
            invoker: Arc::new(move |args: Arguments| {
                future::ready(constructor(&args).map(ComponentInstance::new)).boxed()
            }),
        }
    }

    /// 使用 `Default` 的无参构造器
    pub fn default_of<T: Default + Send + Sync + 'static>() -> Self {
        Self::sync(Vec::new(), |_| Ok(T::default()))
    }

    /// 标记为首选构造器
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// 参数个数
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    /// 调用构造器
    pub fn invoke(&self, args: Arguments) -> BoxFuture<'static, anyhow::Result<ComponentInstance>> {
        (self.invoker)(args)
    }
}

impl fmt::Debug for ConstructorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDescriptor")
            .field("parameters", &self.parameters)
            .field("primary", &self.primary)
            .field("invoker", &"<function>")
            .finish()
    }
}

/// 可写属性描述
///
/// 设置函数以共享引用接收宿主，属性字段需要自行提供内部可变性。
#[derive(Clone)]
pub struct PropertyDescriptor {
    /// 属性名
    pub name: String,
    /// 属性类型，多值形态为元素类型
    pub type_info: TypeInfo,
    /// 注入形态
    pub shape: DependencyShape,
    /// 是否必需
    pub required: bool,
    /// 是否由注解驱动自动注入
    pub autowired: bool,
    /// 限定符
    pub qualifier: Option<String>,
    setter: SetterFn,
}

impl PropertyDescriptor {
    /// 使用原始设置函数创建属性描述
    pub fn new(
        name: impl Into<String>,
        type_info: TypeInfo,
        shape: DependencyShape,
        setter: SetterFn,
    ) -> Self {
        Self {
            name: name.into(),
            type_info,
            shape,
            required: shape != DependencyShape::Optional,
            autowired: false,
            qualifier: None,
            setter,
        }
    }

    fn typed<O, F>(name: impl Into<String>, type_info: TypeInfo, shape: DependencyShape, apply: F) -> Self
    where
        O: Send + Sync + 'static,
        F: Fn(&O, &InjectionValue) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let setter: SetterFn = Arc::new(move |target: &ComponentInstance, value: InjectionValue| {
            let owner = target.downcast::<O>().ok_or_else(|| {
                anyhow!(
                    "属性宿主类型不匹配: 期望 {}, 实际 {}",
                    TypeInfo::of::<O>().short_name(),
                    target.type_info().short_name()
                )
            })?;
            apply(&owner, &value)
        });
        Self::new(name, type_info, shape, setter)
    }

    /// 单个组件属性
    pub fn component<O, T>(name: impl Into<String>, set: impl Fn(&O, Arc<T>) + Send + Sync + 'static) -> Self
    where
        O: Send + Sync + 'static,
        T: ?Sized + Send + Sync + 'static,
    {
        Self::typed::<O, _>(name, TypeInfo::of::<T>(), DependencyShape::Single, move |owner, value| {
            set(owner, value.component::<T>()?);
            Ok(())
        })
    }

    /// 可选组件属性
    pub fn optional<O, T>(
        name: impl Into<String>,
        set: impl Fn(&O, Option<Arc<T>>) + Send + Sync + 'static,
    ) -> Self
    where
        O: Send + Sync + 'static,
        T: ?Sized + Send + Sync + 'static,
    {
        Self::typed::<O, _>(name, TypeInfo::of::<T>(), DependencyShape::Optional, move |owner, value| {
            set(owner, value.optional::<T>()?);
            Ok(())
        })
    }

    /// 组件列表属性
    pub fn list<O, T>(name: impl Into<String>, set: impl Fn(&O, Vec<Arc<T>>) + Send + Sync + 'static) -> Self
    where
        O: Send + Sync + 'static,
        T: ?Sized + Send + Sync + 'static,
    {
        Self::typed::<O, _>(name, TypeInfo::of::<T>(), DependencyShape::List, move |owner, value| {
            set(owner, value.list::<T>()?);
            Ok(())
        })
    }

    /// 组件映射属性
    pub fn map<O, T>(
        name: impl Into<String>,
        set: impl Fn(&O, IndexMap<String, Arc<T>>) + Send + Sync + 'static,
    ) -> Self
    where
        O: Send + Sync + 'static,
        T: ?Sized + Send + Sync + 'static,
    {
        Self::typed::<O, _>(name, TypeInfo::of::<T>(), DependencyShape::Map, move |owner, value| {
            set(owner, value.map::<T>()?);
            Ok(())
        })
    }

    /// 组件提供者属性
    pub fn provider<O, T>(
        name: impl Into<String>,
        set: impl Fn(&O, ComponentProvider) + Send + Sync + 'static,
    ) -> Self
    where
        O: Send + Sync + 'static,
        T: ?Sized + 'static,
    {
        Self::typed::<O, _>(name, TypeInfo::of::<T>(), DependencyShape::Provider, move |owner, value| {
            set(owner, value.provider()?);
            Ok(())
        })
    }

    /// 字面量属性
    pub fn value<O, V>(name: impl Into<String>, set: impl Fn(&O, V) + Send + Sync + 'static) -> Self
    where
        O: Send + Sync + 'static,
        V: DeserializeOwned + 'static,
    {
        Self::typed::<O, _>(name, TypeInfo::of::<V>(), DependencyShape::Value, move |owner, value| {
            set(owner, value.value::<V>()?);
            Ok(())
        })
    }

    /// 标记为注解驱动的自动注入属性
    pub fn autowired(mut self) -> Self {
        self.autowired = true;
        self
    }

    /// 设置是否必需
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// 设置限定符
    pub fn qualified(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    /// 是否为简单值属性
    pub fn is_simple(&self) -> bool {
        self.shape == DependencyShape::Value
    }

    /// 把值写入目标实例
    pub fn apply(&self, target: &ComponentInstance, value: InjectionValue) -> anyhow::Result<()> {
        (self.setter)(target, value)
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("type", &self.type_info.short_name())
            .field("shape", &self.shape)
            .field("required", &self.required)
            .field("autowired", &self.autowired)
            .finish()
    }
}

/// 方法描述：工厂方法与初始化、销毁方法
#[derive(Clone)]
pub struct MethodDescriptor {
    /// 方法名
    pub name: String,
    /// 参数列表
    pub parameters: Vec<ParameterDescriptor>,
    /// 返回的组件类型，用于类型预测
    pub return_type: Option<TypeInfo>,
    /// 是否为静态方法
    pub is_static: bool,
    invoker: MethodFn,
}

impl MethodDescriptor {
    /// 实例工厂方法
    pub fn factory<H, T, F, Fut>(name: impl Into<String>, parameters: Vec<ParameterDescriptor>, method: F) -> Self
    where
        H: Send + Sync + 'static,
        T: Send + Sync + 'static,
        F: Fn(Arc<H>, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self::optional_factory::<H, T, _, _>(name, parameters, move |host, args| {
            method(host, args).map(|result| result.map(Some))
        })
    }

    /// 可能返回空值的实例工厂方法
    pub fn optional_factory<H, T, F, Fut>(
        name: impl Into<String>,
        parameters: Vec<ParameterDescriptor>,
        method: F,
    ) -> Self
    where
        H: Send + Sync + 'static,
        T: Send + Sync + 'static,
        F: Fn(Arc<H>, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<T>>> + Send + 'static,
    {
        let name = name.into();
        let method_name = name.clone();
        let invoker: MethodFn = Arc::new(move |host: Option<ComponentInstance>, args: Arguments| {
            match host.as_ref().and_then(|h| h.cast::<H>()) {
                Some(host) => method(host, args)
                    .map(|result| result.map(|value| value.map(ComponentInstance::new)))
                    .boxed(),
                None => future::ready(Err(anyhow!(
                    "工厂方法 {} 需要 {} 类型的宿主实例",
                    method_name,
                    TypeInfo::of::<H>().short_name()
                )))
                .boxed(),
            }
        });
        Self {
            name,
            parameters,
            return_type: Some(TypeInfo::of::<T>()),
            is_static: false,
            invoker,
        }
    }

    /// 静态工厂方法
    pub fn static_factory<T, F, Fut>(name: impl Into<String>, parameters: Vec<ParameterDescriptor>, method: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let invoker: MethodFn = Arc::new(move |_host: Option<ComponentInstance>, args: Arguments| {
            method(args)
                .map(|result| result.map(|value| Some(ComponentInstance::new(value))))
                .boxed()
        });
        Self {
            name: name.into(),
            parameters,
            return_type: Some(TypeInfo::of::<T>()),
            is_static: true,
            invoker,
        }
    }

    /// 无参回调方法，用于声明式的初始化与销毁方法
    pub fn callback<H, F, Fut>(name: impl Into<String>, method: F) -> Self
    where
        H: Send + Sync + 'static,
        F: Fn(Arc<H>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let callback = typed_callback::<H, _, _>(method);
        let invoker: MethodFn = Arc::new(move |host: Option<ComponentInstance>, _args: Arguments| match host {
            Some(host) => callback(host).map(|result| result.map(|()| None::<ComponentInstance>)).boxed(),
            None => future::ready(Err(anyhow!("回调方法需要宿主实例"))).boxed(),
        });
        Self {
            name: name.into(),
            parameters: Vec::new(),
            return_type: None,
            is_static: false,
            invoker,
        }
    }

    /// 覆盖预测的返回类型
    pub fn returning(mut self, return_type: TypeInfo) -> Self {
        self.return_type = Some(return_type);
        self
    }

    /// 调用方法
    pub fn invoke(
        &self,
        host: Option<ComponentInstance>,
        args: Arguments,
    ) -> BoxFuture<'static, anyhow::Result<Option<ComponentInstance>>> {
        (self.invoker)(host, args)
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("return_type", &self.return_type.map(|t| t.short_name()))
            .field("is_static", &self.is_static)
            .finish()
    }
}

fn typed_callback<T, F, Fut>(callback: F) -> LifecycleCallback
where
    T: Send + Sync + 'static,
    F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |instance: ComponentInstance| match instance.cast::<T>() {
        Some(target) => callback(target).boxed(),
        None => future::ready(Err(anyhow!(
            "生命周期回调的目标类型不匹配: 期望 {}, 实际 {}",
            TypeInfo::of::<T>().short_name(),
            instance.type_info().short_name()
        )))
        .boxed(),
    })
}

/// 类型描述
#[derive(Clone)]
pub struct TypeDescriptor {
    /// 类型信息
    pub type_info: TypeInfo,
    /// 可转换到的类型（包含自身）
    pub casts: CastTable,
    /// 构造器
    pub constructors: Vec<ConstructorDescriptor>,
    /// 可写属性
    pub properties: Vec<PropertyDescriptor>,
    /// 方法
    pub methods: Vec<MethodDescriptor>,
    /// 类型注解
    pub annotations: Annotations,
    /// 是否为简单值类型
    pub primitive_like: bool,
    /// 属性填充完成后的初始化回调
    pub init_callback: Option<LifecycleCallback>,
    /// 销毁回调
    pub destroy_callback: Option<LifecycleCallback>,
    /// 所有非懒加载单例就绪后的回调
    pub singletons_ready_callback: Option<LifecycleCallback>,
}

impl TypeDescriptor {
    /// 创建类型描述
    pub fn of<T: Send + Sync + 'static>() -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            casts: CastTable::identity::<T>(),
            constructors: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            annotations: Annotations::new(),
            primitive_like: false,
            init_callback: None,
            destroy_callback: None,
            singletons_ready_callback: None,
        }
    }

    /// 创建简单值类型的描述
    pub fn primitive<T: Send + Sync + 'static>() -> Self {
        let mut descriptor = Self::of::<T>();
        descriptor.primitive_like = true;
        descriptor
    }

    /// 声明可以作为 `T` 使用
    pub fn implements<S, T>(mut self, convert: fn(Arc<S>) -> Arc<T>) -> Self
    where
        S: Send + Sync + 'static,
        T: ?Sized + Send + Sync + 'static,
    {
        self.casts.insert(TypeInfo::of::<T>(), upcast::<S, T>(convert));
        self
    }

    /// 添加构造器
    pub fn constructor(mut self, constructor: ConstructorDescriptor) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// 添加可写属性
    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }

    /// 添加方法
    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    /// 添加注解
    pub fn annotation(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.annotations.insert(key, value);
        self
    }

    /// 设置优先级，数值越大越优先
    pub fn priority(self, priority: i32) -> Self {
        self.annotation(PRIORITY_ANNOTATION, priority)
    }

    /// 设置初始化回调
    pub fn on_init<T, F, Fut>(mut self, callback: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.init_callback = Some(typed_callback::<T, _, _>(callback));
        self
    }

    /// 设置销毁回调
    pub fn on_destroy<T, F, Fut>(mut self, callback: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.destroy_callback = Some(typed_callback::<T, _, _>(callback));
        self
    }

    /// 设置单例就绪回调
    pub fn on_singletons_ready<T, F, Fut>(mut self, callback: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.singletons_ready_callback = Some(typed_callback::<T, _, _>(callback));
        self
    }

    /// 是否可以赋值给目标类型
    pub fn is_assignable_to(&self, target: &TypeInfo) -> bool {
        self.type_info == *target || self.casts.contains(target)
    }

    /// 按名称查找属性
    pub fn property_named(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// 按名称查找方法
    pub fn method_named(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type", &self.type_info.short_name())
            .field("casts", &self.casts)
            .field("constructors", &self.constructors.len())
            .field("properties", &self.properties)
            .field("methods", &self.methods)
            .field("annotations", &self.annotations)
            .finish()
    }
}

/// 是否为内置的简单值类型
pub fn is_builtin_primitive(type_info: &TypeInfo) -> bool {
    type_info.is::<String>()
        || type_info.is::<bool>()
        || type_info.is::<char>()
        || type_info.is::<i8>()
        || type_info.is::<i16>()
        || type_info.is::<i32>()
        || type_info.is::<i64>()
        || type_info.is::<isize>()
        || type_info.is::<u8>()
        || type_info.is::<u16>()
        || type_info.is::<u32>()
        || type_info.is::<u64>()
        || type_info.is::<usize>()
        || type_info.is::<f32>()
        || type_info.is::<f64>()
        || type_info.is::<serde_json::Value>()
}

/// 元数据提供者 trait
pub trait MetadataProvider: Send + Sync {
    /// 查找类型描述
    fn descriptor_of(&self, type_info: &TypeInfo) -> Option<Arc<TypeDescriptor>>;

    /// 类型的构造器
    fn constructors_of(&self, type_info: &TypeInfo) -> Vec<ConstructorDescriptor> {
        self.descriptor_of(type_info)
            .map(|d| d.constructors.clone())
            .unwrap_or_default()
    }

    /// 类型的可写属性
    fn settable_properties_of(&self, type_info: &TypeInfo) -> Vec<PropertyDescriptor> {
        self.descriptor_of(type_info)
            .map(|d| d.properties.clone())
            .unwrap_or_default()
    }

    /// 类型的方法
    fn methods_of(&self, type_info: &TypeInfo) -> Vec<MethodDescriptor> {
        self.descriptor_of(type_info)
            .map(|d| d.methods.clone())
            .unwrap_or_default()
    }

    /// 类型注解
    fn annotations_of(&self, type_info: &TypeInfo) -> Annotations {
        self.descriptor_of(type_info)
            .map(|d| d.annotations.clone())
            .unwrap_or_default()
    }

    /// 类型是否可以赋值给目标类型
    fn is_assignable_to(&self, from: &TypeInfo, to: &TypeInfo) -> bool {
        from == to
            || self
                .descriptor_of(from)
                .is_some_and(|d| d.is_assignable_to(to))
    }

    /// 是否为简单值类型
    fn is_primitive_like(&self, type_info: &TypeInfo) -> bool {
        is_builtin_primitive(type_info)
            || self
                .descriptor_of(type_info)
                .is_some_and(|d| d.primitive_like)
    }
}
