//! 默认组件工厂
//!
//! [`DefaultComponentFactory`] 把定义存储、单例注册表、作用域、候选解析与创建管线
//! 组合在一起，对外提供注册、查找与生命周期管理接口。

use crate::candidate::CandidateResolver;
use crate::context::ResolutionContext;
use crate::creation::attach_casts;
use crate::conversion::DefaultConversionService;
use crate::definition_store::DefinitionStore;
use crate::disposable::DisposableAdapter;
use crate::options::ContainerOptions;
use crate::processor::{AutowiredPropertyProcessor, ProcessorPipeline};
use crate::scope::ScopeRegistry;
use crate::singleton_registry::SingletonRegistry;
use async_trait::async_trait;
use di_abstractions::{
    ComponentDefinition, ComponentDefinitionRegistry, ComponentFactory, ComponentPostProcessor,
    ConversionService, DependencyDescriptor, DependencyResolver, DependencyShape,
    ExpressionEvaluator, ListableComponentFactory, MetadataProvider, ProcessorCapabilities, Scope,
    SingletonComponentRegistry,
};
use indexmap::IndexMap;
use infrastructure_common::{
    ComponentError, ComponentInstance, ComponentProvider, ComponentResult, DefinitionError,
    DefinitionResult, DependencyError, InjectionValue, TypeInfo,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::{Arc, Weak};
use tracing::{debug, info};

/// 工厂内部状态，由 [`DefaultComponentFactory`] 的所有克隆共享
pub(crate) struct FactoryInner {
    pub(crate) options: RwLock<ContainerOptions>,
    pub(crate) definitions: DefinitionStore,
    pub(crate) singletons: SingletonRegistry,
    pub(crate) scopes: ScopeRegistry,
    pub(crate) processors: ProcessorPipeline,
    pub(crate) candidates: CandidateResolver,
    pub(crate) metadata: Arc<dyn MetadataProvider>,
    pub(crate) conversion: RwLock<Arc<dyn ConversionService>>,
    pub(crate) evaluator: RwLock<Option<Arc<dyn ExpressionEvaluator>>>,
    pub(crate) parent: Option<Arc<dyn ListableComponentFactory>>,
    pub(crate) already_created: Mutex<HashSet<String>>,
    pub(crate) this: Weak<FactoryInner>,
}

impl FactoryInner {
    pub(crate) fn allow_circular_references(&self) -> bool {
        self.options.read().allow_circular_references
    }

    pub(crate) fn allow_raw_injection_despite_wrapping(&self) -> bool {
        self.options.read().allow_raw_injection_despite_wrapping
    }

    pub(crate) fn conversion_service(&self) -> Arc<dyn ConversionService> {
        Arc::clone(&self.conversion.read())
    }

    pub(crate) fn expression_evaluator(&self) -> Option<Arc<dyn ExpressionEvaluator>> {
        self.evaluator.read().clone()
    }

    /// 按实际类型的描述补全转换目标
    pub(crate) fn attach_casts(&self, instance: ComponentInstance) -> ComponentInstance {
        attach_casts(self.metadata.as_ref(), instance)
    }

    pub(crate) fn mark_created(&self, name: &str) {
        self.already_created.lock().insert(name.to_string());
    }

    pub(crate) fn is_created(&self, name: &str) -> bool {
        self.already_created.lock().contains(name)
    }

    /// 本容器是否持有该名称的定义或单例
    pub(crate) fn contains_local(&self, name: &str) -> bool {
        self.definitions.contains_definition(name) || self.singletons.contains_singleton(name)
    }

    pub(crate) fn contains_component(&self, name: &str) -> bool {
        self.contains_local(name)
            || self
                .parent
                .as_ref()
                .is_some_and(|parent| parent.contains_component(name))
    }

    pub(crate) fn type_of(&self, name: &str) -> Option<TypeInfo> {
        if let Some(instance) = self.singletons.get_singleton(name) {
            if !instance.is_null() {
                return Some(instance.type_info());
            }
        }
        match self.definitions.merged(name) {
            Ok(definition) => self.definitions.predicted_type(&definition),
            Err(_) => self.parent.as_ref().and_then(|parent| parent.type_of(name)),
        }
    }

    /// 本容器内类型匹配的组件名称：先定义，后外部登记的单例
    pub(crate) fn local_names_for_type(&self, type_info: &TypeInfo, include_non_singletons: bool) -> Vec<String> {
        let mut names = self.definitions.names_for_type(type_info, include_non_singletons);
        for name in self.singletons.singleton_names() {
            if names.contains(&name) {
                continue;
            }
            let matches = self
                .singletons
                .get_singleton(&name)
                .is_some_and(|instance| instance.can_cast_to(type_info));
            if matches {
                names.push(name);
            }
        }
        names
    }

    fn scope_check(&self, name: &str, definition: &ComponentDefinition) -> DefinitionResult<()> {
        if definition.is_singleton() || definition.is_prototype() || self.scopes.get(&definition.scope).is_some() {
            Ok(())
        } else {
            Err(DefinitionError::NoSuchScope {
                name: name.to_string(),
                scope: definition.scope.clone(),
            })
        }
    }
}

/// 默认组件工厂
///
/// 克隆开销很小，所有克隆共享同一份状态。
///
/// # 示例
///
/// ```rust,ignore
/// let factory = DefaultComponentFactory::new(Arc::new(metadata));
/// factory
///     .register_definition("repository", ComponentDefinition::of::<MemoryRepository>())
///     .await?;
/// factory.pre_instantiate_singletons().await?;
/// let repository = factory.get_typed::<dyn Repository>().await?;
/// ```
#[derive(Clone)]
pub struct DefaultComponentFactory {
    inner: Arc<FactoryInner>,
}

impl DefaultComponentFactory {
    /// 使用默认选项创建工厂
    pub fn new(metadata: Arc<dyn MetadataProvider>) -> Self {
        Self::with_options(metadata, ContainerOptions::default())
    }

    /// 使用指定选项创建工厂
    pub fn with_options(metadata: Arc<dyn MetadataProvider>, options: ContainerOptions) -> Self {
        Self::build(metadata, options, None)
    }

    /// 创建子工厂，本地没有的组件委托给父工厂
    pub fn with_parent(
        parent: Arc<dyn ListableComponentFactory>,
        metadata: Arc<dyn MetadataProvider>,
        options: ContainerOptions,
    ) -> Self {
        Self::build(metadata, options, Some(parent))
    }

    fn build(
        metadata: Arc<dyn MetadataProvider>,
        options: ContainerOptions,
        parent: Option<Arc<dyn ListableComponentFactory>>,
    ) -> Self {
        let definitions = DefinitionStore::new(Arc::clone(&metadata));
        definitions.set_allow_definition_overriding(options.allow_definition_overriding);
        definitions.set_cache_metadata(options.cache_metadata);

        let processors = ProcessorPipeline::new();
        processors.add(Arc::new(AutowiredPropertyProcessor));

        let inner = Arc::new_cyclic(|this| FactoryInner {
            options: RwLock::new(options),
            definitions,
            singletons: SingletonRegistry::new(),
            scopes: ScopeRegistry::new(),
            processors,
            candidates: CandidateResolver::new(),
            metadata,
            conversion: RwLock::new(Arc::new(DefaultConversionService::new())),
            evaluator: RwLock::new(None),
            parent,
            already_created: Mutex::new(HashSet::new()),
            this: this.clone(),
        });
        debug!("创建组件工厂: {:?}", options);
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &Arc<FactoryInner> {
        &self.inner
    }

    // ---- 选项 ----

    /// 当前选项
    pub fn options(&self) -> ContainerOptions {
        *self.inner.options.read()
    }

    /// 设置是否允许循环引用
    pub fn set_allow_circular_references(&self, allow: bool) {
        self.inner.options.write().allow_circular_references = allow;
    }

    /// 设置是否允许覆盖同名定义
    pub fn set_allow_definition_overriding(&self, allow: bool) {
        self.inner.options.write().allow_definition_overriding = allow;
        self.inner.definitions.set_allow_definition_overriding(allow);
    }

    /// 设置是否允许原始实例注入后被包装
    pub fn set_allow_raw_injection_despite_wrapping(&self, allow: bool) {
        self.inner.options.write().allow_raw_injection_despite_wrapping = allow;
    }

    /// 设置是否缓存合并定义与类型匹配结果
    pub fn set_cache_metadata(&self, cache: bool) {
        self.inner.options.write().cache_metadata = cache;
        self.inner.definitions.set_cache_metadata(cache);
    }

    /// 替换类型转换服务
    pub fn set_conversion_service(&self, conversion: Arc<dyn ConversionService>) {
        *self.inner.conversion.write() = conversion;
    }

    /// 设置表达式求值器
    pub fn set_expression_evaluator(&self, evaluator: Arc<dyn ExpressionEvaluator>) {
        *self.inner.evaluator.write() = Some(evaluator);
    }

    // ---- 注册 ----

    /// 注册组件定义
    ///
    /// 覆盖已有定义时，旧定义创建的单例会被销毁。
    pub async fn register_definition(
        &self,
        name: &str,
        definition: ComponentDefinition,
    ) -> DefinitionResult<()> {
        let previous = self.inner.definitions.register_definition(name, definition)?;
        if previous.is_some() {
            self.reset_component(name).await;
        }
        Ok(())
    }

    /// 移除组件定义，并销毁它已经创建的单例
    pub async fn remove_definition(&self, name: &str) -> DefinitionResult<Arc<ComponentDefinition>> {
        let removed = self.inner.definitions.remove_definition(name)?;
        self.reset_component(name).await;
        Ok(removed)
    }

    async fn reset_component(&self, name: &str) {
        self.inner.already_created.lock().remove(name);
        if self.inner.singletons.contains_singleton(name) {
            debug!("定义变更，销毁旧单例: {}", name);
            self.inner.singletons.destroy_singleton(name).await;
        }
    }

    /// 获取原始组件定义
    pub fn get_definition(&self, name: &str) -> DefinitionResult<Arc<ComponentDefinition>> {
        self.inner.definitions.get_definition(name)
    }

    /// 按声明类型获取唯一的组件定义
    pub fn get_definition_by_type(
        &self,
        type_info: &TypeInfo,
    ) -> DefinitionResult<(String, Arc<ComponentDefinition>)> {
        self.inner.definitions.get_definition_by_type(type_info)
    }

    /// 就地修改组件定义
    pub fn modify_definition(
        &self,
        name: &str,
        update: impl FnOnce(&mut ComponentDefinition),
    ) -> DefinitionResult<()> {
        self.inner.definitions.modify(name, update)
    }

    /// 定义名称，按注册顺序
    pub fn definition_names(&self) -> Vec<String> {
        self.inner.definitions.definition_names()
    }

    /// 定义数量
    pub fn definition_count(&self) -> usize {
        self.inner.definitions.definition_count()
    }

    /// 登记外部创建的单例
    pub fn register_singleton(&self, name: &str, instance: ComponentInstance) -> ComponentResult<()> {
        DefinitionStore::validate_name(name)?;
        let instance = self.inner.attach_casts(instance);
        self.inner.singletons.register_singleton(name, instance)
    }

    /// 注册自定义作用域
    pub fn register_scope(&self, id: &str, scope: Arc<dyn Scope>) -> DefinitionResult<()> {
        self.inner.scopes.register_scope(id, scope)
    }

    /// 已注册的自定义作用域
    pub fn registered_scope_names(&self) -> Vec<String> {
        self.inner.scopes.registered_scope_names()
    }

    /// 添加后置处理器
    pub fn add_processor(&self, processor: Arc<dyn ComponentPostProcessor>) {
        self.inner.processors.add(processor);
    }

    /// 后置处理器名称，按执行顺序
    pub fn processor_names(&self) -> Vec<String> {
        self.inner.processors.names()
    }

    /// 忽略某个依赖类型
    pub fn register_ignored_dependency(&self, type_info: TypeInfo) {
        self.inner.candidates.register_ignored_dependency(type_info);
    }

    /// 忽略可赋值给某个接口的依赖类型
    pub fn register_ignored_interface(&self, type_info: TypeInfo) {
        self.inner.candidates.register_ignored_interface(type_info);
    }

    /// 登记不经过定义的可注入值
    pub fn register_resolvable_dependency(&self, type_info: TypeInfo, instance: ComponentInstance) {
        let instance = self.inner.attach_casts(instance);
        self.inner.candidates.register_resolvable_dependency(type_info, instance);
    }

    // ---- 查找 ----

    /// 按名称获取组件
    pub async fn get_named(&self, name: &str) -> ComponentResult<ComponentInstance> {
        let ctx = ResolutionContext::current();
        self.inner.do_get_component(name, None, None, &ctx).await
    }

    /// 按名称获取组件并显式给出构造参数
    ///
    /// 显式参数按位置覆盖构造器或工厂方法的参数，通常用于原型组件。
    pub async fn get_named_with_args(
        &self,
        name: &str,
        args: Vec<InjectionValue>,
    ) -> ComponentResult<ComponentInstance> {
        let ctx = ResolutionContext::current();
        self.inner.do_get_component(name, None, Some(args), &ctx).await
    }

    /// 按名称获取组件并转换为 `T`
    pub async fn get_named_as<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> ComponentResult<Arc<T>> {
        let ctx = ResolutionContext::current();
        let required = TypeInfo::of::<T>();
        let instance = self
            .inner
            .do_get_component(name, Some(required), None, &ctx)
            .await?;
        instance.cast::<T>().ok_or_else(|| {
            DependencyError::TypeMismatch {
                name: name.to_string(),
                required: required.name.to_string(),
                actual: instance.type_info().name.to_string(),
            }
            .into()
        })
    }

    /// 按类型获取唯一组件，多个候选时按首选、优先级决出
    pub async fn get_by_type(&self, type_info: &TypeInfo) -> ComponentResult<ComponentInstance> {
        let ctx = ResolutionContext::current();
        let descriptor = DependencyDescriptor::new(*type_info, DependencyShape::Single);
        let value = self.inner.resolve_dependency_in(&descriptor, &ctx).await?;
        value.into_instance().ok_or_else(|| {
            DependencyError::NoMatchingComponent {
                type_name: type_info.name.to_string(),
                requested_by: None,
                injection_point: descriptor.injection_point(),
            }
            .into()
        })
    }

    /// 按类型获取唯一组件并转换为 `T`
    pub async fn get_typed<T: ?Sized + Send + Sync + 'static>(&self) -> ComponentResult<Arc<T>> {
        let required = TypeInfo::of::<T>();
        let instance = self.get_by_type(&required).await?;
        instance.cast::<T>().ok_or_else(|| {
            DependencyError::TypeMismatch {
                name: required.short_name().to_string(),
                required: required.name.to_string(),
                actual: instance.type_info().name.to_string(),
            }
            .into()
        })
    }

    /// 获取全部类型匹配的组件，按注册顺序
    pub async fn get_all_of_type(
        &self,
        type_info: &TypeInfo,
    ) -> ComponentResult<IndexMap<String, ComponentInstance>> {
        let ctx = ResolutionContext::current();
        let descriptor =
            DependencyDescriptor::new(*type_info, DependencyShape::Map).with_required(false);
        match self.inner.resolve_dependency_in(&descriptor, &ctx).await? {
            InjectionValue::Map(items) => Ok(items),
            _ => Ok(IndexMap::new()),
        }
    }

    /// 获取延迟解析的组件提供者
    pub fn provider_for(&self, type_info: TypeInfo) -> ComponentProvider {
        self.inner
            .provider_for(DependencyDescriptor::new(type_info, DependencyShape::Provider))
    }

    /// 是否存在该名称的组件
    pub fn contains_component(&self, name: &str) -> bool {
        self.inner.contains_component(name)
    }

    /// 是否为单例
    pub fn is_singleton(&self, name: &str) -> DefinitionResult<bool> {
        match self.inner.definitions.merged(name) {
            Ok(definition) => Ok(definition.is_singleton()),
            Err(DefinitionError::NotFound { .. }) if self.inner.singletons.contains_singleton(name) => Ok(true),
            Err(DefinitionError::NotFound { .. }) => match &self.inner.parent {
                Some(parent) => parent.is_singleton(name),
                None => Err(DefinitionError::not_found(name)),
            },
            Err(err) => Err(err),
        }
    }

    /// 是否为原型
    pub fn is_prototype(&self, name: &str) -> DefinitionResult<bool> {
        match self.inner.definitions.merged(name) {
            Ok(definition) => Ok(definition.is_prototype()),
            Err(DefinitionError::NotFound { .. }) if self.inner.singletons.contains_singleton(name) => Ok(false),
            Err(DefinitionError::NotFound { .. }) => match &self.inner.parent {
                Some(parent) => parent.is_prototype(name),
                None => Err(DefinitionError::not_found(name)),
            },
            Err(err) => Err(err),
        }
    }

    /// 组件类型，不触发创建
    pub fn type_of(&self, name: &str) -> Option<TypeInfo> {
        self.inner.type_of(name)
    }

    /// 类型匹配的组件名称，只包含本容器
    pub fn names_for_type(&self, type_info: &TypeInfo, include_non_singletons: bool) -> Vec<String> {
        self.inner.local_names_for_type(type_info, include_non_singletons)
    }

    /// 合并父定义后的最终定义
    pub fn merged_definition(&self, name: &str) -> DefinitionResult<Arc<ComponentDefinition>> {
        self.inner.definitions.merged(name)
    }

    /// 已创建的单例名称，按创建顺序
    pub fn singleton_names(&self) -> Vec<String> {
        self.inner.singletons.singleton_names()
    }

    /// 单例是否正在创建
    pub fn is_currently_in_creation(&self, name: &str) -> bool {
        self.inner.singletons.is_currently_in_creation(name)
    }

    /// 依赖于 `name` 的组件
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        self.inner.singletons.dependents_of(name)
    }

    /// `name` 依赖的组件
    pub fn dependencies_of(&self, name: &str) -> Vec<String> {
        self.inner.singletons.dependencies_of(name)
    }

    // ---- 生命周期 ----

    /// 冻结配置，之后不再接受定义的注册与移除
    pub fn freeze_configuration(&self) {
        self.inner.definitions.freeze();
    }

    /// 配置是否已冻结
    pub fn is_configuration_frozen(&self) -> bool {
        self.inner.definitions.is_frozen()
    }

    /// 创建全部非懒加载单例，然后调用单例就绪回调
    pub async fn pre_instantiate_singletons(&self) -> ComponentResult<()> {
        let names = self.inner.definitions.definition_names();
        info!("开始预实例化单例，共 {} 个定义", names.len());

        for name in &names {
            let definition = self.inner.definitions.merged(name)?;
            if definition.is_abstract || !definition.is_singleton() || definition.lazy_init {
                continue;
            }
            self.get_named(name).await?;
        }

        for name in &names {
            let Some(instance) = self.inner.singletons.get_singleton(name) else {
                continue;
            };
            if instance.is_null() {
                continue;
            }
            let callback = self
                .inner
                .metadata
                .descriptor_of(&instance.type_info())
                .and_then(|descriptor| descriptor.singletons_ready_callback.clone());
            if let Some(callback) = callback {
                debug!("调用单例就绪回调: {}", name);
                callback(instance).await.map_err(|e| {
                    ComponentError::creation(name.as_str(), "singletons-ready", "单例就绪回调执行失败", e)
                })?;
            }
        }

        info!(
            "预实例化完成，当前共 {} 个单例",
            self.inner.singletons.singleton_count()
        );
        Ok(())
    }

    /// 销毁全部单例
    pub async fn destroy_singletons(&self) {
        self.inner.singletons.destroy_singletons().await;
        self.inner.already_created.lock().clear();
        info!("单例已全部销毁");
    }

    /// 销毁单个单例及依赖它的组件
    pub async fn destroy_singleton(&self, name: &str) {
        self.inner.singletons.destroy_singleton(name).await;
        self.inner.already_created.lock().remove(name);
    }

    /// 从自定义作用域移除组件并执行其销毁逻辑
    pub async fn destroy_scoped(&self, name: &str) -> ComponentResult<()> {
        let definition = self.inner.definitions.merged(name)?;
        if definition.is_singleton() || definition.is_prototype() {
            return Err(DefinitionError::invalid(name, "不是自定义作用域组件").into());
        }
        self.inner.scope_check(name, &definition)?;
        let Some(scope) = self.inner.scopes.get(&definition.scope) else {
            return Ok(());
        };
        let Some(instance) = scope.remove(name) else {
            debug!("作用域 {} 中没有组件 {}", definition.scope, name);
            return Ok(());
        };

        let descriptor = self.inner.metadata.descriptor_of(&instance.type_info());
        let processors = self.inner.processors.with(ProcessorCapabilities::DESTRUCTION);
        if let Some(adapter) =
            DisposableAdapter::build(name, instance, &definition, descriptor.as_deref(), processors)?
        {
            adapter.destroy().await;
        }
        Ok(())
    }
}

#[async_trait]
impl ComponentFactory for DefaultComponentFactory {
    async fn get_component(&self, name: &str) -> ComponentResult<ComponentInstance> {
        self.get_named(name).await
    }

    async fn get_component_by_type(&self, required_type: &TypeInfo) -> ComponentResult<ComponentInstance> {
        self.get_by_type(required_type).await
    }

    fn contains_component(&self, name: &str) -> bool {
        DefaultComponentFactory::contains_component(self, name)
    }

    fn is_singleton(&self, name: &str) -> DefinitionResult<bool> {
        DefaultComponentFactory::is_singleton(self, name)
    }

    fn is_prototype(&self, name: &str) -> DefinitionResult<bool> {
        DefaultComponentFactory::is_prototype(self, name)
    }

    fn type_of(&self, name: &str) -> Option<TypeInfo> {
        DefaultComponentFactory::type_of(self, name)
    }
}

impl ListableComponentFactory for DefaultComponentFactory {
    fn definition_names(&self) -> Vec<String> {
        DefaultComponentFactory::definition_names(self)
    }

    fn names_for_type(&self, type_info: &TypeInfo, include_non_singletons: bool) -> Vec<String> {
        DefaultComponentFactory::names_for_type(self, type_info, include_non_singletons)
    }

    fn merged_definition(&self, name: &str) -> Option<Arc<ComponentDefinition>> {
        DefaultComponentFactory::merged_definition(self, name).ok()
    }
}

#[async_trait]
impl DependencyResolver for DefaultComponentFactory {
    async fn resolve_dependency(
        &self,
        descriptor: &DependencyDescriptor,
    ) -> ComponentResult<InjectionValue> {
        let ctx = ResolutionContext::current();
        self.inner.resolve_dependency_in(descriptor, &ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::DescriptorTable;
    use di_abstractions::{ConstructorDescriptor, TypeDescriptor};

    #[derive(Default)]
    struct Clock;

    fn factory() -> DefaultComponentFactory {
        let metadata = DescriptorTable::new().with(
            TypeDescriptor::of::<Clock>().constructor(ConstructorDescriptor::default_of::<Clock>()),
        );
        DefaultComponentFactory::new(Arc::new(metadata))
    }

    #[tokio::test]
    async fn test_override_resets_cached_singleton() {
        let factory = factory();
        factory
            .register_definition("clock", ComponentDefinition::of::<Clock>())
            .await
            .unwrap();
        let first = factory.get_named("clock").await.unwrap();

        factory
            .register_definition("clock", ComponentDefinition::of::<Clock>())
            .await
            .unwrap();
        let second = factory.get_named("clock").await.unwrap();
        assert!(!first.ptr_eq(&second));
    }

    #[tokio::test]
    async fn test_scope_queries() {
        let factory = factory();
        factory
            .register_definition("clock", ComponentDefinition::of::<Clock>().prototype())
            .await
            .unwrap();
        factory
            .register_singleton("external", ComponentInstance::new(Clock))
            .unwrap();

        assert_eq!(factory.is_prototype("clock"), Ok(true));
        assert_eq!(factory.is_singleton("external"), Ok(true));
        assert!(factory.is_singleton("missing").is_err());
        assert_eq!(factory.type_of("clock"), Some(TypeInfo::of::<Clock>()));
        assert_eq!(
            factory.names_for_type(&TypeInfo::of::<Clock>(), true),
            vec!["clock".to_string(), "external".to_string()]
        );
        assert_eq!(
            factory.names_for_type(&TypeInfo::of::<Clock>(), false),
            vec!["external".to_string()]
        );
        assert_eq!(factory.processor_names(), vec![AutowiredPropertyProcessor::NAME]);
    }

    #[tokio::test]
    async fn test_undefined_scope_is_reported() {
        let factory = factory();
        factory
            .register_definition("clock", ComponentDefinition::of::<Clock>().with_scope("request"))
            .await
            .unwrap();

        let err = factory.get_named("clock").await.unwrap_err();
        assert!(matches!(
            err,
            ComponentError::Definition(DefinitionError::NoSuchScope { .. })
        ));
    }
}
