//! 组件创建管线
//!
//! 一次组件查找依次经过：缓存与循环检查、depends-on、按作用域分派、实例化、
//! 早期暴露、属性填充、初始化、早期引用核对以及销毁登记。
//! 任一步失败都会撤销创建标记并清除早期引用，之后可以重新尝试创建。

use crate::container::FactoryInner;
use crate::context::ResolutionContext;
use crate::disposable::DisposableAdapter;
use crate::processor::ProcessorPipeline;
use async_trait::async_trait;
use di_abstractions::{
    Arguments, AutowireMode, ComponentDefinition, ComponentDefinitionRegistry,
    ConstructorDescriptor, DependencyCheck, DependencyDescriptor, DependencyResolver,
    DependencyShape, EvaluationContext, MetadataProvider, ParameterDescriptor, ProcessingContext,
    ProcessorCapabilities, PropertyDescriptor, SingletonComponentRegistry, TypeDescriptor,
};
use futures::future::{BoxFuture, FutureExt};
use indexmap::IndexMap;
use infrastructure_common::{
    ComponentError, ComponentInstance, ComponentResult, DefinitionError, DependencyError,
    InjectionValue, PropertyValue, PropertyValues, TypeInfo, SCOPE_SINGLETON,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, debug_span, error, trace, warn, Instrument};

/// 沿用当前创建链的依赖解析器，交给后置处理器使用
pub(crate) struct ContextualResolver<'a> {
    inner: &'a FactoryInner,
    ctx: &'a ResolutionContext,
}

#[async_trait]
impl DependencyResolver for ContextualResolver<'_> {
    async fn resolve_dependency(
        &self,
        descriptor: &DependencyDescriptor,
    ) -> ComponentResult<InjectionValue> {
        self.inner.resolve_dependency_in(descriptor, self.ctx).await
    }
}

/// 按实际类型的描述补全转换目标
pub(crate) fn attach_casts(metadata: &dyn MetadataProvider, instance: ComponentInstance) -> ComponentInstance {
    if instance.is_null() {
        return instance;
    }
    match metadata.descriptor_of(&instance.type_info()) {
        Some(descriptor) => instance.with_casts(&descriptor.casts),
        None => instance,
    }
}

fn missing_descriptor(name: &str, type_info: &TypeInfo) -> DefinitionError {
    DefinitionError::invalid(
        name,
        format!("类型 {} 没有注册类型描述", type_info.short_name()),
    )
}

impl FactoryInner {
    /// 获取组件，必要时沿当前创建链创建
    pub(crate) fn do_get_component<'a>(
        &'a self,
        name: &'a str,
        required: Option<TypeInfo>,
        explicit_args: Option<Vec<InjectionValue>>,
        ctx: &'a ResolutionContext,
    ) -> BoxFuture<'a, ComponentResult<ComponentInstance>> {
        async move {
            let has_definition = self.definitions.contains_definition(name);
            if explicit_args.is_none() || !has_definition {
                if let Some(instance) = self.singletons.get_singleton(name) {
                    trace!("返回缓存的单例: {}", name);
                    return self.check_type(name, instance, required);
                }
            }

            if ctx.is_creating_singleton(name) {
                if self.allow_circular_references() {
                    if let Some(early) = self.singletons.get_early_reference(name)? {
                        debug!("返回正在创建的单例 {} 的早期引用", name);
                        return self.check_type(name, early, required);
                    }
                }
                return Err(ComponentError::CurrentlyInCreation {
                    name: name.to_string(),
                    chain: ctx.chain_with(name),
                });
            }
            if ctx.is_creating_prototype(name) {
                return Err(ComponentError::CurrentlyInCreation {
                    name: name.to_string(),
                    chain: ctx.chain_with(name),
                });
            }

            if !has_definition {
                if let Some(parent) = &self.parent {
                    if parent.contains_component(name) {
                        trace!("委托父容器获取组件: {}", name);
                        let instance = parent.get_component(name).await?;
                        return self.check_type(name, instance, required);
                    }
                }
                return Err(DefinitionError::not_found(name).into());
            }

            self.mark_created(name);
            let result = self.get_or_create_component(name, explicit_args, ctx).await;
            match result {
                Ok(instance) => self.check_type(name, instance, required),
                Err(err) => {
                    if !self.singletons.contains_singleton(name) {
                        self.already_created.lock().remove(name);
                    }
                    Err(err)
                }
            }
        }
        .boxed()
    }

    async fn get_or_create_component(
        &self,
        name: &str,
        explicit_args: Option<Vec<InjectionValue>>,
        ctx: &ResolutionContext,
    ) -> ComponentResult<ComponentInstance> {
        let definition = self.definitions.merged(name)?;
        if definition.is_abstract && !definition.has_factory() {
            return Err(DefinitionError::AbstractWithoutFactory {
                name: name.to_string(),
            }
            .into());
        }

        for dependency in &definition.depends_on {
            if self.singletons.is_dependent(name, dependency) {
                return Err(DefinitionError::CircularDependsOn {
                    name: name.to_string(),
                    dependency: dependency.clone(),
                }
                .into());
            }
            self.singletons.register_dependent(dependency, name);
            self.do_get_component(dependency, None, None, ctx)
                .await
                .map_err(|e| {
                    ComponentError::creation(
                        name,
                        format!("depends-on:{}", dependency),
                        format!("依赖的组件 {} 创建失败", dependency),
                        e,
                    )
                })?;
        }

        if definition.is_singleton() {
            self.singletons
                .get_or_create(name, move || async move {
                    let _guard = ctx.enter_singleton(name);
                    let result = self.create_component(name, &definition, explicit_args, ctx).await;
                    if result.is_err() {
                        self.discard_failed_singleton(name).await;
                    }
                    result
                })
                .await
        } else if definition.is_prototype() {
            let _guard = ctx.enter_prototype(name)?;
            self.create_component(name, &definition, explicit_args, ctx).await
        } else {
            let scope = self.scopes.get(&definition.scope).ok_or_else(|| {
                DefinitionError::NoSuchScope {
                    name: name.to_string(),
                    scope: definition.scope.clone(),
                }
            })?;
            let scoped = Arc::clone(&definition);
            scope
                .get(
                    name,
                    Box::new(move || {
                        async move {
                            let _guard = ctx.enter_prototype(name)?;
                            self.create_component(name, &scoped, explicit_args, ctx).await
                        }
                        .boxed()
                    }),
                )
                .await
        }
    }

    /// 单例创建失败后销毁已经拿到其早期引用的依赖方，并丢弃本次记录的依赖关系
    async fn discard_failed_singleton(&self, name: &str) {
        let dependents = self.singletons.created_dependents(name);
        if !dependents.is_empty() {
            warn!("单例 {} 创建失败，销毁依赖它的组件: {:?}", name, dependents);
        }
        self.singletons.destroy_singleton(name).await;
        for dependent in &dependents {
            self.already_created.lock().remove(dependent);
        }
    }

    fn check_type(
        &self,
        name: &str,
        instance: ComponentInstance,
        required: Option<TypeInfo>,
    ) -> ComponentResult<ComponentInstance> {
        match required {
            Some(required) if !instance.is_null() && !instance.can_cast_to(&required) => {
                Err(DependencyError::TypeMismatch {
                    name: name.to_string(),
                    required: required.name.to_string(),
                    actual: instance.type_info().name.to_string(),
                }
                .into())
            }
            _ => Ok(instance),
        }
    }

    async fn create_component(
        &self,
        name: &str,
        definition: &ComponentDefinition,
        explicit_args: Option<Vec<InjectionValue>>,
        ctx: &ResolutionContext,
    ) -> ComponentResult<ComponentInstance> {
        let span = debug_span!("create_component", component = name, depth = ctx.depth());
        let result = ctx
            .scope(self.run_pipeline(name, definition, explicit_args, ctx))
            .instrument(span)
            .await;

        result.map_err(|err| {
            if ctx.depth() <= 1 {
                error!("组件 {} 创建失败: {}", name, err);
            } else {
                debug!("组件 {} 创建失败: {}", name, err);
            }
            if err.component_name() == Some(name) {
                err
            } else {
                ComponentError::creation(name, "creation", "组件创建失败", err)
            }
        })
    }

    async fn run_pipeline(
        &self,
        name: &str,
        definition: &ComponentDefinition,
        explicit_args: Option<Vec<InjectionValue>>,
        ctx: &ResolutionContext,
    ) -> ComponentResult<ComponentInstance> {
        let resolver = ContextualResolver { inner: self, ctx };
        let processing = !definition.skips_processing();
        let declared = definition
            .type_info
            .and_then(|t| self.metadata.descriptor_of(&t));
        debug!("开始创建组件 {}: [{}]", name, definition.summary());

        {
            let pctx = ProcessingContext {
                name,
                definition,
                descriptor: declared.as_deref(),
                resolver: &resolver,
            };
            if processing {
                if let Some(instance) = self.processors.before_instantiation(&pctx).await? {
                    let instance = self.attach_casts(instance);
                    let instance = self.processors.after_initialization(&pctx, instance).await?;
                    return Ok(self.attach_casts(instance));
                }
            }
        }

        let raw = self
            .instantiate(name, definition, declared.as_deref(), explicit_args, ctx, &resolver)
            .await?;
        let raw = self.attach_casts(raw);

        let actual = if raw.is_null() {
            declared.clone()
        } else {
            self.metadata
                .descriptor_of(&raw.type_info())
                .or_else(|| declared.clone())
        };
        let pctx = ProcessingContext {
            name,
            definition,
            descriptor: actual.as_deref(),
            resolver: &resolver,
        };

        let early_exposure = definition.is_singleton()
            && self.allow_circular_references()
            && self.singletons.is_currently_in_creation(name)
            && !raw.is_null();
        if early_exposure {
            trace!("提前暴露单例 {} 以解决循环引用", name);
            let processors = if processing {
                self.processors.with(ProcessorCapabilities::SMART_INSTANTIATION)
            } else {
                Vec::new()
            };
            let metadata = Arc::clone(&self.metadata);
            let early_name = name.to_string();
            let early_raw = raw.clone();
            self.singletons.add_early_factory(
                name,
                Box::new(move || {
                    ProcessorPipeline::early_reference(&processors, &early_name, early_raw)
                        .map(|instance| attach_casts(metadata.as_ref(), instance))
                }),
            );
        }

        self.populate(&pctx, &raw, processing, ctx).await?;
        let exposed = self.initialize(&pctx, raw.clone(), processing).await?;
        let exposed = if early_exposure {
            self.reconcile_early_reference(name, &raw, exposed)?
        } else {
            exposed
        };

        self.register_disposable(name, definition, &exposed, processing)?;
        debug!("组件创建完成: {}", name);
        Ok(exposed)
    }

    // ---- 实例化 ----

    async fn instantiate(
        &self,
        name: &str,
        definition: &ComponentDefinition,
        descriptor: Option<&TypeDescriptor>,
        explicit_args: Option<Vec<InjectionValue>>,
        ctx: &ResolutionContext,
        resolver: &ContextualResolver<'_>,
    ) -> ComponentResult<ComponentInstance> {
        if let Some(supplier) = &definition.instance_supplier {
            trace!("通过实例提供者创建组件: {}", name);
            return supplier
                .get()
                .await
                .map_err(|e| ComponentError::creation(name, "supplier", "实例提供者执行失败", e));
        }
        if definition.factory_method_name.is_some() {
            return self
                .instantiate_with_factory_method(name, definition, explicit_args, ctx)
                .await;
        }
        self.autowire_constructor(name, definition, descriptor, explicit_args, ctx, resolver)
            .await
    }

    async fn instantiate_with_factory_method(
        &self,
        name: &str,
        definition: &ComponentDefinition,
        explicit_args: Option<Vec<InjectionValue>>,
        ctx: &ResolutionContext,
    ) -> ComponentResult<ComponentInstance> {
        let Some(method_name) = definition.factory_method_name.as_deref() else {
            return Err(DefinitionError::invalid(name, "缺少工厂方法").into());
        };

        let (host, host_type) = match &definition.factory_component_name {
            Some(host_name) if host_name == name => {
                return Err(DefinitionError::invalid(name, "工厂组件不能是组件自身").into());
            }
            Some(host_name) => {
                let host = self.do_get_component(host_name, None, None, ctx).await?;
                self.singletons.register_dependent(host_name, name);
                if host.is_null() {
                    return Err(DefinitionError::invalid(
                        name,
                        format!("工厂组件 {} 的实例为空", host_name),
                    )
                    .into());
                }
                let host_type = host.type_info();
                (Some(host), host_type)
            }
            None => match definition.type_info {
                Some(type_info) => (None, type_info),
                None => {
                    return Err(DefinitionError::invalid(name, "静态工厂方法缺少声明类型").into())
                }
            },
        };

        let descriptor = self
            .metadata
            .descriptor_of(&host_type)
            .ok_or_else(|| missing_descriptor(name, &host_type))?;
        let method = descriptor.method_named(method_name).ok_or_else(|| {
            DefinitionError::invalid(
                name,
                format!("类型 {} 没有工厂方法 {}", host_type.short_name(), method_name),
            )
        })?;
        if method.is_static && host.is_some() {
            return Err(DefinitionError::invalid(
                name,
                format!("工厂方法 {} 是静态方法，不能通过工厂组件调用", method_name),
            )
            .into());
        }
        if !method.is_static && host.is_none() {
            return Err(DefinitionError::invalid(
                name,
                format!("工厂方法 {} 需要工厂组件实例", method_name),
            )
            .into());
        }

        let args = self
            .resolve_arguments(name, definition, &method.parameters, explicit_args, ctx)
            .await?;
        trace!("调用工厂方法 {}.{}", host_type.short_name(), method_name);
        let produced = method.invoke(host, args).await.map_err(|e| {
            ComponentError::creation(
                name,
                format!("factory-method:{}", method_name),
                "工厂方法执行失败",
                e,
            )
        })?;
        Ok(produced.unwrap_or_else(ComponentInstance::null))
    }

    async fn autowire_constructor(
        &self,
        name: &str,
        definition: &ComponentDefinition,
        descriptor: Option<&TypeDescriptor>,
        explicit_args: Option<Vec<InjectionValue>>,
        ctx: &ResolutionContext,
        resolver: &ContextualResolver<'_>,
    ) -> ComponentResult<ComponentInstance> {
        let Some(type_info) = definition.type_info else {
            return Err(DefinitionError::invalid(name, "缺少声明类型").into());
        };
        let Some(descriptor) = descriptor else {
            return Err(missing_descriptor(name, &type_info).into());
        };

        let pctx = ProcessingContext {
            name,
            definition,
            descriptor: Some(descriptor),
            resolver,
        };
        let candidates = self.constructor_candidates(&pctx, descriptor, explicit_args.as_ref())?;

        let last = candidates.len().saturating_sub(1);
        for (position, constructor) in candidates.into_iter().enumerate() {
            let args = match self
                .resolve_arguments(name, definition, &constructor.parameters, explicit_args.clone(), ctx)
                .await
            {
                Ok(args) => args,
                Err(err) if position < last && err.dependency_error().is_some() => {
                    debug!(
                        "组件 {} 的 {} 参数构造器无法满足，尝试下一个: {}",
                        name,
                        constructor.arity(),
                        err
                    );
                    continue;
                }
                Err(err) => return Err(err),
            };
            trace!("调用组件 {} 的 {} 参数构造器", name, constructor.arity());
            return constructor
                .invoke(args)
                .await
                .map_err(|e| ComponentError::creation(name, "constructor", "构造器执行失败", e));
        }
        Err(DefinitionError::invalid(name, "没有可用的构造器").into())
    }

    /// 按尝试顺序排列的候选构造器
    ///
    /// 处理器提名的构造器优先；给出了参数时尝试全部能容纳这些参数的构造器；
    /// 否则依次取唯一的、首选的、无参的构造器。多个候选按参数个数降序尝试。
    fn constructor_candidates<'d>(
        &self,
        pctx: &ProcessingContext<'_>,
        descriptor: &'d TypeDescriptor,
        explicit_args: Option<&Vec<InjectionValue>>,
    ) -> ComponentResult<Vec<&'d ConstructorDescriptor>> {
        let name = pctx.name;
        let constructors = &descriptor.constructors;
        if constructors.is_empty() {
            return Err(DefinitionError::invalid(
                name,
                format!("类型 {} 没有声明构造器", descriptor.type_info.short_name()),
            )
            .into());
        }

        let nominated = if pctx.definition.skips_processing() {
            None
        } else {
            self.processors.candidate_constructors(pctx)
        };
        let mut candidates: Vec<&ConstructorDescriptor> = match nominated {
            Some(indices) => indices
                .into_iter()
                .filter_map(|index| constructors.get(index))
                .collect(),
            None => {
                let given = explicit_args.map_or(0, Vec::len) + pctx.definition.constructor_args.len();
                if given > 0 {
                    constructors.iter().filter(|c| c.arity() >= given).collect()
                } else if let [only] = constructors.as_slice() {
                    vec![only]
                } else {
                    let primaries: Vec<_> = constructors.iter().filter(|c| c.primary).collect();
                    match primaries.as_slice() {
                        [only] => vec![*only],
                        [] => constructors.iter().filter(|c| c.arity() == 0).take(1).collect(),
                        _ => {
                            return Err(DefinitionError::invalid(name, "存在多个首选构造器").into())
                        }
                    }
                }
            }
        };

        if candidates.is_empty() {
            return Err(DefinitionError::invalid(
                name,
                format!(
                    "类型 {} 有 {} 个构造器，无法确定使用哪一个",
                    descriptor.type_info.short_name(),
                    constructors.len()
                ),
            )
            .into());
        }
        candidates.sort_by_key(|c| std::cmp::Reverse(c.arity()));
        Ok(candidates)
    }

    /// 依次取显式参数、定义中的构造参数、按类型与名称解析的依赖
    async fn resolve_arguments(
        &self,
        name: &str,
        definition: &ComponentDefinition,
        parameters: &[ParameterDescriptor],
        explicit_args: Option<Vec<InjectionValue>>,
        ctx: &ResolutionContext,
    ) -> ComponentResult<Arguments> {
        let mut explicit = explicit_args.map(Vec::into_iter);
        let mut args = Arguments::new();

        for (index, parameter) in parameters.iter().enumerate() {
            let value = if let Some(value) = explicit.as_mut().and_then(|values| values.next()) {
                self.coerce(name, &parameter.name, parameter.type_info, parameter.shape, value)?
            } else if let Some(declared) = definition
                .constructor_args
                .indexed(index)
                .or_else(|| definition.constructor_args.named(&parameter.name))
            {
                let resolved = self
                    .resolve_value(name, definition, declared.clone(), ctx)
                    .await?;
                self.coerce(name, &parameter.name, parameter.type_info, parameter.shape, resolved)?
            } else {
                let dependency = DependencyDescriptor::new(parameter.type_info, parameter.shape)
                    .requested_by(name)
                    .named(parameter.name.clone())
                    .with_required(parameter.required)
                    .with_qualifier(parameter.qualifier.clone());
                self.resolve_dependency_in(&dependency, ctx).await?
            };
            args.push(parameter.name.clone(), value);
        }
        Ok(args)
    }

    // ---- 属性值 ----

    /// 把声明式属性值解析为注入值
    fn resolve_value<'a>(
        &'a self,
        name: &'a str,
        definition: &'a ComponentDefinition,
        value: PropertyValue,
        ctx: &'a ResolutionContext,
    ) -> BoxFuture<'a, ComponentResult<InjectionValue>> {
        async move {
            match value {
                PropertyValue::Null => Ok(InjectionValue::Null),
                PropertyValue::Instance(instance) => Ok(InjectionValue::Single(instance)),
                PropertyValue::Literal(literal) => Ok(InjectionValue::Literal(literal)),
                PropertyValue::Resolved(resolved) => Ok(resolved),
                PropertyValue::Expression(expression) => self.evaluate(name, definition, &expression),
                PropertyValue::Reference(target) => {
                    let instance = self.do_get_component(&target, None, None, ctx).await?;
                    self.singletons.register_dependent(&target, name);
                    Ok(InjectionValue::Single(instance))
                }
                PropertyValue::List(items) => {
                    let mut resolved = Vec::with_capacity(items.len());
                    for item in items {
                        resolved.push(self.resolve_value(name, definition, item, ctx).await?);
                    }
                    combine_list(name, resolved)
                }
                PropertyValue::Map(entries) => {
                    let mut resolved = IndexMap::with_capacity(entries.len());
                    for (key, item) in entries {
                        let value = self.resolve_value(name, definition, item, ctx).await?;
                        resolved.insert(key, value);
                    }
                    combine_map(name, resolved)
                }
            }
        }
        .boxed()
    }

    /// 对表达式求值，没有求值器时按字符串字面量处理
    fn evaluate(
        &self,
        name: &str,
        definition: &ComponentDefinition,
        expression: &str,
    ) -> ComponentResult<InjectionValue> {
        let Some(evaluator) = self.expression_evaluator() else {
            return Ok(InjectionValue::Literal(Value::String(expression.to_string())));
        };
        let scope = if definition.scope.is_empty() {
            SCOPE_SINGLETON
        } else {
            definition.scope.as_str()
        };
        let context = EvaluationContext {
            component_name: name,
            scope,
        };
        evaluator
            .evaluate(expression, &context)
            .map(|value| value.map_or(InjectionValue::Null, InjectionValue::Literal))
            .map_err(|e| {
                ComponentError::creation(
                    name,
                    format!("expression:{}", expression),
                    "表达式求值失败",
                    e,
                )
            })
    }

    /// 把解析结果转换为注入点要求的形态与类型
    fn coerce(
        &self,
        name: &str,
        target: &str,
        type_info: TypeInfo,
        shape: DependencyShape,
        value: InjectionValue,
    ) -> ComponentResult<InjectionValue> {
        if shape != DependencyShape::Value {
            return Ok(value);
        }
        let value = match value {
            InjectionValue::List(items) if items.is_empty() => InjectionValue::Literal(Value::Array(Vec::new())),
            InjectionValue::Map(items) if items.is_empty() => {
                InjectionValue::Literal(Value::Object(serde_json::Map::new()))
            }
            InjectionValue::Literal(literal) => InjectionValue::Literal(literal),
            other => return Ok(other),
        };
        let from = TypeInfo::of::<Value>();
        self.conversion_service()
            .convert(value, &type_info, Some(&from))
            .map_err(|e| ComponentError::PropertyAssignment {
                name: name.to_string(),
                property: target.to_string(),
                source: e.into(),
            })
    }

    // ---- 属性填充 ----

    async fn populate(
        &self,
        pctx: &ProcessingContext<'_>,
        instance: &ComponentInstance,
        processing: bool,
        ctx: &ResolutionContext,
    ) -> ComponentResult<()> {
        let name = pctx.name;
        let definition = pctx.definition;
        if instance.is_null() {
            if !definition.property_values.is_empty() {
                return Err(DefinitionError::invalid(name, "无法为空实例设置属性").into());
            }
            return Ok(());
        }

        if processing && !self.processors.after_instantiation(pctx, instance).await? {
            return Ok(());
        }

        let mut values = definition.property_values.clone();
        match definition.autowire_mode {
            AutowireMode::ByName => self.autowire_by_name(pctx, &mut values, ctx).await?,
            AutowireMode::ByType => self.autowire_by_type(pctx, &mut values, ctx).await?,
            AutowireMode::No => {}
        }

        if processing {
            values = self.processors.process_properties(pctx, instance, values).await?;
        }
        self.check_dependencies(pctx, &values)?;
        self.apply_property_values(pctx, instance, values, ctx).await
    }

    /// 尚未赋值、非简单值、非可选且类型未被忽略的属性
    fn unsatisfied_properties<'d>(
        &self,
        descriptor: Option<&'d TypeDescriptor>,
        values: &PropertyValues,
    ) -> Vec<&'d PropertyDescriptor> {
        let Some(descriptor) = descriptor else {
            return Vec::new();
        };
        descriptor
            .properties
            .iter()
            .filter(|p| {
                !values.contains(&p.name)
                    && !p.is_simple()
                    && p.shape != DependencyShape::Optional
                    && !self.metadata.is_primitive_like(&p.type_info)
                    && !self.candidates.is_ignored(&p.type_info, self.metadata.as_ref())
            })
            .collect()
    }

    async fn autowire_by_name(
        &self,
        pctx: &ProcessingContext<'_>,
        values: &mut PropertyValues,
        ctx: &ResolutionContext,
    ) -> ComponentResult<()> {
        let name = pctx.name;
        for property in self.unsatisfied_properties(pctx.descriptor, values) {
            if property.shape != DependencyShape::Single || !self.contains_component(&property.name) {
                trace!("按名称注入时跳过属性 {}.{}", name, property.name);
                continue;
            }
            let instance = self.do_get_component(&property.name, None, None, ctx).await?;
            self.singletons.register_dependent(&property.name, name);
            debug!("按名称把组件 {} 注入到 {}", property.name, name);
            values.add(
                property.name.clone(),
                PropertyValue::Resolved(InjectionValue::Single(instance)),
            );
        }
        Ok(())
    }

    async fn autowire_by_type(
        &self,
        pctx: &ProcessingContext<'_>,
        values: &mut PropertyValues,
        ctx: &ResolutionContext,
    ) -> ComponentResult<()> {
        let name = pctx.name;
        for property in self.unsatisfied_properties(pctx.descriptor, values) {
            let dependency = DependencyDescriptor::new(property.type_info, property.shape)
                .requested_by(name)
                .named(property.name.clone())
                .with_required(false)
                .with_qualifier(property.qualifier.clone());
            let value = self.resolve_dependency_in(&dependency, ctx).await?;
            if value.is_null() {
                trace!("按类型注入时属性 {}.{} 没有候选", name, property.name);
                continue;
            }
            values.add(property.name.clone(), PropertyValue::Resolved(value));
        }
        Ok(())
    }

    fn check_dependencies(&self, pctx: &ProcessingContext<'_>, values: &PropertyValues) -> ComponentResult<()> {
        let check = pctx.definition.dependency_check;
        if check == DependencyCheck::None {
            return Ok(());
        }
        let Some(descriptor) = pctx.descriptor else {
            return Ok(());
        };
        for property in &descriptor.properties {
            if values.contains(&property.name)
                || property.shape == DependencyShape::Optional
                || self.candidates.is_ignored(&property.type_info, self.metadata.as_ref())
            {
                continue;
            }
            let simple = property.is_simple() || self.metadata.is_primitive_like(&property.type_info);
            let unsatisfied = match check {
                DependencyCheck::All => true,
                DependencyCheck::Simple => simple,
                DependencyCheck::Objects => !simple,
                DependencyCheck::None => false,
            };
            if unsatisfied {
                return Err(DependencyError::UnsatisfiedProperty {
                    name: pctx.name.to_string(),
                    property: property.name.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    async fn apply_property_values(
        &self,
        pctx: &ProcessingContext<'_>,
        instance: &ComponentInstance,
        values: PropertyValues,
        ctx: &ResolutionContext,
    ) -> ComponentResult<()> {
        let name = pctx.name;
        for (property_name, value) in values {
            let Some(property) = pctx.descriptor.and_then(|d| d.property_named(&property_name)) else {
                return Err(ComponentError::PropertyAssignment {
                    name: name.to_string(),
                    source: format!(
                        "类型 {} 没有可写属性 {}",
                        instance.type_info().short_name(),
                        property_name
                    )
                    .into(),
                    property: property_name,
                });
            };
            let resolved = self.resolve_value(name, pctx.definition, value, ctx).await?;
            let resolved = self.coerce(name, &property_name, property.type_info, property.shape, resolved)?;
            property
                .apply(instance, resolved)
                .map_err(|e| ComponentError::PropertyAssignment {
                    name: name.to_string(),
                    property: property_name.clone(),
                    source: e.into(),
                })?;
            trace!("设置属性 {}.{}", name, property_name);
        }
        Ok(())
    }

    // ---- 初始化与收尾 ----

    async fn initialize(
        &self,
        pctx: &ProcessingContext<'_>,
        instance: ComponentInstance,
        processing: bool,
    ) -> ComponentResult<ComponentInstance> {
        let name = pctx.name;
        let mut current = instance;
        if processing {
            current = self.processors.before_initialization(pctx, current).await?;
            current = self.attach_casts(current);
        }

        if !current.is_null() {
            let descriptor = self.metadata.descriptor_of(&current.type_info());
            if let Some(callback) = descriptor.as_ref().and_then(|d| d.init_callback.clone()) {
                callback(current.clone())
                    .await
                    .map_err(|e| ComponentError::creation(name, "init", "初始化回调执行失败", e))?;
            }
            for method_name in &pctx.definition.init_method_names {
                let method = descriptor
                    .as_deref()
                    .and_then(|d| d.method_named(method_name))
                    .ok_or_else(|| {
                        DefinitionError::invalid(
                            name,
                            format!(
                                "类型 {} 没有初始化方法 {}",
                                current.type_info().short_name(),
                                method_name
                            ),
                        )
                    })?;
                method
                    .invoke(Some(current.clone()), Arguments::new())
                    .await
                    .map_err(|e| {
                        ComponentError::creation(
                            name,
                            format!("init-method:{}", method_name),
                            "初始化方法执行失败",
                            e,
                        )
                    })?;
            }
        }

        if processing {
            current = self.processors.after_initialization(pctx, current).await?;
        }
        Ok(self.attach_casts(current))
    }

    /// 核对早期引用：最终实例被替换时，已拿到原始实例的依赖方会导致失败
    fn reconcile_early_reference(
        &self,
        name: &str,
        raw: &ComponentInstance,
        exposed: ComponentInstance,
    ) -> ComponentResult<ComponentInstance> {
        let Some(early) = self.singletons.early_singleton(name) else {
            return Ok(exposed);
        };
        if exposed.ptr_eq(raw) {
            return Ok(early);
        }

        let dependents: Vec<String> = self
            .singletons
            .dependents_of(name)
            .into_iter()
            .filter(|dependent| self.is_created(dependent))
            .collect();
        if dependents.is_empty() {
            return Ok(exposed);
        }
        if self.allow_raw_injection_despite_wrapping() {
            warn!(
                "组件 {} 的原始实例已注入到 {:?}，最终实例却被替换",
                name, dependents
            );
            return Ok(exposed);
        }
        Err(ComponentError::RawInjectionDespiteWrapping {
            name: name.to_string(),
            dependents,
        })
    }

    fn register_disposable(
        &self,
        name: &str,
        definition: &ComponentDefinition,
        instance: &ComponentInstance,
        processing: bool,
    ) -> ComponentResult<()> {
        if definition.is_prototype() || instance.is_null() {
            return Ok(());
        }
        let processors = if processing {
            self.processors.with(ProcessorCapabilities::DESTRUCTION)
        } else {
            Vec::new()
        };
        let descriptor = self.metadata.descriptor_of(&instance.type_info());
        let Some(adapter) =
            DisposableAdapter::build(name, instance.clone(), definition, descriptor.as_deref(), processors)?
        else {
            return Ok(());
        };

        if definition.is_singleton() {
            self.singletons.register_disposable(name, adapter.into_callback());
        } else if let Some(scope) = self.scopes.get(&definition.scope) {
            scope.register_destruction_callback(name, adapter.into_callback());
        }
        trace!("登记组件销毁动作: {}", name);
        Ok(())
    }
}

fn combine_list(name: &str, items: Vec<InjectionValue>) -> ComponentResult<InjectionValue> {
    if items.is_empty() {
        return Ok(InjectionValue::List(Vec::new()));
    }
    if items
        .iter()
        .all(|item| matches!(item, InjectionValue::Single(_) | InjectionValue::Null))
    {
        return Ok(InjectionValue::List(
            items.into_iter().filter_map(InjectionValue::into_instance).collect(),
        ));
    }
    let mut literals = Vec::with_capacity(items.len());
    for item in items {
        match item {
            InjectionValue::Literal(literal) => literals.push(literal),
            InjectionValue::Null => literals.push(Value::Null),
            other => {
                return Err(DefinitionError::invalid(
                    name,
                    format!("列表中不能混合组件与 {} 值", other.kind()),
                )
                .into())
            }
        }
    }
    Ok(InjectionValue::Literal(Value::Array(literals)))
}

fn combine_map(name: &str, entries: IndexMap<String, InjectionValue>) -> ComponentResult<InjectionValue> {
    if entries.is_empty() {
        return Ok(InjectionValue::Map(IndexMap::new()));
    }
    if entries
        .values()
        .all(|item| matches!(item, InjectionValue::Single(_) | InjectionValue::Null))
    {
        return Ok(InjectionValue::Map(
            entries
                .into_iter()
                .filter_map(|(key, item)| item.into_instance().map(|instance| (key, instance)))
                .collect(),
        ));
    }
    let mut object = serde_json::Map::with_capacity(entries.len());
    for (key, item) in entries {
        match item {
            InjectionValue::Literal(literal) => {
                object.insert(key, literal);
            }
            InjectionValue::Null => {
                object.insert(key, Value::Null);
            }
            other => {
                return Err(DefinitionError::invalid(
                    name,
                    format!("映射中不能混合组件与 {} 值", other.kind()),
                )
                .into())
            }
        }
    }
    Ok(InjectionValue::Literal(Value::Object(object)))
}
