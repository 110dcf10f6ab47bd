//! 候选解析
//!
//! 根据依赖描述符枚举可注入的组件名称，并在多个候选之间做出选择：
//! 首选标记优先，其次是与注入点同名的组件，再次是优先级最高的组件，
//! 最后才是预先登记的可注入值。多值形态则把全部候选按要求的形态包装返回。

use crate::container::FactoryInner;
use crate::context::ResolutionContext;
use di_abstractions::{
    ComponentDefinition, ComponentDefinitionRegistry, ComponentFactory, DependencyDescriptor,
    DependencyShape, ListableComponentFactory, MetadataProvider, SingletonComponentRegistry,
};
use futures::future::{BoxFuture, FutureExt};
use indexmap::IndexMap;
use infrastructure_common::{
    ComponentError, ComponentInstance, ComponentResult, DependencyError, DependencyResult,
    InjectionValue, TypeInfo,
};
use parking_lot::RwLock;
use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace};

/// 忽略的依赖类型与预先登记的可注入值
#[derive(Default)]
pub(crate) struct CandidateResolver {
    ignored_types: RwLock<HashSet<TypeInfo>>,
    ignored_interfaces: RwLock<HashSet<TypeInfo>>,
    resolvable: RwLock<Vec<(TypeInfo, ComponentInstance)>>,
}

impl CandidateResolver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register_ignored_dependency(&self, type_info: TypeInfo) {
        debug!("忽略依赖类型: {}", type_info.short_name());
        self.ignored_types.write().insert(type_info);
    }

    pub(crate) fn register_ignored_interface(&self, type_info: TypeInfo) {
        debug!("忽略依赖接口: {}", type_info.short_name());
        self.ignored_interfaces.write().insert(type_info);
    }

    pub(crate) fn register_resolvable_dependency(&self, type_info: TypeInfo, instance: ComponentInstance) {
        debug!("登记可注入值: {}", type_info.short_name());
        let mut resolvable = self.resolvable.write();
        resolvable.retain(|(existing, _)| *existing != type_info);
        resolvable.push((type_info, instance));
    }

    /// 类型本身被忽略，或可以赋值给被忽略的接口
    pub(crate) fn is_ignored(&self, type_info: &TypeInfo, metadata: &dyn MetadataProvider) -> bool {
        if self.ignored_types.read().contains(type_info) {
            return true;
        }
        self.ignored_interfaces
            .read()
            .iter()
            .any(|interface| metadata.is_assignable_to(type_info, interface))
    }

    pub(crate) fn resolvable_for(&self, type_info: &TypeInfo) -> Option<ComponentInstance> {
        self.resolvable
            .read()
            .iter()
            .find(|(key, instance)| key == type_info || instance.can_cast_to(type_info))
            .map(|(_, instance)| instance.clone())
    }
}

/// 参与单值选择的候选
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutowireCandidate {
    /// 组件名称
    pub name: String,
    /// 是否为首选
    pub primary: bool,
    /// 声明的优先级，数值越大越优先
    pub priority: Option<i32>,
}

impl AutowireCandidate {
    /// 创建候选
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary: false,
            priority: None,
        }
    }

    /// 标记为首选
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }
}

fn not_unique(descriptor: &DependencyDescriptor, candidates: Vec<String>) -> DependencyError {
    DependencyError::NotUnique {
        type_name: descriptor.required_type.name.to_string(),
        requested_by: descriptor.requesting_component.clone(),
        candidates,
    }
}

fn no_matching(descriptor: &DependencyDescriptor) -> DependencyError {
    DependencyError::NoMatchingComponent {
        type_name: descriptor.required_type.name.to_string(),
        requested_by: descriptor.requesting_component.clone(),
        injection_point: descriptor.injection_point(),
    }
}

/// 在多个同类型候选中选出一个
///
/// 依次比较首选标记、注入点名称与优先级；多个首选或最高优先级并列时报错，
/// 全部规则都无法区分时返回 `None`。
pub fn determine_autowire_candidate(
    candidates: &[AutowireCandidate],
    descriptor: &DependencyDescriptor,
) -> DependencyResult<Option<String>> {
    let primaries: Vec<&AutowireCandidate> = candidates.iter().filter(|c| c.primary).collect();
    match primaries.as_slice() {
        [only] => return Ok(Some(only.name.clone())),
        [] => {}
        many => {
            return Err(not_unique(
                descriptor,
                many.iter().map(|c| c.name.clone()).collect(),
            ))
        }
    }

    if let Some(dependency_name) = &descriptor.dependency_name {
        if let Some(matched) = candidates.iter().find(|c| &c.name == dependency_name) {
            return Ok(Some(matched.name.clone()));
        }
    }

    let Some(highest) = candidates.iter().filter_map(|c| c.priority).max() else {
        return Ok(None);
    };
    let top: Vec<&AutowireCandidate> = candidates
        .iter()
        .filter(|c| c.priority == Some(highest))
        .collect();
    match top.as_slice() {
        [only] => Ok(Some(only.name.clone())),
        many => Err(not_unique(
            descriptor,
            many.iter().map(|c| c.name.clone()).collect(),
        )),
    }
}

impl FactoryInner {
    /// 在给定的创建链中解析依赖
    pub(crate) fn resolve_dependency_in<'a>(
        &'a self,
        descriptor: &'a DependencyDescriptor,
        ctx: &'a ResolutionContext,
    ) -> BoxFuture<'a, ComponentResult<InjectionValue>> {
        async move {
            if self
                .candidates
                .is_ignored(&descriptor.required_type, self.metadata.as_ref())
            {
                trace!("依赖类型已被忽略: {}", descriptor.required_type.short_name());
                if descriptor.shape == DependencyShape::Single && descriptor.is_required() {
                    return Err(no_matching(descriptor).into());
                }
                return Ok(InjectionValue::Null);
            }

            match descriptor.shape {
                DependencyShape::Deferred => Ok(InjectionValue::Deferred(
                    self.provider_for(descriptor.clone()),
                )),
                DependencyShape::Provider => Ok(InjectionValue::Provider(
                    self.provider_for(descriptor.clone()),
                )),
                DependencyShape::Optional => {
                    let single = descriptor
                        .clone()
                        .with_shape(DependencyShape::Single)
                        .with_required(false);
                    let value = self.do_resolve(&single, ctx).await?;
                    Ok(InjectionValue::Optional(value.into_instance()))
                }
                DependencyShape::Value => {
                    if descriptor.is_required() {
                        Err(no_matching(descriptor).into())
                    } else {
                        Ok(InjectionValue::Null)
                    }
                }
                _ => self.do_resolve(descriptor, ctx).await,
            }
        }
        .boxed()
    }

    async fn do_resolve(
        &self,
        descriptor: &DependencyDescriptor,
        ctx: &ResolutionContext,
    ) -> ComponentResult<InjectionValue> {
        if let Some(lookup_name) = &descriptor.lookup_name {
            if !descriptor.shape.is_multiple()
                && self.contains_component(lookup_name)
                && self.type_matches(lookup_name, &descriptor.required_type)
                && !self.is_self_reference(descriptor, lookup_name)
                && self.is_autowire_candidate(lookup_name, descriptor)
            {
                let instance = self.candidate_instance(lookup_name, descriptor, ctx).await?;
                if !instance.is_null() {
                    return Ok(InjectionValue::Single(instance));
                }
            }
        }

        if descriptor.shape.is_multiple() {
            return self.resolve_multiple(descriptor, ctx).await;
        }

        let names = self.find_autowire_candidates(descriptor);
        let selected = match names.as_slice() {
            [] => None,
            [only] => Some(only.clone()),
            many => {
                let candidates: Vec<AutowireCandidate> = many
                    .iter()
                    .map(|name| AutowireCandidate {
                        name: name.clone(),
                        primary: self.is_primary(name),
                        priority: self.priority_of(name, None),
                    })
                    .collect();
                determine_autowire_candidate(&candidates, descriptor)?
            }
        };

        if let Some(name) = selected {
            let instance = self.candidate_instance(&name, descriptor, ctx).await?;
            if !instance.is_null() {
                return Ok(InjectionValue::Single(instance));
            }
            debug!("候选 {} 的实例为空，视为缺失", name);
        } else if let Some(resolvable) = self.candidates.resolvable_for(&descriptor.required_type) {
            trace!(
                "使用预先登记的可注入值: {}",
                descriptor.required_type.short_name()
            );
            return Ok(InjectionValue::Single(resolvable));
        } else if names.len() > 1 {
            if descriptor.is_required() {
                return Err(not_unique(descriptor, names).into());
            }
            return Ok(InjectionValue::Null);
        }

        if descriptor.is_required() {
            Err(no_matching(descriptor).into())
        } else {
            Ok(InjectionValue::Null)
        }
    }

    async fn resolve_multiple(
        &self,
        descriptor: &DependencyDescriptor,
        ctx: &ResolutionContext,
    ) -> ComponentResult<InjectionValue> {
        let names = self.find_autowire_candidates(descriptor);
        let mut entries: Vec<(String, ComponentInstance)> = Vec::with_capacity(names.len());
        for name in names {
            match self.candidate_instance(&name, descriptor, ctx).await {
                Ok(instance) if instance.is_null() => continue,
                Ok(instance) => entries.push((name, instance)),
                Err(err) if err.is_currently_in_creation() => {
                    debug!("跳过正在创建中的候选 {}: {}", name, err);
                }
                Err(err) => return Err(err),
            }
        }

        if entries.is_empty() {
            return if descriptor.is_required() {
                Err(no_matching(descriptor).into())
            } else {
                Ok(InjectionValue::Null)
            };
        }

        match descriptor.shape {
            DependencyShape::Map => Ok(InjectionValue::Map(entries.into_iter().collect::<IndexMap<_, _>>())),
            DependencyShape::Set => {
                let mut unique: Vec<ComponentInstance> = Vec::with_capacity(entries.len());
                for (_, instance) in self.sort_by_priority(entries) {
                    if !unique.iter().any(|existing| existing.ptr_eq(&instance)) {
                        unique.push(instance);
                    }
                }
                Ok(InjectionValue::List(unique))
            }
            _ => Ok(InjectionValue::List(
                self.sort_by_priority(entries)
                    .into_iter()
                    .map(|(_, instance)| instance)
                    .collect(),
            )),
        }
    }

    /// 按优先级降序排列，未声明优先级的排在最后，其余保持注册顺序
    fn sort_by_priority(&self, entries: Vec<(String, ComponentInstance)>) -> Vec<(String, ComponentInstance)> {
        let mut keyed: Vec<(Option<i32>, (String, ComponentInstance))> = entries
            .into_iter()
            .map(|(name, instance)| (self.priority_of(&name, Some(&instance)), (name, instance)))
            .collect();
        keyed.sort_by_key(|(priority, _)| Reverse(priority.map_or(i64::MIN, i64::from)));
        keyed.into_iter().map(|(_, entry)| entry).collect()
    }

    /// 全部类型匹配且可参与自动注入的候选名称，本容器在前，父容器在后
    pub(crate) fn find_autowire_candidates(&self, descriptor: &DependencyDescriptor) -> Vec<String> {
        let required = &descriptor.required_type;
        let mut names = self.local_names_for_type(required, true);
        if let Some(parent) = &self.parent {
            for name in parent.names_for_type(required, true) {
                if !self.contains_local(&name) && !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names.retain(|candidate| {
            !self.is_self_reference(descriptor, candidate)
                && self.is_autowire_candidate(candidate, descriptor)
        });
        trace!(
            "类型 {} 的候选: {:?}",
            required.short_name(),
            names
        );
        names
    }

    fn definition_for(&self, name: &str) -> Option<Arc<ComponentDefinition>> {
        if self.definitions.contains_definition(name) {
            return self.definitions.merged(name).ok();
        }
        if self.singletons.contains_singleton(name) {
            return None;
        }
        self.parent
            .as_ref()
            .and_then(|parent| parent.merged_definition(name))
    }

    /// 候选是请求方自身，或请求方是候选的工厂宿主
    fn is_self_reference(&self, descriptor: &DependencyDescriptor, candidate: &str) -> bool {
        let Some(requesting) = descriptor.requesting_component.as_deref() else {
            return false;
        };
        requesting == candidate
            || self
                .definition_for(candidate)
                .is_some_and(|d| d.factory_component_name.as_deref() == Some(requesting))
    }

    fn is_autowire_candidate(&self, name: &str, descriptor: &DependencyDescriptor) -> bool {
        let definition = self.definition_for(name);
        if let Some(definition) = &definition {
            if !definition.autowire_candidate
                || (definition.is_abstract && !definition.has_factory())
            {
                return false;
            }
        }

        if let Some(actual) = self.type_of(name) {
            if self.candidates.is_ignored(&actual, self.metadata.as_ref()) {
                return false;
            }
        }

        match &descriptor.qualifier {
            Some(qualifier) => {
                name == qualifier
                    || definition.is_some_and(|d| d.qualifiers.iter().any(|q| q == qualifier))
            }
            None => true,
        }
    }

    fn type_matches(&self, name: &str, required: &TypeInfo) -> bool {
        if let Some(instance) = self.singletons.get_singleton(name) {
            if !instance.is_null() {
                return instance.can_cast_to(required);
            }
        }
        self.type_of(name)
            .is_some_and(|actual| self.metadata.is_assignable_to(&actual, required))
    }

    fn is_primary(&self, name: &str) -> bool {
        self.definition_for(name).is_some_and(|d| d.primary)
    }

    /// 定义上的优先级，其次是类型注解上的优先级
    fn priority_of(&self, name: &str, instance: Option<&ComponentInstance>) -> Option<i32> {
        if let Some(priority) = self.definition_for(name).and_then(|d| d.priority()) {
            return Some(priority);
        }
        let type_info = match instance {
            Some(instance) if !instance.is_null() => Some(instance.type_info()),
            _ => self.type_of(name),
        }?;
        self.metadata.annotations_of(&type_info).priority()
    }

    /// 获取候选实例并记录依赖关系
    async fn candidate_instance(
        &self,
        name: &str,
        descriptor: &DependencyDescriptor,
        ctx: &ResolutionContext,
    ) -> ComponentResult<ComponentInstance> {
        let instance = if self.contains_local(name) {
            self.do_get_component(name, None, None, ctx).await?
        } else {
            match &self.parent {
                Some(parent) => parent.get_component(name).await?,
                None => return Err(no_matching(descriptor).into()),
            }
        };

        if !instance.is_null() && !instance.can_cast_to(&descriptor.required_type) {
            return Err(ComponentError::from(DependencyError::TypeMismatch {
                name: name.to_string(),
                required: descriptor.required_type.name.to_string(),
                actual: instance.type_info().name.to_string(),
            }));
        }

        if let Some(requesting) = &descriptor.requesting_component {
            self.singletons.register_dependent(name, requesting);
        }
        Ok(instance)
    }
}
