//! 组件定义存储
//!
//! 按注册顺序保存组件定义，负责名称校验、覆盖策略、冻结以及父子定义合并。

use dashmap::DashMap;
use di_abstractions::{ComponentDefinition, ComponentDefinitionRegistry, MetadataProvider};
use indexmap::IndexMap;
use infrastructure_common::{DefinitionError, DefinitionResult, TypeInfo};
use parking_lot::RwLock;
use std::any::TypeId;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

const MAX_PARENT_DEPTH: usize = 32;

/// 组件定义存储
pub struct DefinitionStore {
    definitions: RwLock<IndexMap<String, Arc<ComponentDefinition>>>,
    merged: DashMap<String, Arc<ComponentDefinition>>,
    type_names: DashMap<(TypeId, bool), Vec<String>>,
    /// 每次修改定义时递增，缓存写入前后比对
    generation: AtomicU64,
    frozen: AtomicBool,
    allow_overriding: AtomicBool,
    cache_metadata: AtomicBool,
    metadata: Arc<dyn MetadataProvider>,
}

impl DefinitionStore {
    /// 创建定义存储
    pub fn new(metadata: Arc<dyn MetadataProvider>) -> Self {
        Self {
            definitions: RwLock::new(IndexMap::new()),
            merged: DashMap::new(),
            type_names: DashMap::new(),
            generation: AtomicU64::new(0),
            frozen: AtomicBool::new(false),
            allow_overriding: AtomicBool::new(true),
            cache_metadata: AtomicBool::new(true),
            metadata,
        }
    }

    /// 设置是否允许覆盖同名定义
    pub fn set_allow_definition_overriding(&self, allow: bool) {
        self.allow_overriding.store(allow, Ordering::SeqCst);
    }

    /// 是否允许覆盖同名定义
    pub fn allows_definition_overriding(&self) -> bool {
        self.allow_overriding.load(Ordering::SeqCst)
    }

    /// 设置是否缓存合并结果与类型匹配结果
    pub fn set_cache_metadata(&self, cache: bool) {
        self.cache_metadata.store(cache, Ordering::SeqCst);
        if !cache {
            self.clear_caches();
        }
    }

    fn caching(&self) -> bool {
        self.cache_metadata.load(Ordering::SeqCst)
    }

    fn clear_caches(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.merged.clear();
        self.type_names.clear();
    }

    fn ensure_mutable(&self, name: &str, operation: &str) -> DefinitionResult<()> {
        if self.is_frozen() {
            warn!("定义存储已冻结，拒绝{}组件定义: {}", operation, name);
            return Err(DefinitionError::Frozen {
                name: name.to_string(),
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    /// 校验组件名称
    pub fn validate_name(name: &str) -> DefinitionResult<()> {
        if name.trim().is_empty() {
            return Err(DefinitionError::InvalidName {
                name: name.to_string(),
                reason: "名称不能为空".to_string(),
            });
        }
        if name.starts_with('&') {
            return Err(DefinitionError::InvalidName {
                name: name.to_string(),
                reason: "以 & 开头的名称保留给工厂引用".to_string(),
            });
        }
        Ok(())
    }

    /// 就地修改组件定义
    pub fn modify(
        &self,
        name: &str,
        update: impl FnOnce(&mut ComponentDefinition),
    ) -> DefinitionResult<()> {
        self.ensure_mutable(name, "修改")?;
        let mut definitions = self.definitions.write();
        let current = definitions
            .get(name)
            .ok_or_else(|| DefinitionError::not_found(name))?;
        let mut updated = ComponentDefinition::clone(current);
        update(&mut updated);
        updated.validate(name)?;
        definitions.insert(name.to_string(), Arc::new(updated));
        drop(definitions);
        self.clear_caches();
        debug!("修改组件定义: {}", name);
        Ok(())
    }

    /// 获取合并父定义之后的最终定义
    pub fn merged(&self, name: &str) -> DefinitionResult<Arc<ComponentDefinition>> {
        if let Some(cached) = self.merged.get(name) {
            return Ok(Arc::clone(cached.value()));
        }
        let generation = self.generation();
        let merged = self.merge_chain(name, 0)?;
        if self.caching() {
            self.cache_merged(name, &merged, generation);
        }
        Ok(merged)
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// 写入合并结果，合并期间定义被修改时撤回写入
    ///
    /// 修改方先递增代数再清空缓存，因此写入后复核代数即可保证不会留下过期结果。
    fn cache_merged(&self, name: &str, merged: &Arc<ComponentDefinition>, generation: u64) {
        self.merged.insert(name.to_string(), Arc::clone(merged));
        if self.generation() != generation {
            debug!("合并期间定义已修改，丢弃合并结果: {}", name);
            self.merged.remove_if(name, |_, cached| Arc::ptr_eq(cached, merged));
        }
    }

    fn merge_chain(&self, name: &str, depth: usize) -> DefinitionResult<Arc<ComponentDefinition>> {
        let definition = self.get_definition(name)?;
        let Some(parent_name) = definition.parent_name.clone() else {
            return Ok(definition);
        };
        if parent_name == name || depth >= MAX_PARENT_DEPTH {
            return Err(DefinitionError::ParentNotFound {
                name: name.to_string(),
                parent: parent_name,
            });
        }
        let parent = self.merge_chain(&parent_name, depth + 1).map_err(|err| match err {
            DefinitionError::NotFound { .. } => DefinitionError::ParentNotFound {
                name: name.to_string(),
                parent: parent_name.clone(),
            },
            other => other,
        })?;
        Ok(Arc::new(definition.merged_with_parent(&parent)))
    }

    /// 不触发创建地预测组件类型
    ///
    /// 工厂方法定义取工厂方法声明的返回类型。
    pub fn predicted_type(&self, definition: &ComponentDefinition) -> Option<TypeInfo> {
        self.predict(definition, 0)
    }

    fn predict(&self, definition: &ComponentDefinition, depth: usize) -> Option<TypeInfo> {
        let Some(method_name) = &definition.factory_method_name else {
            return definition.type_info;
        };
        let host_type = match &definition.factory_component_name {
            Some(host) if depth < MAX_PARENT_DEPTH => {
                let host_definition = self.merged(host).ok()?;
                self.predict(&host_definition, depth + 1)?
            }
            Some(_) => return None,
            None => definition.type_info?,
        };
        self.metadata
            .descriptor_of(&host_type)?
            .method_named(method_name)
            .and_then(|method| method.return_type)
    }

    /// 类型匹配的定义名称，按注册顺序
    ///
    /// 无法合并的定义会被跳过；冻结后结果会被缓存。
    pub fn names_for_type(&self, type_info: &TypeInfo, include_non_singletons: bool) -> Vec<String> {
        let key = (type_info.id, include_non_singletons);
        let cacheable = self.is_frozen() && self.caching();
        if cacheable {
            if let Some(cached) = self.type_names.get(&key) {
                return cached.value().clone();
            }
        }

        let generation = self.generation();
        let mut names = Vec::new();
        for name in self.definition_names() {
            let definition = match self.merged(&name) {
                Ok(definition) => definition,
                Err(err) => {
                    debug!("类型匹配时跳过无法合并的定义 {}: {}", name, err);
                    continue;
                }
            };
            if definition.is_abstract || (!include_non_singletons && !definition.is_singleton()) {
                continue;
            }
            let matches = self
                .predicted_type(&definition)
                .is_some_and(|predicted| self.metadata.is_assignable_to(&predicted, type_info));
            if matches {
                names.push(name);
            }
        }

        if cacheable {
            self.type_names.insert(key, names.clone());
            if self.generation() != generation {
                self.type_names.remove(&key);
            }
        }
        names
    }
}

impl ComponentDefinitionRegistry for DefinitionStore {
    fn register_definition(
        &self,
        name: &str,
        definition: ComponentDefinition,
    ) -> DefinitionResult<Option<Arc<ComponentDefinition>>> {
        self.ensure_mutable(name, "注册")?;
        Self::validate_name(name)?;
        definition.validate(name)?;

        let mut definitions = self.definitions.write();
        if let Some(existing) = definitions.get(name) {
            if !self.allows_definition_overriding() {
                return Err(DefinitionError::OverrideNotAllowed {
                    name: name.to_string(),
                    existing: existing.summary(),
                });
            }
            if existing.role != definition.role {
                warn!(
                    "覆盖组件定义 {}，角色由 {:?} 变为 {:?}: [{}] -> [{}]",
                    name,
                    existing.role,
                    definition.role,
                    existing.summary(),
                    definition.summary()
                );
            } else {
                info!(
                    "覆盖组件定义 {}: [{}] -> [{}]",
                    name,
                    existing.summary(),
                    definition.summary()
                );
            }
        } else {
            debug!("注册组件定义 {}: [{}]", name, definition.summary());
        }

        let previous = definitions.insert(name.to_string(), Arc::new(definition));
        drop(definitions);
        self.clear_caches();
        Ok(previous)
    }

    fn remove_definition(&self, name: &str) -> DefinitionResult<Arc<ComponentDefinition>> {
        self.ensure_mutable(name, "移除")?;
        let removed = self
            .definitions
            .write()
            .shift_remove(name)
            .ok_or_else(|| DefinitionError::not_found(name))?;
        self.clear_caches();
        debug!("移除组件定义: {}", name);
        Ok(removed)
    }

    fn get_definition(&self, name: &str) -> DefinitionResult<Arc<ComponentDefinition>> {
        self.definitions
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| DefinitionError::not_found(name))
    }

    fn get_definition_by_type(
        &self,
        type_info: &TypeInfo,
    ) -> DefinitionResult<(String, Arc<ComponentDefinition>)> {
        let mut names = self.names_for_type(type_info, true);
        match names.len() {
            0 => Err(DefinitionError::NoSuchType {
                type_name: type_info.name.to_string(),
            }),
            1 => {
                let name = names.remove(0);
                let definition = self.get_definition(&name)?;
                Ok((name, definition))
            }
            _ => Err(DefinitionError::NotUnique {
                type_name: type_info.name.to_string(),
                candidates: names,
            }),
        }
    }

    fn contains_definition(&self, name: &str) -> bool {
        self.definitions.read().contains_key(name)
    }

    fn definition_names(&self) -> Vec<String> {
        self.definitions.read().keys().cloned().collect()
    }

    fn definition_count(&self) -> usize {
        self.definitions.read().len()
    }

    fn freeze(&self) {
        if !self.frozen.swap(true, Ordering::SeqCst) {
            info!("冻结组件定义存储，共 {} 个定义", self.definition_count());
        }
    }

    fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::DescriptorTable;
    use di_abstractions::{MethodDescriptor, TypeDescriptor};
    use infrastructure_common::PropertyValue;

    trait Cache: Send + Sync {}
    struct LocalCache;
    impl Cache for LocalCache {}
    struct CacheConfig;

    fn store() -> DefinitionStore {
        let metadata = DescriptorTable::new()
            .with(TypeDescriptor::of::<LocalCache>().implements(|c: Arc<LocalCache>| c as Arc<dyn Cache>))
            .with(TypeDescriptor::of::<CacheConfig>().method(
                MethodDescriptor::factory::<CacheConfig, LocalCache, _, _>(
                    "localCache",
                    Vec::new(),
                    |_config, _args| async { Ok(LocalCache) },
                ),
            ));
        DefinitionStore::new(Arc::new(metadata))
    }

    #[test]
    fn test_register_and_lookup() {
        let store = store();
        store
            .register_definition("cache", ComponentDefinition::of::<LocalCache>())
            .unwrap();

        assert!(store.contains_definition("cache"));
        assert_eq!(store.definition_count(), 1);
        let (name, _) = store.get_definition_by_type(&TypeInfo::of::<dyn Cache>()).unwrap();
        assert_eq!(name, "cache");
        assert!(matches!(
            store.get_definition("missing"),
            Err(DefinitionError::NotFound { .. })
        ));
    }

    #[test]
    fn test_reserved_names_are_rejected() {
        let store = store();
        for name in ["", "   ", "&cache"] {
            let result = store.register_definition(name, ComponentDefinition::of::<LocalCache>());
            assert!(
                matches!(result, Err(DefinitionError::InvalidName { .. })),
                "名称 '{}' 应当被拒绝",
                name
            );
        }
    }

    #[test]
    fn test_override_policy() {
        let store = store();
        store
            .register_definition("cache", ComponentDefinition::of::<LocalCache>())
            .unwrap();
        let previous = store
            .register_definition("cache", ComponentDefinition::of::<LocalCache>().lazy())
            .unwrap();
        assert!(previous.is_some());
        assert!(store.get_definition("cache").unwrap().lazy_init);

        store.set_allow_definition_overriding(false);
        let result = store.register_definition("cache", ComponentDefinition::of::<LocalCache>());
        assert!(matches!(result, Err(DefinitionError::OverrideNotAllowed { .. })));
    }

    #[test]
    fn test_frozen_store_rejects_changes() {
        let store = store();
        store
            .register_definition("cache", ComponentDefinition::of::<LocalCache>())
            .unwrap();
        store.freeze();

        assert!(store.is_frozen());
        assert!(matches!(
            store.register_definition("other", ComponentDefinition::of::<LocalCache>()),
            Err(DefinitionError::Frozen { .. })
        ));
        assert!(matches!(store.remove_definition("cache"), Err(DefinitionError::Frozen { .. })));
        assert!(store.modify("cache", |d| d.lazy_init = true).is_err());
        assert!(store.get_definition("cache").is_ok());
    }

    #[test]
    fn test_merged_definition_is_stable() {
        let store = store();
        store
            .register_definition(
                "base",
                ComponentDefinition::of::<LocalCache>()
                    .with_property("size", PropertyValue::literal(16))
                    .abstract_definition(),
            )
            .unwrap();
        store
            .register_definition("cache", ComponentDefinition::child_of("base"))
            .unwrap();

        let first = store.merged("cache").unwrap();
        let second = store.merged("cache").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.type_info, Some(TypeInfo::of::<LocalCache>()));
        assert!(first.property_values.contains("size"));

        store.modify("base", |d| d.lazy_init = true).unwrap();
        assert!(!store.merged("cache").unwrap().lazy_init);
        assert!(store.merged("base").unwrap().lazy_init);

        store
            .register_definition("orphan", ComponentDefinition::child_of("nowhere"))
            .unwrap();
        assert!(matches!(
            store.merged("orphan"),
            Err(DefinitionError::ParentNotFound { .. })
        ));
    }

    #[test]
    fn test_merge_overtaken_by_modification_is_not_cached() {
        let store = store();
        store
            .register_definition("cache", ComponentDefinition::of::<LocalCache>())
            .unwrap();

        let generation = store.generation();
        let stale = store.merge_chain("cache", 0).unwrap();
        store.modify("cache", |d| d.lazy_init = true).unwrap();
        store.cache_merged("cache", &stale, generation);

        assert!(!store.merged.contains_key("cache"));
        assert!(store.merged("cache").unwrap().lazy_init);
        assert!(store.merged.contains_key("cache"));
    }

    #[test]
    fn test_factory_method_type_prediction() {
        let store = store();
        store
            .register_definition("cacheConfig", ComponentDefinition::of::<CacheConfig>())
            .unwrap();
        store
            .register_definition(
                "localCache",
                ComponentDefinition::from_factory_method("cacheConfig", "localCache"),
            )
            .unwrap();

        let names = store.names_for_type(&TypeInfo::of::<dyn Cache>(), true);
        assert_eq!(names, vec!["localCache".to_string()]);
    }
}
