//! 单例注册表
//!
//! 保存已经创建完成的单例、为循环引用提前暴露的早期引用、组件之间的依赖关系
//! 以及单例的销毁回调。
//!
//! 同名单例的首次创建通过每个名称独立的异步锁串行化，不同名称之间互不阻塞。

use dashmap::DashMap;
use di_abstractions::SingletonComponentRegistry;
use futures::future::{BoxFuture, FutureExt};
use indexmap::{IndexMap, IndexSet};
use infrastructure_common::{
    ComponentError, ComponentInstance, ComponentResult, DefinitionError, DependencyError,
    DestructionCallback,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// 早期引用的生产者，最多被调用一次
pub type EarlyReferenceFactory =
    Box<dyn FnOnce() -> ComponentResult<ComponentInstance> + Send + Sync>;

/// 单例注册表
#[derive(Default)]
pub struct SingletonRegistry {
    singletons: DashMap<String, ComponentInstance>,
    early_singletons: DashMap<String, ComponentInstance>,
    early_factories: DashMap<String, EarlyReferenceFactory>,
    registered: Mutex<IndexSet<String>>,
    creation_locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
    in_creation: Mutex<HashSet<String>>,
    dependents: Mutex<HashMap<String, IndexSet<String>>>,
    dependencies: Mutex<HashMap<String, IndexSet<String>>>,
    disposables: Mutex<IndexMap<String, DestructionCallback>>,
    in_destruction: AtomicBool,
}

impl SingletonRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取单例，不存在时在该名称的创建锁内调用 `create` 恰好一次
    ///
    /// 等待锁的调用方在获得锁后会重新检查缓存，从而复用先到者的结果。
    /// `create` 失败时该名称不会留下任何缓存。
    pub async fn get_or_create<F, Fut>(&self, name: &str, create: F) -> ComponentResult<ComponentInstance>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = ComponentResult<ComponentInstance>> + Send,
    {
        if let Some(existing) = self.get_singleton(name) {
            return Ok(existing);
        }

        let lock = self.creation_lock(name);
        let _permit = lock.lock().await;

        if let Some(existing) = self.get_singleton(name) {
            trace!("等待创建锁期间单例已由其他调用方创建: {}", name);
            return Ok(existing);
        }
        if self.is_in_destruction() {
            return Err(DependencyError::ContainerClosed {
                name: name.to_string(),
            }
            .into());
        }

        let _marker = self.mark_in_creation(name);
        let instance = create().await?;
        self.add_singleton(name, instance.clone());
        Ok(instance)
    }

    fn creation_lock(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(
            self.creation_locks
                .entry(name.to_string())
                .or_default()
                .value(),
        )
    }

    fn add_singleton(&self, name: &str, instance: ComponentInstance) {
        self.singletons.insert(name.to_string(), instance);
        self.early_singletons.remove(name);
        self.early_factories.remove(name);
        self.registered.lock().insert(name.to_string());
    }

    /// 标记单例进入创建，返回的守卫在析构时撤销标记并清除早期引用
    pub fn mark_in_creation(&self, name: &str) -> InCreationMarker<'_> {
        self.in_creation.lock().insert(name.to_string());
        InCreationMarker {
            registry: self,
            name: name.to_string(),
        }
    }

    /// 撤销创建标记，重复调用无副作用
    pub fn unmark_in_creation(&self, name: &str) {
        self.in_creation.lock().remove(name);
    }

    /// 是否有调用链正在创建该单例
    pub fn is_currently_in_creation(&self, name: &str) -> bool {
        self.in_creation.lock().contains(name)
    }

    /// 发布早期引用生产者
    pub fn add_early_factory(&self, name: &str, factory: EarlyReferenceFactory) {
        if !self.singletons.contains_key(name) {
            self.early_factories.insert(name.to_string(), factory);
        }
    }

    /// 获取早期引用，不会触发创建
    ///
    /// 首次访问时调用生产者并缓存其结果，之后返回同一个引用。
    pub fn get_early_reference(&self, name: &str) -> ComponentResult<Option<ComponentInstance>> {
        if let Some(instance) = self.get_singleton(name) {
            return Ok(Some(instance));
        }
        if let Some(early) = self.early_singleton(name) {
            return Ok(Some(early));
        }
        match self.early_factories.remove(name) {
            Some((_, factory)) => {
                let early = factory()?;
                debug!("生成早期引用: {}", name);
                self.early_singletons.insert(name.to_string(), early.clone());
                Ok(Some(early))
            }
            None => Ok(None),
        }
    }

    /// 已经交给依赖方的早期引用
    pub fn early_singleton(&self, name: &str) -> Option<ComponentInstance> {
        self.early_singletons.get(name).map(|entry| entry.value().clone())
    }

    fn evict_early(&self, name: &str) {
        self.early_singletons.remove(name);
        self.early_factories.remove(name);
    }

    /// 移除单例及其早期引用
    ///
    /// 没有调用方持有或等待时一并丢弃该名称的创建锁。
    pub fn remove(&self, name: &str) -> Option<ComponentInstance> {
        self.evict_early(name);
        self.registered.lock().shift_remove(name);
        self.creation_locks.remove_if(name, |_, lock| Arc::strong_count(lock) == 1);
        self.singletons.remove(name).map(|(_, instance)| instance)
    }

    /// 清空全部单例缓存
    pub fn clear(&self) {
        self.singletons.clear();
        self.early_singletons.clear();
        self.early_factories.clear();
        self.registered.lock().clear();
        self.creation_locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        self.in_destruction.store(false, Ordering::SeqCst);
    }

    /// 已经创建完成、直接或间接依赖于 `name` 的单例
    pub fn created_dependents(&self, name: &str) -> Vec<String> {
        let dependents = self.dependents.lock();
        let mut visited = IndexSet::new();
        let mut pending = vec![name.to_string()];
        while let Some(current) = pending.pop() {
            if let Some(direct) = dependents.get(&current) {
                for dependent in direct {
                    if dependent != name && visited.insert(dependent.clone()) {
                        pending.push(dependent.clone());
                    }
                }
            }
        }
        visited
            .into_iter()
            .filter(|dependent| self.singletons.contains_key(dependent))
            .collect()
    }

    /// 记录 `dependent` 依赖于 `name`
    pub fn register_dependent(&self, name: &str, dependent: &str) {
        if name == dependent {
            return;
        }
        let inserted = self
            .dependents
            .lock()
            .entry(name.to_string())
            .or_default()
            .insert(dependent.to_string());
        if inserted {
            self.dependencies
                .lock()
                .entry(dependent.to_string())
                .or_default()
                .insert(name.to_string());
        }
    }

    /// `dependent` 是否直接或间接依赖于 `name`
    pub fn is_dependent(&self, name: &str, dependent: &str) -> bool {
        let dependents = self.dependents.lock();
        let mut visited = HashSet::new();
        let mut pending = vec![name.to_string()];
        while let Some(current) = pending.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(direct) = dependents.get(&current) {
                if direct.contains(dependent) {
                    return true;
                }
                pending.extend(direct.iter().cloned());
            }
        }
        false
    }

    /// 依赖于 `name` 的组件
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        self.dependents
            .lock()
            .get(name)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// `name` 依赖的组件
    pub fn dependencies_of(&self, name: &str) -> Vec<String> {
        self.dependencies
            .lock()
            .get(name)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 登记单例的销毁回调
    pub fn register_disposable(&self, name: &str, callback: DestructionCallback) {
        self.disposables.lock().insert(name.to_string(), callback);
    }

    /// 是否正在销毁单例
    pub fn is_in_destruction(&self) -> bool {
        self.in_destruction.load(Ordering::SeqCst)
    }

    /// 按注册的逆序销毁全部单例
    ///
    /// 依赖某个单例的组件总是先于它被销毁；销毁失败由回调自行记录，不会中断流程。
    pub async fn destroy_singletons(&self) {
        self.in_destruction.store(true, Ordering::SeqCst);
        let names: Vec<String> = self.disposables.lock().keys().cloned().collect();
        info!("开始销毁单例，共 {} 个带销毁回调的组件", names.len());

        for name in names.iter().rev() {
            self.destroy_singleton(name).await;
        }

        self.dependents.lock().clear();
        self.dependencies.lock().clear();
        self.clear();
    }

    /// 销毁单个单例，先销毁依赖它的组件
    pub fn destroy_singleton<'a>(&'a self, name: &'a str) -> BoxFuture<'a, ()> {
        async move {
            self.remove(name);
            let callback = self.disposables.lock().shift_remove(name);

            let dependents = self.dependents.lock().remove(name);
            if let Some(dependents) = dependents {
                for dependent in &dependents {
                    debug!("先销毁依赖 {} 的组件 {}", name, dependent);
                    self.destroy_singleton(dependent).await;
                }
            }

            if let Some(callback) = callback {
                debug!("销毁单例: {}", name);
                callback().await;
            }

            for set in self.dependents.lock().values_mut() {
                set.shift_remove(name);
            }
            self.dependencies.lock().remove(name);
        }
        .boxed()
    }
}

impl SingletonComponentRegistry for SingletonRegistry {
    fn register_singleton(&self, name: &str, instance: ComponentInstance) -> ComponentResult<()> {
        if let Some(existing) = self.get_singleton(name) {
            return Err(ComponentError::from(DefinitionError::invalid(
                name,
                format!("已存在同名单例 {:?}", existing),
            )));
        }
        debug!("登记外部单例: {}", name);
        self.add_singleton(name, instance);
        Ok(())
    }

    fn get_singleton(&self, name: &str) -> Option<ComponentInstance> {
        self.singletons.get(name).map(|entry| entry.value().clone())
    }

    fn contains_singleton(&self, name: &str) -> bool {
        self.singletons.contains_key(name)
    }

    fn singleton_names(&self) -> Vec<String> {
        self.registered.lock().iter().cloned().collect()
    }

    fn singleton_count(&self) -> usize {
        self.registered.lock().len()
    }
}

/// 单例创建标记
///
/// 无论创建成功、失败还是被取消，析构时都会撤销标记并清除该名称的早期引用。
pub struct InCreationMarker<'a> {
    registry: &'a SingletonRegistry,
    name: String,
}

impl Drop for InCreationMarker<'_> {
    fn drop(&mut self) {
        self.registry.unmark_in_creation(&self.name);
        self.registry.evict_early(&self.name);
    }
}
