//! 作用域注册表与基于映射的自定义作用域

use async_trait::async_trait;
use dashmap::DashMap;
use di_abstractions::{Scope, ScopedObjectFactory};
use indexmap::IndexMap;
use infrastructure_common::{
    is_builtin_scope, ComponentInstance, ComponentResult, DefinitionError, DefinitionResult,
    DestructionCallback,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// 自定义作用域注册表
///
/// 单例与原型由容器直接处理，不能在这里注册或替换。
#[derive(Default)]
pub struct ScopeRegistry {
    scopes: DashMap<String, Arc<dyn Scope>>,
}

impl ScopeRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册作用域，同名作用域会被替换
    pub fn register_scope(&self, id: &str, scope: Arc<dyn Scope>) -> DefinitionResult<()> {
        if id.trim().is_empty() || is_builtin_scope(id) {
            return Err(DefinitionError::InvalidName {
                name: id.to_string(),
                reason: "不能注册或替换内置作用域".to_string(),
            });
        }
        if self.scopes.insert(id.to_string(), scope).is_some() {
            info!("替换已注册的作用域: {}", id);
        } else {
            debug!("注册作用域: {}", id);
        }
        Ok(())
    }

    /// 获取作用域
    pub fn get(&self, id: &str) -> Option<Arc<dyn Scope>> {
        self.scopes.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// 已注册的作用域名称，按字母排序
    pub fn registered_scope_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.scopes.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }
}

/// 基于映射的作用域
///
/// 适合请求、会话一类由外部控制生命周期的场景：调用 [`MapScope::clear`]
/// 结束一次会话，已登记的销毁回调按登记的逆序执行。
pub struct MapScope {
    conversation_id: String,
    instances: DashMap<String, ComponentInstance>,
    callbacks: Mutex<IndexMap<String, DestructionCallback>>,
}

impl MapScope {
    /// 创建作用域，会话标识随机生成
    pub fn new() -> Self {
        Self {
            conversation_id: Uuid::new_v4().to_string(),
            instances: DashMap::new(),
            callbacks: Mutex::new(IndexMap::new()),
        }
    }

    /// 当前持有的实例数量
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// 结束本作用域：执行全部销毁回调并清空实例
    pub async fn clear(&self) {
        let callbacks: Vec<(String, DestructionCallback)> = self.callbacks.lock().drain(..).collect();
        debug!(
            "清空作用域 {}，执行 {} 个销毁回调",
            self.conversation_id,
            callbacks.len()
        );
        for (name, callback) in callbacks.into_iter().rev() {
            debug!("销毁作用域组件: {}", name);
            callback().await;
        }
        self.instances.clear();
    }
}

impl Default for MapScope {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scope for MapScope {
    async fn get<'a>(
        &'a self,
        name: &'a str,
        factory: ScopedObjectFactory<'a>,
    ) -> ComponentResult<ComponentInstance> {
        let existing = self.instances.get(name).map(|entry| entry.value().clone());
        if let Some(instance) = existing {
            return Ok(instance);
        }
        let created = factory().await?;
        let stored = self
            .instances
            .entry(name.to_string())
            .or_insert(created)
            .value()
            .clone();
        Ok(stored)
    }

    fn remove(&self, name: &str) -> Option<ComponentInstance> {
        self.callbacks.lock().shift_remove(name);
        self.instances.remove(name).map(|(_, instance)| instance)
    }

    fn register_destruction_callback(&self, name: &str, callback: DestructionCallback) {
        self.callbacks.lock().insert(name.to_string(), callback);
    }

    fn conversation_id(&self) -> Option<String> {
        Some(self.conversation_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Session;

    #[test]
    fn test_builtin_scopes_cannot_be_registered() {
        let registry = ScopeRegistry::new();
        for id in ["singleton", "prototype", "", " "] {
            assert!(registry.register_scope(id, Arc::new(MapScope::new())).is_err());
        }
        registry.register_scope("request", Arc::new(MapScope::new())).unwrap();
        registry.register_scope("session", Arc::new(MapScope::new())).unwrap();
        assert_eq!(registry.registered_scope_names(), vec!["request", "session"]);
        assert!(registry.get("request").is_some());
        assert!(registry.get("conversation").is_none());
    }

    #[tokio::test]
    async fn test_map_scope_caches_until_cleared() {
        let scope = MapScope::new();
        let created = AtomicUsize::new(0);
        let destroyed = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let created = &created;
            let instance = scope
                .get(
                    "session",
                    Box::new(move || {
                        async move {
                            created.fetch_add(1, Ordering::SeqCst);
                            Ok(ComponentInstance::new(Session))
                        }
                        .boxed()
                    }),
                )
                .await
                .unwrap();
            assert!(instance.downcast::<Session>().is_some());
        }
        assert_eq!(created.load(Ordering::SeqCst), 1);

        let counter = Arc::clone(&destroyed);
        scope.register_destruction_callback(
            "session",
            Box::new(move || {
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
                .boxed()
            }),
        );
        assert!(scope.conversation_id().is_some());

        scope.clear().await;
        assert!(scope.is_empty());
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }
}
