//! 自定义作用域抽象
//!
//! 单例与原型由容器自身管理，其它作用域（例如请求、会话）通过 [`Scope`] 插入。

use async_trait::async_trait;
use futures::future::BoxFuture;
use infrastructure_common::{ComponentInstance, ComponentResult, DestructionCallback};

/// 作用域内的对象工厂，作用域缺少实例时调用它创建
pub type ScopedObjectFactory<'a> =
    Box<dyn FnOnce() -> BoxFuture<'a, ComponentResult<ComponentInstance>> + Send + 'a>;

/// 自定义作用域 trait
#[async_trait]
pub trait Scope: Send + Sync {
    /// 获取作用域内的实例，不存在时通过工厂创建并保存
    async fn get<'a>(
        &'a self,
        name: &'a str,
        factory: ScopedObjectFactory<'a>,
    ) -> ComponentResult<ComponentInstance>;

    /// 从作用域中移除实例
    fn remove(&self, name: &str) -> Option<ComponentInstance>;

    /// 注册实例离开作用域时的销毁回调
    fn register_destruction_callback(&self, name: &str, callback: DestructionCallback);

    /// 当前会话标识
    fn conversation_id(&self) -> Option<String> {
        None
    }
}
