//! 解析上下文
//!
//! 一次顶层查找对应一个 [`ResolutionContext`]，沿创建链显式传递。
//! 它记录本条调用链上正在创建的组件，用于识别循环引用并决定是否返回早期引用。
//! 不同调用链之间互不可见。
//!
//! 创建组件期间，上下文同时登记为当前任务的活动调用链。构造器、初始化回调
//! 或后置处理器里经由提供者或工厂发起的查找会沿用这条链，而不是开启新链。

use infrastructure_common::ComponentError;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

tokio::task_local! {
    static ACTIVE_CONTEXT: ResolutionContext;
}

#[derive(Debug, Default)]
struct CreationChain {
    order: Vec<String>,
    singletons: HashSet<String>,
    prototypes: HashSet<String>,
}

/// 单条调用链的创建状态
///
/// 克隆得到的上下文与原上下文共享同一条链。
#[derive(Debug, Default, Clone)]
pub struct ResolutionContext {
    chain: Arc<Mutex<CreationChain>>,
}

impl ResolutionContext {
    /// 创建空上下文
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前任务的活动调用链，不在创建过程中时返回新链
    pub fn current() -> Self {
        ACTIVE_CONTEXT.try_with(Clone::clone).unwrap_or_default()
    }

    /// 以本链作为活动调用链运行 `future`
    pub async fn scope<F: Future>(&self, future: F) -> F::Output {
        ACTIVE_CONTEXT.scope(self.clone(), future).await
    }

    /// 本链是否正在创建该单例
    pub fn is_creating_singleton(&self, name: &str) -> bool {
        self.chain.lock().singletons.contains(name)
    }

    /// 本链是否正在创建该原型
    pub fn is_creating_prototype(&self, name: &str) -> bool {
        self.chain.lock().prototypes.contains(name)
    }

    /// 当前创建链，末尾追加再次请求的名称
    pub fn chain_with(&self, name: &str) -> Vec<String> {
        let mut order = self.chain.lock().order.clone();
        order.push(name.to_string());
        order
    }

    /// 创建链深度
    pub fn depth(&self) -> usize {
        self.chain.lock().order.len()
    }

    /// 标记单例进入创建
    pub fn enter_singleton(&self, name: &str) -> CreationGuard<'_> {
        let mut chain = self.chain.lock();
        chain.singletons.insert(name.to_string());
        chain.order.push(name.to_string());
        CreationGuard {
            context: self,
            name: name.to_string(),
            prototype: false,
        }
    }

    /// 标记原型进入创建，同名原型重入视为循环引用
    pub fn enter_prototype(&self, name: &str) -> Result<CreationGuard<'_>, ComponentError> {
        let mut chain = self.chain.lock();
        if !chain.prototypes.insert(name.to_string()) {
            let mut order = chain.order.clone();
            order.push(name.to_string());
            return Err(ComponentError::CurrentlyInCreation {
                name: name.to_string(),
                chain: order,
            });
        }
        chain.order.push(name.to_string());
        Ok(CreationGuard {
            context: self,
            name: name.to_string(),
            prototype: true,
        })
    }
}

/// 创建标记守卫，离开作用域时撤销标记
#[derive(Debug)]
pub struct CreationGuard<'a> {
    context: &'a ResolutionContext,
    name: String,
    prototype: bool,
}

impl Drop for CreationGuard<'_> {
    fn drop(&mut self) {
        let mut chain = self.context.chain.lock();
        if self.prototype {
            chain.prototypes.remove(&self.name);
        } else {
            chain.singletons.remove(&self.name);
        }
        if let Some(position) = chain.order.iter().rposition(|n| n == &self.name) {
            chain.order.remove(position);
        }
    }
}
