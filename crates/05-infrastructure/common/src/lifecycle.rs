//! 组件生命周期管理

use futures::future::BoxFuture;

/// 单例作用域标识：每个容器内只创建一个实例
pub const SCOPE_SINGLETON: &str = "singleton";

/// 原型作用域标识：每次请求都创建新实例
pub const SCOPE_PROTOTYPE: &str = "prototype";

/// 是否为单例作用域，空字符串视为单例
pub fn is_singleton_scope(scope: &str) -> bool {
    scope.is_empty() || scope == SCOPE_SINGLETON
}

/// 是否为原型作用域
pub fn is_prototype_scope(scope: &str) -> bool {
    scope == SCOPE_PROTOTYPE
}

/// 是否为内置作用域
pub fn is_builtin_scope(scope: &str) -> bool {
    is_singleton_scope(scope) || is_prototype_scope(scope)
}

/// 销毁回调，由自定义作用域在对象结束生命周期时调用
pub type DestructionCallback = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// 组件生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// 尚未创建
    #[default]
    Uninitialized,
    /// 创建中
    InCreation,
    /// 已就绪
    Ready,
    /// 销毁中
    Destroying,
    /// 已销毁
    Destroyed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_identifiers() {
        assert!(is_singleton_scope(""));
        assert!(is_singleton_scope(SCOPE_SINGLETON));
        assert!(!is_singleton_scope(SCOPE_PROTOTYPE));
        assert!(is_prototype_scope("prototype"));
        assert!(!is_builtin_scope("request"));
    }
}
