//! 错误类型定义
//!
//! 组件容器的错误分为几类：定义错误（注册、查找、冻结）、依赖解析错误
//! （缺失、不唯一、类型不匹配）、组件创建错误（循环引用、实例化失败、属性赋值失败）
//! 以及生命周期与配置错误。

use thiserror::Error;

/// 装箱的底层错误
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置解析失败: {source}")]
    ParseError { source: BoxError },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },

    #[error("配置序列化失败: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },
}

/// 组件定义错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("组件定义不存在: {name}")]
    NotFound { name: String },

    #[error("没有声明类型为 {type_name} 的组件定义")]
    NoSuchType { type_name: String },

    #[error("声明类型为 {type_name} 的组件定义不唯一: {candidates:?}")]
    NotUnique {
        type_name: String,
        candidates: Vec<String>,
    },

    #[error("组件 {name} 是抽象定义且没有可用的工厂，无法实例化")]
    AbstractWithoutFactory { name: String },

    #[error("定义存储已冻结，无法{operation}组件定义: {name}")]
    Frozen { name: String, operation: String },

    #[error("组件名称无效: '{name}', 原因: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("组件 {name} 已存在定义 [{existing}]，且不允许覆盖")]
    OverrideNotAllowed { name: String, existing: String },

    #[error("组件 {name} 的父定义不存在: {parent}")]
    ParentNotFound { name: String, parent: String },

    #[error("组件 {name} 的作用域未注册: {scope}")]
    NoSuchScope { name: String, scope: String },

    #[error("组件 {name} 与 {dependency} 之间存在循环的 depends-on 关系")]
    CircularDependsOn { name: String, dependency: String },

    #[error("组件定义无效: {name}, 原因: {message}")]
    Invalid { name: String, message: String },
}

impl DefinitionError {
    /// 创建定义不存在错误
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// 创建定义无效错误
    pub fn invalid(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            name: name.into(),
            message: message.into(),
        }
    }

    /// 错误所属的组件名称
    pub fn component_name(&self) -> Option<&str> {
        match self {
            Self::NotFound { name }
            | Self::AbstractWithoutFactory { name }
            | Self::Frozen { name, .. }
            | Self::InvalidName { name, .. }
            | Self::OverrideNotAllowed { name, .. }
            | Self::ParentNotFound { name, .. }
            | Self::NoSuchScope { name, .. }
            | Self::CircularDependsOn { name, .. }
            | Self::Invalid { name, .. } => Some(name),
            Self::NoSuchType { .. } | Self::NotUnique { .. } => None,
        }
    }
}

/// 依赖解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyError {
    #[error("没有可用于注入的组件: 要求类型 {type_name}, 注入点 {injection_point}")]
    NoMatchingComponent {
        type_name: String,
        requested_by: Option<String>,
        injection_point: String,
    },

    #[error("期望唯一匹配的 {type_name} 组件，但找到多个候选: {candidates:?}")]
    NotUnique {
        type_name: String,
        requested_by: Option<String>,
        candidates: Vec<String>,
    },

    #[error("组件 {name} 的属性 {property} 未通过依赖检查")]
    UnsatisfiedProperty { name: String, property: String },

    #[error("组件 {name} 的实际类型 {actual} 无法作为 {required} 使用")]
    TypeMismatch {
        name: String,
        required: String,
        actual: String,
    },

    #[error("容器正在销毁单例，不允许创建组件: {name}")]
    ContainerClosed { name: String },
}

impl DependencyError {
    /// 错误所属的组件名称
    pub fn component_name(&self) -> Option<&str> {
        match self {
            Self::NoMatchingComponent { requested_by, .. } | Self::NotUnique { requested_by, .. } => {
                requested_by.as_deref()
            }
            Self::UnsatisfiedProperty { name, .. } => Some(name),
            Self::TypeMismatch { .. } | Self::ContainerClosed { .. } => None,
        }
    }
}

/// 组件错误类型
#[derive(Error, Debug)]
pub enum ComponentError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Dependency(#[from] DependencyError),

    #[error("组件 {name} 正在创建中，存在无法解析的循环引用: {chain:?}")]
    CurrentlyInCreation { name: String, chain: Vec<String> },

    #[error("组件 {name} 的原始实例已注入到 {dependents:?}，但最终被包装为其他实例")]
    RawInjectionDespiteWrapping {
        name: String,
        dependents: Vec<String>,
    },

    #[error("组件创建失败: {name} [{resource}], 原因: {message}")]
    Creation {
        name: String,
        resource: String,
        message: String,
        source: BoxError,
    },

    #[error("组件 {name} 的属性 {property} 赋值失败: {source}")]
    PropertyAssignment {
        name: String,
        property: String,
        source: BoxError,
    },

    #[error("组件 {name} 的作用域 {scope} 当前不可用: {message}")]
    ScopeUnavailable {
        name: String,
        scope: String,
        message: String,
    },
}

impl ComponentError {
    /// 创建组件创建错误
    pub fn creation(
        name: impl Into<String>,
        resource: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Creation {
            name: name.into(),
            resource: resource.into(),
            message: message.into(),
            source: source.into(),
        }
    }

    /// 错误所属的组件名称
    pub fn component_name(&self) -> Option<&str> {
        match self {
            Self::Definition(err) => err.component_name(),
            Self::Dependency(err) => err.component_name(),
            Self::CurrentlyInCreation { name, .. }
            | Self::RawInjectionDespiteWrapping { name, .. }
            | Self::Creation { name, .. }
            | Self::PropertyAssignment { name, .. }
            | Self::ScopeUnavailable { name, .. } => Some(name),
        }
    }

    /// 沿错误链查找最初的依赖解析错误
    ///
    /// 嵌套创建失败会被逐层包装，调用方可借此区分“缺失”与“不唯一”。
    pub fn dependency_error(&self) -> Option<&DependencyError> {
        let mut current: &(dyn std::error::Error + 'static) = self;
        loop {
            if let Some(ComponentError::Dependency(err)) = current.downcast_ref::<ComponentError>() {
                return Some(err);
            }
            current = current.source()?;
        }
    }

    /// 沿错误链查找循环引用错误
    pub fn is_currently_in_creation(&self) -> bool {
        let mut current: Option<&(dyn std::error::Error + 'static)> = Some(self);
        while let Some(err) = current {
            if matches!(
                err.downcast_ref::<ComponentError>(),
                Some(ComponentError::CurrentlyInCreation { .. })
            ) {
                return true;
            }
            current = err.source();
        }
        false
    }
}

/// 生命周期管理错误类型
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("组件销毁失败: {name}, 原因: {message}")]
    DestructionFailed { name: String, message: String },

    #[error("作用域不存在: {scope_id}")]
    ScopeNotFound { scope_id: String },
}

/// 基础设施错误类型
#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("配置错误: {source}")]
    ConfigError {
        #[from]
        source: ConfigError,
    },

    #[error("组件错误: {source}")]
    ComponentError {
        #[from]
        source: ComponentError,
    },

    #[error("生命周期错误: {source}")]
    LifecycleError {
        #[from]
        source: LifecycleError,
    },

    #[error("基础设施启动失败: {message}")]
    BootstrapFailed { message: String },
}

impl From<DefinitionError> for InfrastructureError {
    fn from(err: DefinitionError) -> Self {
        Self::ComponentError {
            source: ComponentError::Definition(err),
        }
    }
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type DefinitionResult<T> = Result<T, DefinitionError>;
pub type DependencyResult<T> = Result<T, DependencyError>;
pub type ComponentResult<T> = Result<T, ComponentError>;
pub type LifecycleResult<T> = Result<T, LifecycleError>;
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_name_of_wrapped_errors() {
        let err = ComponentError::from(DependencyError::NoMatchingComponent {
            type_name: "Repository".to_string(),
            requested_by: Some("orderService".to_string()),
            injection_point: "组件 orderService 的属性 repository".to_string(),
        });
        assert_eq!(err.component_name(), Some("orderService"));

        let err = ComponentError::from(DefinitionError::NoSuchType {
            type_name: "Repository".to_string(),
        });
        assert_eq!(err.component_name(), None);
    }

    #[test]
    fn test_dependency_error_is_found_through_creation_chain() {
        let inner = ComponentError::from(DependencyError::NotUnique {
            type_name: "Cache".to_string(),
            requested_by: Some("b".to_string()),
            candidates: vec!["c1".to_string(), "c2".to_string()],
        });
        let outer = ComponentError::creation("a", "constructor", "依赖创建失败", inner);

        match outer.dependency_error() {
            Some(DependencyError::NotUnique { candidates, .. }) => {
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("应当找到不唯一错误，实际: {:?}", other),
        }
        assert!(!outer.is_currently_in_creation());
    }
}
