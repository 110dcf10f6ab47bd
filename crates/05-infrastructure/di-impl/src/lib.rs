//! # 依赖注入具体实现
//!
//! 提供组件容器 [`DefaultComponentFactory`] 及其协作部件：
//!
//! - [`DefinitionStore`] - 定义注册、父子定义合并与冻结
//! - [`SingletonRegistry`] - 单例缓存、早期引用、依赖关系与销毁顺序
//! - [`ProcessorPipeline`] - 后置处理器管线
//! - [`ScopeRegistry`] / [`MapScope`] - 自定义作用域
//! - [`DescriptorTable`] - 基于显式注册的类型元数据
//! - [`DefaultConversionService`] - 字面量到目标类型的转换
//!
//! 组件查找从一个 [`ResolutionContext`] 开始，沿创建链传递，
//! 用于识别循环引用并在允许时返回早期引用。

mod candidate;
mod container;
mod creation;
mod provider;

pub mod context;
pub mod conversion;
pub mod definition_store;
pub mod disposable;
pub mod metadata;
pub mod options;
pub mod processor;
pub mod scope;
pub mod singleton_registry;

pub use candidate::{determine_autowire_candidate, AutowireCandidate};
pub use container::DefaultComponentFactory;
pub use context::ResolutionContext;
pub use conversion::DefaultConversionService;
pub use definition_store::DefinitionStore;
pub use disposable::DisposableAdapter;
pub use metadata::DescriptorTable;
pub use options::ContainerOptions;
pub use processor::{AutowiredPropertyProcessor, ProcessorPipeline};
pub use scope::{MapScope, ScopeRegistry};
pub use singleton_registry::{EarlyReferenceFactory, SingletonRegistry};
