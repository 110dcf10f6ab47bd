//! # Dependency Injection Abstractions
//!
//! 组件容器抽象层，定义组件定义模型与容器协作者的核心接口。
//!
//! ## 核心接口
//!
//! - [`ComponentDefinition`] - 组件定义
//! - [`MetadataProvider`] / [`TypeDescriptor`] - 类型元数据
//! - [`DependencyDescriptor`] / [`DependencyResolver`] - 依赖描述与解析
//! - [`ComponentPostProcessor`] - 组件后置处理器
//! - [`Scope`] - 自定义作用域
//! - [`ConversionService`] / [`ExpressionEvaluator`] - 值转换与表达式求值
//! - [`ComponentFactory`] / [`ComponentDefinitionRegistry`] - 工厂与注册表接口

pub mod conversion;
pub mod definition;
pub mod factory;
pub mod metadata;
pub mod processor;
pub mod registry;
pub mod resolver;
pub mod scope;

pub use conversion::*;
pub use definition::*;
pub use factory::*;
pub use metadata::*;
pub use processor::*;
pub use registry::*;
pub use resolver::*;
pub use scope::*;
