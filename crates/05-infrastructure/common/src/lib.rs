//! # Infrastructure Common
//!
//! 这个 crate 提供了 Lorn ADSP 组件容器的公共类型。
//!
//! ## 核心类型
//!
//! - [`ComponentInstance`] - 类型擦除的组件实例
//! - [`InjectionValue`] / [`PropertyValue`] - 注入值与声明式属性值
//! - [`ComponentProvider`] - 延迟解析的组件提供者
//! - [`TypeInfo`] / [`Annotations`] - 类型标识与注解
//! - [`ComponentError`] 等 - 容器错误分类
//!
//! ## 设计原则
//!
//! - 基于 Rust 类型系统的编译时安全
//! - 异步优先的设计理念
//! - 组件以共享指针持有，通过转换表支持 trait 对象注入

pub mod component;
pub mod errors;
pub mod lifecycle;
pub mod metadata;
pub mod values;

pub use component::*;
pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;
pub use values::*;
