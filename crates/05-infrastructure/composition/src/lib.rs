//! # 组件容器组合层
//!
//! 把 `di-impl` 的组件工厂与选项加载、日志初始化、启动和停止流程组合在一起。
//!
//! ## 基本使用
//!
//! ```rust,ignore
//! use infrastructure_composition::{ComponentContainer, LoggingConfig};
//!
//! let container = ComponentContainer::builder()
//!     .with_logging(LoggingConfig::development())
//!     .add_options_file("container.toml")?
//!     .describe(TypeDescriptor::of::<MemoryRepository>()
//!         .constructor(ConstructorDescriptor::default_of::<MemoryRepository>()))
//!     .add_definition("repository", ComponentDefinition::of::<MemoryRepository>())
//!     .build()
//!     .await?;
//!
//! container.start().await?;
//! let repository = container.resolve::<MemoryRepository>().await?;
//! container.stop().await?;
//! ```

pub mod builder;
pub mod logging;
pub mod runtime;

pub use builder::ContainerBuilder;
pub use logging::LoggingConfig;
pub use runtime::{ComponentContainer, ContainerMetrics, ContainerStatus};

// 重新导出错误类型
pub use infrastructure_common::InfrastructureError;
