//! 容器选项
//!
//! 选项可以直接构造，也可以通过 `config` crate 从配置文件与环境变量加载。

use infrastructure_common::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, error};

/// 容器行为选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerOptions {
    /// 是否允许通过早期引用解决单例之间的循环引用
    pub allow_circular_references: bool,
    /// 是否允许同名定义覆盖
    pub allow_definition_overriding: bool,
    /// 原始实例已被注入、最终实例却被包装时是否放行
    pub allow_raw_injection_despite_wrapping: bool,
    /// 是否缓存合并后的定义与类型匹配结果
    pub cache_metadata: bool,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            allow_circular_references: true,
            allow_definition_overriding: true,
            allow_raw_injection_despite_wrapping: false,
            cache_metadata: true,
        }
    }
}

impl ContainerOptions {
    /// 严格模式：禁止循环引用与定义覆盖
    pub fn strict() -> Self {
        Self {
            allow_circular_references: false,
            allow_definition_overriding: false,
            ..Self::default()
        }
    }

    /// 从配置文件与环境变量加载
    ///
    /// 环境变量形如 `{PREFIX}_ALLOW_CIRCULAR_REFERENCES=false`，优先于文件中的值。
    pub fn load(file: Option<&Path>, env_prefix: Option<&str>) -> ConfigResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
            debug!("加载容器选项文件: {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }

        if let Some(prefix) = env_prefix {
            debug!("加载容器选项环境变量，前缀: {}", prefix);
            builder = builder.add_source(config::Environment::with_prefix(prefix).try_parsing(true));
        }

        let settings = builder.build().map_err(|e| {
            error!("容器选项构建失败: {}", e);
            ConfigError::ParseError {
                source: Box::new(e),
            }
        })?;

        settings.try_deserialize().map_err(|e| {
            error!("容器选项绑定失败: {}", e);
            ConfigError::ParseError {
                source: Box::new(e),
            }
        })
    }
}
