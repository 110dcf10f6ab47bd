//! 日志配置

use infrastructure_common::InfrastructureError;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: tracing::Level,
    /// 过滤指令，如 `di_impl=trace,info`，设置后忽略 `level`
    pub directives: Option<String>,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否显示文件名
    pub show_file: bool,
    /// 是否显示行号
    pub show_line_number: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            directives: None,
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境日志配置
    pub fn development() -> Self {
        Self {
            level: tracing::Level::DEBUG,
            directives: None,
            show_target: true,
            show_thread_ids: true,
            show_file: true,
            show_line_number: true,
            json_format: false,
        }
    }

    /// 创建生产环境日志配置
    pub fn production() -> Self {
        Self {
            level: tracing::Level::INFO,
            directives: None,
            show_target: false,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: true,
        }
    }

    /// 设置过滤指令
    pub fn with_directives(mut self, directives: impl Into<String>) -> Self {
        self.directives = Some(directives.into());
        self
    }

    /// 构建过滤器
    ///
    /// 未设置指令时优先读取 `RUST_LOG`，否则使用 `level`。
    pub fn env_filter(&self) -> Result<EnvFilter, InfrastructureError> {
        match &self.directives {
            Some(directives) => {
                EnvFilter::try_new(directives).map_err(|e| InfrastructureError::BootstrapFailed {
                    message: format!("日志过滤指令无效: {}", e),
                })
            }
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.level.as_str().to_lowercase()))),
        }
    }

    /// 安装全局日志订阅者
    ///
    /// 全局订阅者只能安装一次，重复安装返回错误。
    pub fn init(&self) -> Result<(), InfrastructureError> {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(self.env_filter()?)
            .with_target(self.show_target)
            .with_thread_ids(self.show_thread_ids)
            .with_file(self.show_file)
            .with_line_number(self.show_line_number);

        if self.json_format {
            subscriber.json().try_init()
        } else {
            subscriber.try_init()
        }
        .map_err(|e| InfrastructureError::BootstrapFailed {
            message: format!("日志初始化失败: {}", e),
        })?;

        info!("日志系统初始化完成");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let dev = LoggingConfig::development();
        assert_eq!(dev.level, tracing::Level::DEBUG);
        assert!(dev.show_line_number);
        assert!(!dev.json_format);

        let prod = LoggingConfig::production();
        assert!(prod.json_format);
        assert!(!prod.show_target);
    }

    #[test]
    fn test_invalid_directives_are_rejected() {
        let config = LoggingConfig::default().with_directives("di_impl=notalevel");
        assert!(matches!(
            config.env_filter(),
            Err(InfrastructureError::BootstrapFailed { .. })
        ));

        let config = LoggingConfig::default().with_directives("di_impl=trace,info");
        assert!(config.env_filter().is_ok());
    }
}
