//! 组件容器构建器

use crate::logging::LoggingConfig;
use crate::runtime::ComponentContainer;
use di_abstractions::{
    ComponentDefinition, ComponentPostProcessor, ConversionService, ExpressionEvaluator,
    ListableComponentFactory, MetadataProvider, Scope, TypeDescriptor,
};
use di_impl::{ContainerOptions, DefaultComponentFactory, DescriptorTable};
use infrastructure_common::{ComponentInstance, InfrastructureError, TypeInfo};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 组件容器构建器
///
/// 收集选项、元数据、定义与扩展点，`build` 时一次性注册到新的
/// [`DefaultComponentFactory`] 并按需冻结配置。
pub struct ContainerBuilder {
    /// 直接指定的选项
    options: ContainerOptions,
    /// 选项文件
    options_file: Option<PathBuf>,
    /// 选项环境变量前缀
    env_prefix: Option<String>,
    /// 自定义元数据提供者
    metadata: Option<Arc<dyn MetadataProvider>>,
    /// 内置类型描述表
    descriptors: DescriptorTable,
    /// 父工厂
    parent: Option<Arc<dyn ListableComponentFactory>>,
    /// 组件定义，按添加顺序
    definitions: Vec<(String, ComponentDefinition)>,
    /// 预先构造好的单例
    singletons: Vec<(String, ComponentInstance)>,
    /// 后置处理器
    processors: Vec<Arc<dyn ComponentPostProcessor>>,
    /// 自定义作用域
    scopes: Vec<(String, Arc<dyn Scope>)>,
    /// 忽略的依赖类型
    ignored_types: Vec<TypeInfo>,
    /// 可直接解析的依赖
    resolvable: Vec<(TypeInfo, ComponentInstance)>,
    conversion: Option<Arc<dyn ConversionService>>,
    evaluator: Option<Arc<dyn ExpressionEvaluator>>,
    /// 构建后是否冻结配置
    freeze: bool,
    /// 启动时是否预实例化单例
    eager_singletons: bool,
    /// 日志配置，`None` 表示不初始化日志
    logging: Option<LoggingConfig>,
}

impl ContainerBuilder {
    /// 创建新的容器构建器
    pub fn new() -> Self {
        Self {
            options: ContainerOptions::default(),
            options_file: None,
            env_prefix: None,
            metadata: None,
            descriptors: DescriptorTable::new(),
            parent: None,
            definitions: Vec::new(),
            singletons: Vec::new(),
            processors: Vec::new(),
            scopes: Vec::new(),
            ignored_types: Vec::new(),
            resolvable: Vec::new(),
            conversion: None,
            evaluator: None,
            freeze: true,
            eager_singletons: true,
            logging: None,
        }
    }

    /// 直接指定容器选项
    pub fn with_options(mut self, options: ContainerOptions) -> Self {
        self.options = options;
        self
    }

    /// 从文件加载容器选项
    ///
    /// 文件在 `build` 时读取，加载结果替换 [`with_options`](Self::with_options) 的值。
    pub fn add_options_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, InfrastructureError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(InfrastructureError::BootstrapFailed {
                message: format!("配置文件不存在: {}", path.display()),
            });
        }
        info!("添加容器选项文件: {}", path.display());
        self.options_file = Some(path.to_path_buf());
        Ok(self)
    }

    /// 从环境变量加载容器选项
    pub fn add_options_env_vars<S: Into<String>>(mut self, prefix: S) -> Self {
        let prefix = prefix.into();
        info!("添加容器选项环境变量，前缀: {}", prefix);
        self.env_prefix = Some(prefix);
        self
    }

    /// 使用自定义元数据提供者，之后通过 [`describe`](Self::describe) 添加的描述将被忽略
    pub fn with_metadata(mut self, metadata: Arc<dyn MetadataProvider>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// 在内置描述表中登记类型描述
    pub fn describe(self, descriptor: TypeDescriptor) -> Self {
        self.descriptors.register(descriptor);
        self
    }

    /// 设置父工厂
    pub fn with_parent(mut self, parent: Arc<dyn ListableComponentFactory>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// 添加组件定义
    pub fn add_definition<S: Into<String>>(mut self, name: S, definition: ComponentDefinition) -> Self {
        self.definitions.push((name.into(), definition));
        self
    }

    /// 添加预先构造好的单例
    pub fn add_singleton<S: Into<String>>(mut self, name: S, instance: ComponentInstance) -> Self {
        self.singletons.push((name.into(), instance));
        self
    }

    /// 添加后置处理器
    pub fn add_processor(mut self, processor: Arc<dyn ComponentPostProcessor>) -> Self {
        debug!("添加后置处理器: {}", processor.name());
        self.processors.push(processor);
        self
    }

    /// 注册自定义作用域
    pub fn add_scope<S: Into<String>>(mut self, id: S, scope: Arc<dyn Scope>) -> Self {
        self.scopes.push((id.into(), scope));
        self
    }

    /// 忽略某类型的依赖，注入时得到空值
    pub fn ignore_dependency_type(mut self, type_info: TypeInfo) -> Self {
        self.ignored_types.push(type_info);
        self
    }

    /// 某类型的依赖直接使用给定实例
    pub fn add_resolvable_dependency(mut self, type_info: TypeInfo, instance: ComponentInstance) -> Self {
        self.resolvable.push((type_info, instance));
        self
    }

    /// 替换类型转换服务
    pub fn with_conversion_service(mut self, conversion: Arc<dyn ConversionService>) -> Self {
        self.conversion = Some(conversion);
        self
    }

    /// 设置表达式求值器
    pub fn with_expression_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// 构建后是否冻结配置
    pub fn freeze_configuration(mut self, freeze: bool) -> Self {
        self.freeze = freeze;
        self
    }

    /// 启动时是否预实例化单例
    pub fn eager_singletons(mut self, eager: bool) -> Self {
        self.eager_singletons = eager;
        self
    }

    /// 配置日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging = Some(config);
        self
    }

    /// 构建容器
    pub async fn build(self) -> Result<ComponentContainer, InfrastructureError> {
        // 全局订阅者只能安装一次，测试中通常不配置日志
        if let Some(logging) = &self.logging {
            logging.init()?;
        }
        info!("开始构建组件容器");

        let options = self.resolve_options()?;
        let metadata: Arc<dyn MetadataProvider> = match self.metadata {
            Some(metadata) => {
                if !self.descriptors.is_empty() {
                    warn!("已指定元数据提供者，忽略 {} 个登记的类型描述", self.descriptors.len());
                }
                metadata
            }
            None => Arc::new(self.descriptors),
        };

        let factory = match self.parent {
            Some(parent) => DefaultComponentFactory::with_parent(parent, metadata, options),
            None => DefaultComponentFactory::with_options(metadata, options),
        };

        if let Some(conversion) = self.conversion {
            factory.set_conversion_service(conversion);
        }
        if let Some(evaluator) = self.evaluator {
            factory.set_expression_evaluator(evaluator);
        }
        for (id, scope) in self.scopes {
            factory.register_scope(&id, scope)?;
        }
        for processor in self.processors {
            factory.add_processor(processor);
        }
        for type_info in self.ignored_types {
            factory.register_ignored_dependency(type_info);
        }
        for (type_info, instance) in self.resolvable {
            factory.register_resolvable_dependency(type_info, instance);
        }
        for (name, instance) in self.singletons {
            factory.register_singleton(&name, instance)?;
        }
        for (name, definition) in self.definitions {
            factory.register_definition(&name, definition).await?;
        }

        if self.freeze {
            factory.freeze_configuration();
        }

        info!("组件容器构建完成，共 {} 个定义", factory.definition_count());
        Ok(ComponentContainer::new(factory, self.eager_singletons))
    }

    fn resolve_options(&self) -> Result<ContainerOptions, InfrastructureError> {
        if self.options_file.is_none() && self.env_prefix.is_none() {
            return Ok(self.options);
        }
        let options = ContainerOptions::load(self.options_file.as_deref(), self.env_prefix.as_deref())?;
        debug!("已加载容器选项: {:?}", options);
        Ok(options)
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
