//! 组件注册表抽象接口

use crate::definition::ComponentDefinition;
use infrastructure_common::{ComponentInstance, ComponentResult, DefinitionResult, TypeInfo};
use std::sync::Arc;

/// 组件定义注册表 trait
///
/// 按名称保存组件定义，冻结之后不再接受修改。
pub trait ComponentDefinitionRegistry: Send + Sync {
    /// 注册组件定义，返回被覆盖的旧定义
    fn register_definition(
        &self,
        name: &str,
        definition: ComponentDefinition,
    ) -> DefinitionResult<Option<Arc<ComponentDefinition>>>;

    /// 移除组件定义
    fn remove_definition(&self, name: &str) -> DefinitionResult<Arc<ComponentDefinition>>;

    /// 获取组件定义
    fn get_definition(&self, name: &str) -> DefinitionResult<Arc<ComponentDefinition>>;

    /// 按声明类型获取唯一的组件定义
    fn get_definition_by_type(
        &self,
        type_info: &TypeInfo,
    ) -> DefinitionResult<(String, Arc<ComponentDefinition>)>;

    /// 是否包含组件定义
    fn contains_definition(&self, name: &str) -> bool;

    /// 按注册顺序返回所有定义名称
    fn definition_names(&self) -> Vec<String>;

    /// 定义数量
    fn definition_count(&self) -> usize;

    /// 冻结配置
    fn freeze(&self);

    /// 是否已冻结
    fn is_frozen(&self) -> bool;
}

/// 单例注册表 trait
pub trait SingletonComponentRegistry: Send + Sync {
    /// 注册一个已经完成的单例
    fn register_singleton(&self, name: &str, instance: ComponentInstance) -> ComponentResult<()>;

    /// 获取已完成的单例
    fn get_singleton(&self, name: &str) -> Option<ComponentInstance>;

    /// 是否包含已完成的单例
    fn contains_singleton(&self, name: &str) -> bool;

    /// 按注册顺序返回单例名称
    fn singleton_names(&self) -> Vec<String>;

    /// 单例数量
    fn singleton_count(&self) -> usize;
}
