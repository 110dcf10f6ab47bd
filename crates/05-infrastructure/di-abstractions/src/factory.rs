//! 组件工厂抽象接口
//!
//! 面向使用方的查找接口，父子容器之间也通过它委托

use crate::definition::ComponentDefinition;
use async_trait::async_trait;
use infrastructure_common::{ComponentInstance, ComponentResult, DefinitionResult, TypeInfo};
use std::sync::Arc;

/// 组件工厂 trait
#[async_trait]
pub trait ComponentFactory: Send + Sync {
    /// 按名称获取组件
    async fn get_component(&self, name: &str) -> ComponentResult<ComponentInstance>;

    /// 按类型获取唯一组件
    async fn get_component_by_type(&self, required_type: &TypeInfo) -> ComponentResult<ComponentInstance>;

    /// 是否包含组件（定义或单例）
    fn contains_component(&self, name: &str) -> bool;

    /// 是否为单例
    fn is_singleton(&self, name: &str) -> DefinitionResult<bool>;

    /// 是否为原型
    fn is_prototype(&self, name: &str) -> DefinitionResult<bool>;

    /// 组件类型，不触发创建
    fn type_of(&self, name: &str) -> Option<TypeInfo>;
}

/// 可枚举的组件工厂 trait
pub trait ListableComponentFactory: ComponentFactory {
    /// 所有定义名称
    fn definition_names(&self) -> Vec<String>;

    /// 类型匹配的组件名称，按注册顺序
    fn names_for_type(&self, type_info: &TypeInfo, include_non_singletons: bool) -> Vec<String>;

    /// 合并后的组件定义，手工注册的单例没有定义
    fn merged_definition(&self, name: &str) -> Option<Arc<ComponentDefinition>>;
}
