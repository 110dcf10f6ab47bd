//! 值转换与表达式求值抽象

use infrastructure_common::{InjectionValue, TypeInfo};

/// 类型转换服务 trait
pub trait ConversionService: Send + Sync {
    /// 是否支持从 `from` 转换到 `to`
    fn can_convert(&self, from: &TypeInfo, to: &TypeInfo) -> bool;

    /// 把值转换为目标类型
    fn convert(
        &self,
        value: InjectionValue,
        to: &TypeInfo,
        from: Option<&TypeInfo>,
    ) -> anyhow::Result<InjectionValue>;
}

/// 表达式求值上下文
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    /// 正在创建的组件名称
    pub component_name: &'a str,
    /// 组件作用域
    pub scope: &'a str,
}

/// 表达式求值器 trait
pub trait ExpressionEvaluator: Send + Sync {
    /// 对表达式求值，返回 `None` 表示结果为空
    fn evaluate(
        &self,
        expression: &str,
        context: &EvaluationContext<'_>,
    ) -> anyhow::Result<Option<serde_json::Value>>;
}
