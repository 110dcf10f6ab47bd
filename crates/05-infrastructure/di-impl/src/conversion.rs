//! 默认类型转换服务
//!
//! 负责把配置中的字面量转换为属性要求的简单值类型，例如 `"8080"` 转为整数。

use anyhow::anyhow;
use di_abstractions::ConversionService;
use infrastructure_common::{InjectionValue, TypeInfo};
use serde_json::Value;

/// 默认类型转换服务
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultConversionService;

impl DefaultConversionService {
    /// 创建转换服务
    pub fn new() -> Self {
        Self
    }

    fn is_integer(to: &TypeInfo) -> bool {
        to.is::<i8>()
            || to.is::<i16>()
            || to.is::<i32>()
            || to.is::<i64>()
            || to.is::<isize>()
            || to.is::<u8>()
            || to.is::<u16>()
            || to.is::<u32>()
            || to.is::<u64>()
            || to.is::<usize>()
    }

    fn is_float(to: &TypeInfo) -> bool {
        to.is::<f32>() || to.is::<f64>()
    }

    fn convert_literal(value: Value, to: &TypeInfo) -> anyhow::Result<Value> {
        if to.is::<String>() {
            return Ok(match value {
                Value::String(s) => Value::String(s),
                Value::Null => Value::Null,
                other => Value::String(other.to_string()),
            });
        }
        if to.is::<bool>() {
            return match &value {
                Value::Bool(_) | Value::Null => Ok(value.clone()),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
                    "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
                    _ => Err(anyhow!("无法把 '{}' 转换为布尔值", s)),
                },
                other => Err(anyhow!("无法把 {} 转换为布尔值", other)),
            };
        }
        if Self::is_integer(to) {
            return match &value {
                Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
                Value::String(s) => {
                    let trimmed = s.trim();
                    if let Ok(v) = trimmed.parse::<i64>() {
                        Ok(Value::from(v))
                    } else {
                        trimmed
                            .parse::<u64>()
                            .map(Value::from)
                            .map_err(|_| anyhow!("无法把 '{}' 转换为整数", s))
                    }
                }
                Value::Null => Ok(Value::Null),
                other => Err(anyhow!("无法把 {} 转换为整数", other)),
            };
        }
        if Self::is_float(to) {
            return match &value {
                Value::Number(_) | Value::Null => Ok(value.clone()),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::from)
                    .map_err(|_| anyhow!("无法把 '{}' 转换为浮点数", s)),
                other => Err(anyhow!("无法把 {} 转换为浮点数", other)),
            };
        }
        Ok(value)
    }
}

impl ConversionService for DefaultConversionService {
    fn can_convert(&self, from: &TypeInfo, to: &TypeInfo) -> bool {
        from == to
            || (from.is::<Value>()
                && (to.is::<String>() || to.is::<bool>() || Self::is_integer(to) || Self::is_float(to)))
    }

    fn convert(
        &self,
        value: InjectionValue,
        to: &TypeInfo,
        _from: Option<&TypeInfo>,
    ) -> anyhow::Result<InjectionValue> {
        match value {
            InjectionValue::Literal(literal) => {
                Self::convert_literal(literal, to).map(InjectionValue::Literal)
            }
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert_to<T: 'static>(value: Value) -> anyhow::Result<Value> {
        match DefaultConversionService::new().convert(
            InjectionValue::Literal(value),
            &TypeInfo::of::<T>(),
            None,
        )? {
            InjectionValue::Literal(v) => Ok(v),
            other => panic!("期望字面量，实际: {:?}", other),
        }
    }

    #[test]
    fn test_string_literals_convert_to_numbers_and_bools() {
        assert_eq!(convert_to::<u16>(Value::from("8080")).unwrap(), Value::from(8080));
        assert_eq!(convert_to::<f64>(Value::from("0.5")).unwrap(), Value::from(0.5));
        assert_eq!(convert_to::<bool>(Value::from("yes")).unwrap(), Value::Bool(true));
        assert_eq!(convert_to::<String>(Value::from(42)).unwrap(), Value::from("42"));
        assert!(convert_to::<i32>(Value::from("abc")).is_err());
    }

    #[test]
    fn test_can_convert() {
        let service = DefaultConversionService::new();
        assert!(service.can_convert(&TypeInfo::of::<Value>(), &TypeInfo::of::<u32>()));
        assert!(!service.can_convert(&TypeInfo::of::<Value>(), &TypeInfo::of::<Vec<u8>>()));
    }
}
