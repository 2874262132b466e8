//! 属性值定义
//!
//! 属性槽位可承载的标量值及其类型标记

use serde::{Deserialize, Serialize};
use std::fmt;

/// 属性值
///
/// 注册表元素为属性槽位配置的具体值。数值载荷在持久化往返中保持精确。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum AttributeValue {
    /// 布尔值
    Bool(bool),
    /// 整数值
    Int(i64),
    /// 浮点值
    Real(f64),
    /// 文本值
    Text(String),
    /// 文本列表
    TextList(Vec<String>),
}

impl AttributeValue {
    /// 获取值的类型标记
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Real(_) => ValueKind::Real,
            Self::Text(_) => ValueKind::Text,
            Self::TextList(_) => ValueKind::TextList,
        }
    }

    /// 作为布尔值读取
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// 作为整数读取
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// 作为浮点数读取
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(value) => Some(*value),
            _ => None,
        }
    }

    /// 作为文本读取
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    /// 作为文本列表读取
    pub fn as_text_list(&self) -> Option<&[String]> {
        match self {
            Self::TextList(values) => Some(values),
            _ => None,
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// 属性值类型标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    /// 布尔类型
    Bool,
    /// 整数类型
    Int,
    /// 浮点类型
    Real,
    /// 文本类型
    Text,
    /// 文本列表类型
    TextList,
}

impl ValueKind {
    /// 类型标记的文本名称，用于持久化和诊断
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Real => "real",
            Self::Text => "text",
            Self::TextList => "textList",
        }
    }

    /// 从文本名称还原类型标记
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bool" => Some(Self::Bool),
            "int" => Some(Self::Int),
            "real" => Some(Self::Real),
            "text" => Some(Self::Text),
            "textList" => Some(Self::TextList),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
