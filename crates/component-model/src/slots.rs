//! 槽位描述定义
//!
//! 槽位是组件描述符上的命名配置点：属性槽位承载值，引用槽位承载到其他组件的接线

use crate::capability::CapabilityKey;
use crate::value::{AttributeValue, ValueKind};

/// 属性槽位描述
#[derive(Debug, Clone)]
pub struct AttributeSlot {
    /// 槽位标识
    pub id: String,
    /// 值类型
    pub kind: ValueKind,
    /// 槽位描述
    pub description: String,
    /// 是否必需
    pub required: bool,
    /// 默认值
    pub default: Option<AttributeValue>,
}

impl AttributeSlot {
    /// 创建新的属性槽位描述
    pub fn new(id: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            id: id.into(),
            kind,
            description: String::new(),
            required: false,
            default: None,
        }
    }

    /// 设置描述
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// 设置为必需
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// 设置默认值
    pub fn with_default(mut self, value: impl Into<AttributeValue>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// 引用槽位的基数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    /// 单个目标
    Single,
    /// 多个目标
    Multi,
}

/// 引用槽位描述
#[derive(Debug, Clone)]
pub struct ReferenceSlot {
    /// 槽位标识
    pub id: String,
    /// 目标必须提供的能力
    pub capability: CapabilityKey,
    /// 是否必需
    pub required: bool,
    /// 基数
    pub multiplicity: Multiplicity,
}

impl ReferenceSlot {
    /// 创建新的引用槽位描述，默认可选、单目标
    pub fn new(id: impl Into<String>, capability: CapabilityKey) -> Self {
        Self {
            id: id.into(),
            capability,
            required: false,
            multiplicity: Multiplicity::Single,
        }
    }

    /// 设置为必需
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// 设置为多目标
    pub fn multi(mut self) -> Self {
        self.multiplicity = Multiplicity::Multi;
        self
    }
}
