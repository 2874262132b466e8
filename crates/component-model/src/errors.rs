//! 错误类型定义

use crate::value::ValueKind;
use thiserror::Error;

/// 元数据错误类型
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("槽位重复定义: {slot_id} (组件 {component})")]
    DuplicateSlot { component: String, slot_id: String },

    #[error("包内组件重复注册: {package_id}/{component_id}")]
    DuplicateComponent {
        package_id: String,
        component_id: String,
    },

    #[error("组件地址格式无效: {text}")]
    InvalidAddress { text: String },
}

/// 解析错误类型
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("注册表元素不存在: {element_id}")]
    ElementNotFound { element_id: String },

    #[error("组件地址无法解析: {address} (元素 {element_id})")]
    DescriptorNotFound { element_id: String, address: String },

    #[error("必需属性未设置: {slot_id} (元素 {element_id})")]
    MissingRequiredAttribute { element_id: String, slot_id: String },

    #[error("属性类型不匹配: {slot_id} (元素 {element_id}), 期望 {expected}, 实际 {actual}")]
    AttributeTypeMismatch {
        element_id: String,
        slot_id: String,
        expected: ValueKind,
        actual: ValueKind,
    },

    #[error("必需引用未接线或目标缺失: {slot_id} (元素 {element_id})")]
    MissingRequiredReference { element_id: String, slot_id: String },

    #[error("检测到引用接线循环: {element_id}")]
    CircularWiring { element_id: String },

    #[error("组件创建失败: {element_id}, 原因: {message}")]
    CreationFailed { element_id: String, message: String },
}

/// 结果类型别名
pub type MetadataResult<T> = Result<T, MetadataError>;
pub type ResolveResult<T> = Result<T, ResolveError>;
