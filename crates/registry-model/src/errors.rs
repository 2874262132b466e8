//! 错误类型定义

use thiserror::Error;

/// 注册表编辑错误类型
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("元素标识重复: {element_id}")]
    DuplicateElement { element_id: String },

    #[error("元素不存在: {element_id}")]
    ElementNotFound { element_id: String },

    #[error("嵌入注册表标识重复: {registry_id}")]
    DuplicateEmbedded { registry_id: String },

    #[error("组件地址无法解析: {address} (元素 {element_id})")]
    UnresolvedAddress { element_id: String, address: String },
}

/// 归档错误类型
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("标签不匹配: 期望 {expected}, 实际 {found}")]
    TagMismatch { expected: String, found: String },

    #[error("归档数据耗尽: 读取 {context} 时无更多条目")]
    Exhausted { context: String },

    #[error("标量类型不匹配: {context}")]
    TypeMismatch { context: String },

    #[error("归档结构无效: {message}")]
    InvalidStructure { message: String },

    #[error("归档格式版本不受支持: {version}")]
    UnsupportedVersion { version: i64 },

    #[error("归档 I/O 失败: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("归档解析失败: {source}")]
    Parse {
        #[from]
        source: serde_json::Error,
    },
}

/// 结果类型别名
pub type RegistryResult<T> = Result<T, RegistryError>;
pub type ArchiveResult<T> = Result<T, ArchiveError>;
