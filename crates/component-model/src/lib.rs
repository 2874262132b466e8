//! # Component Model
//!
//! 组件元数据层，定义能力标识、配置槽位和组件描述符的核心模型。
//!
//! ## 核心类型
//!
//! - [`CapabilityKey`] - 能力标识（抽象接口的进程内唯一标记）
//! - [`AttributeValue`] - 属性槽位的标量值
//! - [`ComponentDescriptor`] - 组件类的静态元数据，支持父级级联查找
//! - [`DescriptorBuilder`] - 描述符的显式构建器
//! - [`ComponentCatalog`] - 按地址解析描述符的组件目录
//!
//! ## 设计原则
//!
//! - 元数据在模块初始化阶段构建一次，之后不可变、只读共享
//! - 能力提取不依赖运行时类型系统，使用显式的提取函数表
//! - 子描述符只继承元数据，不继承实现

pub mod address;
pub mod capability;
pub mod catalog;
pub mod component;
pub mod descriptor;
pub mod errors;
pub mod slots;
pub mod value;

pub use address::*;
pub use capability::*;
pub use catalog::*;
pub use component::*;
pub use descriptor::*;
pub use errors::*;
pub use slots::*;
pub use value::*;
