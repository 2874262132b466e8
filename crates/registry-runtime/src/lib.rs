//! # Registry Runtime
//!
//! 运行时解析层，把静态注册表按需转化为活动组件实例。
//!
//! ## 核心类型
//!
//! - [`RegistryContext`] - 绑定单个注册表的惰性解析上下文，按元素记忆化
//! - [`ComponentInstance`] - 活动实例，通过提取表或复合转发暴露能力
//! - [`RegistriesManager`] - 按地址加载注册表并缓存结果（含未命中）
//! - [`CapabilityFactory`] - 独立于注册表的按键创建
//!
//! 整个解析层面向单线程使用：实例图采用 `Rc`，不含任何锁协议；
//! 并发访问需要由调用方自行串行化。

pub mod composite;
pub mod context;
pub mod factory;
pub mod instance;
pub mod manager;

pub use composite::*;
pub use context::*;
pub use factory::*;
pub use instance::*;
pub use manager::*;
