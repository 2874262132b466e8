//! 按键工厂
//!
//! 不经过注册表机制的简单创建路径：按能力标识直接产出
//! 实现该能力的新对象

use component_model::{CapabilityHandle, CapabilityKey};
use std::rc::Rc;

/// 按键工厂 trait
pub trait CapabilityFactory {
    /// 工厂可产出的能力标识集合
    fn factory_keys(&self) -> Vec<CapabilityKey>;

    /// 创建实现目标能力的新对象
    ///
    /// 标识不匹配时返回 `None`；空标识表示接受任意能力。
    fn create_instance(&self, key: CapabilityKey) -> Option<CapabilityHandle>;
}

/// 产出单一能力的工厂实现
pub struct SingleCapabilityFactory {
    key: CapabilityKey,
    create: Box<dyn Fn() -> CapabilityHandle>,
}

impl SingleCapabilityFactory {
    /// 用能力标识和创建闭包构造工厂
    pub fn new<T, F>(key: CapabilityKey, create: F) -> Self
    where
        T: ?Sized + 'static,
        F: Fn() -> Rc<T> + 'static,
    {
        Self {
            key,
            create: Box::new(move || Box::new(create()) as CapabilityHandle),
        }
    }
}

impl CapabilityFactory for SingleCapabilityFactory {
    fn factory_keys(&self) -> Vec<CapabilityKey> {
        vec![self.key]
    }

    fn create_instance(&self, key: CapabilityKey) -> Option<CapabilityHandle> {
        if key.is_void() || key == self.key {
            Some((self.create)())
        } else {
            None
        }
    }
}
