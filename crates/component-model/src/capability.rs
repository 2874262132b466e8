//! 能力标识定义
//!
//! 每个抽象接口在进程启动时分配一个稳定的标记，全程有效

use std::fmt;

/// 能力标识
///
/// 代表一个抽象接口的不透明、可排序的身份标记。
/// 每个接口类型创建一个，生命周期覆盖整个进程；持久化时
/// 以标识文本的形式写入导出映射。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CapabilityKey(&'static str);

impl CapabilityKey {
    /// 空能力标识
    ///
    /// 注册到此标识的提取函数会被静默忽略，工厂请求此标识表示"任意能力"。
    pub const VOID: Self = Self("");

    /// 创建新的能力标识
    pub const fn new(tag: &'static str) -> Self {
        Self(tag)
    }

    /// 获取标识文本
    pub const fn tag(&self) -> &'static str {
        self.0
    }

    /// 是否为空能力标识
    pub const fn is_void(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CapabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_key_ordering() {
        let a = CapabilityKey::new("IAlpha");
        let b = CapabilityKey::new("IBeta");

        assert!(a < b);
        assert_eq!(a, CapabilityKey::new("IAlpha"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_void_capability() {
        assert!(CapabilityKey::VOID.is_void());
        assert!(!CapabilityKey::new("ISomething").is_void());
    }
}
