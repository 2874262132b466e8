//! 层级标签归档契约
//!
//! 同一段 `serialize` 代码按归档方向写出或回放相同的标签序列，
//! 任何满足此契约的后端（内存、文本、二进制）可以互换。

use crate::errors::ArchiveResult;

/// 当前持久化格式版本
pub const FORMAT_VERSION: i64 = 1;

/// 层级标签归档
///
/// 标签通过 `begin_tag`/`end_tag` 成对出现；重复节通过
/// `begin_multi_tag` 声明条目数量；标量通过一组固定的
/// process 操作按出现顺序读写。
pub trait Archive {
    /// 归档是否处于写出方向
    fn is_storing(&self) -> bool;

    /// 进入一个标签节
    fn begin_tag(&mut self, tag: &str) -> ArchiveResult<()>;

    /// 进入一个重复标签节
    ///
    /// 写出时 `count` 为调用方即将写出的条目数；读取时被填充为归档中的条目数。
    fn begin_multi_tag(&mut self, tag: &str, count: &mut usize) -> ArchiveResult<()>;

    /// 离开当前标签节
    fn end_tag(&mut self, tag: &str) -> ArchiveResult<()>;

    /// 处理布尔标量
    fn process_bool(&mut self, value: &mut bool) -> ArchiveResult<()>;

    /// 处理整数标量
    fn process_i64(&mut self, value: &mut i64) -> ArchiveResult<()>;

    /// 处理浮点标量，往返保持精确值
    fn process_f64(&mut self, value: &mut f64) -> ArchiveResult<()>;

    /// 处理文本标量
    fn process_string(&mut self, value: &mut String) -> ArchiveResult<()>;
}

/// 可通过归档往返的类型
pub trait Serializable {
    /// 按归档方向写出或回放自身状态
    fn serialize(&mut self, archive: &mut dyn Archive) -> ArchiveResult<()>;
}
