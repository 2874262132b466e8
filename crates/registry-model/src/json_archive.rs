//! 基于 JSON 树的归档后端
//!
//! 写出方向把标签序列累积成 `serde_json::Value` 树，读取方向按
//! 相同顺序回放。标签节编码为 `{"tag", "body"}` 对象，重复节额外
//! 携带 `"count"`，标量按出现顺序平铺在所属节的 `body` 数组里。

use crate::archive::Archive;
use crate::errors::{ArchiveError, ArchiveResult};
use serde_json::{Map, Number, Value};
use std::collections::VecDeque;

/// 写出方向的 JSON 归档
#[derive(Debug, Default)]
pub struct JsonWriteArchive {
    root: Vec<Value>,
    stack: Vec<WriteFrame>,
}

#[derive(Debug)]
struct WriteFrame {
    tag: String,
    count: Option<usize>,
    body: Vec<Value>,
}

impl JsonWriteArchive {
    /// 创建空的写出归档
    pub fn new() -> Self {
        Self::default()
    }

    /// 结束写出并取出 JSON 树
    ///
    /// 存在未闭合的标签节时失败。
    pub fn finish(self) -> ArchiveResult<Value> {
        if let Some(frame) = self.stack.last() {
            return Err(ArchiveError::InvalidStructure {
                message: format!("标签节未闭合: {}", frame.tag),
            });
        }
        Ok(Value::Array(self.root))
    }

    fn push_entry(&mut self, entry: Value) {
        match self.stack.last_mut() {
            Some(frame) => frame.body.push(entry),
            None => self.root.push(entry),
        }
    }
}

impl Archive for JsonWriteArchive {
    fn is_storing(&self) -> bool {
        true
    }

    fn begin_tag(&mut self, tag: &str) -> ArchiveResult<()> {
        self.stack.push(WriteFrame {
            tag: tag.to_owned(),
            count: None,
            body: Vec::new(),
        });
        Ok(())
    }

    fn begin_multi_tag(&mut self, tag: &str, count: &mut usize) -> ArchiveResult<()> {
        self.stack.push(WriteFrame {
            tag: tag.to_owned(),
            count: Some(*count),
            body: Vec::new(),
        });
        Ok(())
    }

    fn end_tag(&mut self, tag: &str) -> ArchiveResult<()> {
        let frame = self.stack.pop().ok_or_else(|| ArchiveError::InvalidStructure {
            message: format!("结束标签 {tag} 没有对应的开始标签"),
        })?;
        if frame.tag != tag {
            return Err(ArchiveError::TagMismatch {
                expected: frame.tag,
                found: tag.to_owned(),
            });
        }

        let mut node = Map::new();
        node.insert("tag".to_owned(), Value::String(frame.tag));
        if let Some(count) = frame.count {
            node.insert("count".to_owned(), Value::from(count));
        }
        node.insert("body".to_owned(), Value::Array(frame.body));
        self.push_entry(Value::Object(node));
        Ok(())
    }

    fn process_bool(&mut self, value: &mut bool) -> ArchiveResult<()> {
        self.push_entry(Value::Bool(*value));
        Ok(())
    }

    fn process_i64(&mut self, value: &mut i64) -> ArchiveResult<()> {
        self.push_entry(Value::Number(Number::from(*value)));
        Ok(())
    }

    fn process_f64(&mut self, value: &mut f64) -> ArchiveResult<()> {
        let number = Number::from_f64(*value).ok_or_else(|| ArchiveError::TypeMismatch {
            context: "非有限浮点数无法写入归档".to_owned(),
        })?;
        self.push_entry(Value::Number(number));
        Ok(())
    }

    fn process_string(&mut self, value: &mut String) -> ArchiveResult<()> {
        self.push_entry(Value::String(value.clone()));
        Ok(())
    }
}

/// 读取方向的 JSON 归档
#[derive(Debug)]
pub struct JsonReadArchive {
    stack: Vec<ReadFrame>,
}

#[derive(Debug)]
struct ReadFrame {
    tag: String,
    entries: VecDeque<Value>,
}

impl JsonReadArchive {
    /// 从 JSON 树创建读取归档
    pub fn new(value: Value) -> ArchiveResult<Self> {
        match value {
            Value::Array(entries) => Ok(Self {
                stack: vec![ReadFrame {
                    tag: String::new(),
                    entries: entries.into(),
                }],
            }),
            other => Err(ArchiveError::InvalidStructure {
                message: format!("归档根节点必须是数组，实际为 {other}"),
            }),
        }
    }

    fn next_entry(&mut self, context: &str) -> ArchiveResult<Value> {
        let frame = self.stack.last_mut().ok_or_else(|| ArchiveError::InvalidStructure {
            message: "归档读取已越过根节点".to_owned(),
        })?;
        frame.entries.pop_front().ok_or_else(|| ArchiveError::Exhausted {
            context: context.to_owned(),
        })
    }

    fn enter_tag(&mut self, tag: &str) -> ArchiveResult<Option<usize>> {
        let entry = self.next_entry(tag)?;
        let Value::Object(mut node) = entry else {
            return Err(ArchiveError::TagMismatch {
                expected: tag.to_owned(),
                found: "<标量>".to_owned(),
            });
        };

        let found = node
            .get("tag")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        if found != tag {
            return Err(ArchiveError::TagMismatch {
                expected: tag.to_owned(),
                found,
            });
        }

        let count = node.get("count").and_then(Value::as_u64).map(|n| n as usize);
        let body = match node.remove("body") {
            Some(Value::Array(entries)) => entries,
            _ => Vec::new(),
        };
        self.stack.push(ReadFrame {
            tag: found,
            entries: body.into(),
        });
        Ok(count)
    }
}

impl Archive for JsonReadArchive {
    fn is_storing(&self) -> bool {
        false
    }

    fn begin_tag(&mut self, tag: &str) -> ArchiveResult<()> {
        self.enter_tag(tag)?;
        Ok(())
    }

    fn begin_multi_tag(&mut self, tag: &str, count: &mut usize) -> ArchiveResult<()> {
        *count = self.enter_tag(tag)?.unwrap_or(0);
        Ok(())
    }

    fn end_tag(&mut self, tag: &str) -> ArchiveResult<()> {
        if self.stack.len() <= 1 {
            return Err(ArchiveError::InvalidStructure {
                message: format!("结束标签 {tag} 没有对应的开始标签"),
            });
        }
        let frame = self.stack.pop().ok_or_else(|| ArchiveError::InvalidStructure {
            message: "归档读取已越过根节点".to_owned(),
        })?;
        if frame.tag != tag {
            return Err(ArchiveError::TagMismatch {
                expected: frame.tag,
                found: tag.to_owned(),
            });
        }
        Ok(())
    }

    fn process_bool(&mut self, value: &mut bool) -> ArchiveResult<()> {
        let entry = self.next_entry("bool")?;
        *value = entry.as_bool().ok_or_else(|| ArchiveError::TypeMismatch {
            context: format!("期望布尔值，实际为 {entry}"),
        })?;
        Ok(())
    }

    fn process_i64(&mut self, value: &mut i64) -> ArchiveResult<()> {
        let entry = self.next_entry("i64")?;
        *value = entry.as_i64().ok_or_else(|| ArchiveError::TypeMismatch {
            context: format!("期望整数，实际为 {entry}"),
        })?;
        Ok(())
    }

    fn process_f64(&mut self, value: &mut f64) -> ArchiveResult<()> {
        let entry = self.next_entry("f64")?;
        *value = entry.as_f64().ok_or_else(|| ArchiveError::TypeMismatch {
            context: format!("期望浮点数，实际为 {entry}"),
        })?;
        Ok(())
    }

    fn process_string(&mut self, value: &mut String) -> ArchiveResult<()> {
        let entry = self.next_entry("string")?;
        *value = entry
            .as_str()
            .ok_or_else(|| ArchiveError::TypeMismatch {
                context: format!("期望文本，实际为 {entry}"),
            })?
            .to_owned();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_tags_round_trip() {
        let mut writer = JsonWriteArchive::new();
        writer.begin_tag("outer").unwrap();
        writer.process_string(&mut "hello".to_owned()).unwrap();
        writer.begin_tag("inner").unwrap();
        writer.process_i64(&mut 42).unwrap();
        writer.process_f64(&mut 0.1).unwrap();
        writer.end_tag("inner").unwrap();
        writer.process_bool(&mut true).unwrap();
        writer.end_tag("outer").unwrap();

        let tree = writer.finish().unwrap();
        let mut reader = JsonReadArchive::new(tree).unwrap();

        reader.begin_tag("outer").unwrap();
        let mut text = String::new();
        reader.process_string(&mut text).unwrap();
        assert_eq!(text, "hello");

        reader.begin_tag("inner").unwrap();
        let mut int_value = 0_i64;
        reader.process_i64(&mut int_value).unwrap();
        assert_eq!(int_value, 42);
        let mut real_value = 0.0_f64;
        reader.process_f64(&mut real_value).unwrap();
        assert_eq!(real_value, 0.1);
        reader.end_tag("inner").unwrap();

        let mut flag = false;
        reader.process_bool(&mut flag).unwrap();
        assert!(flag);
        reader.end_tag("outer").unwrap();
    }

    #[test]
    fn test_multi_tag_count() {
        let mut writer = JsonWriteArchive::new();
        let mut count = 3_usize;
        writer.begin_multi_tag("items", &mut count).unwrap();
        for index in 0..3_i64 {
            writer.begin_tag("item").unwrap();
            writer.process_i64(&mut (index * 10)).unwrap();
            writer.end_tag("item").unwrap();
        }
        writer.end_tag("items").unwrap();

        let mut reader = JsonReadArchive::new(writer.finish().unwrap()).unwrap();
        let mut loaded_count = 0_usize;
        reader.begin_multi_tag("items", &mut loaded_count).unwrap();
        assert_eq!(loaded_count, 3);
        for index in 0..3_i64 {
            reader.begin_tag("item").unwrap();
            let mut value = 0_i64;
            reader.process_i64(&mut value).unwrap();
            assert_eq!(value, index * 10);
            reader.end_tag("item").unwrap();
        }
        reader.end_tag("items").unwrap();
    }

    #[test]
    fn test_tag_mismatch_detected() {
        let mut writer = JsonWriteArchive::new();
        writer.begin_tag("expected").unwrap();
        writer.end_tag("expected").unwrap();

        let mut reader = JsonReadArchive::new(writer.finish().unwrap()).unwrap();
        assert!(matches!(
            reader.begin_tag("other"),
            Err(ArchiveError::TagMismatch { .. })
        ));
    }

    #[test]
    fn test_scalar_type_mismatch_detected() {
        let mut writer = JsonWriteArchive::new();
        writer.process_string(&mut "text".to_owned()).unwrap();

        let mut reader = JsonReadArchive::new(writer.finish().unwrap()).unwrap();
        let mut value = 0_i64;
        assert!(matches!(
            reader.process_i64(&mut value),
            Err(ArchiveError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_unclosed_tag_rejected() {
        let mut writer = JsonWriteArchive::new();
        writer.begin_tag("open").unwrap();
        assert!(writer.finish().is_err());
    }
}
