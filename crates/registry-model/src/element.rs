//! 注册表元素定义
//!
//! 元素把一个本地标识绑定到组件地址、属性值和引用接线

use crate::archive::{Archive, Serializable};
use crate::errors::{ArchiveError, ArchiveResult};
use component_model::{AttributeValue, ComponentAddress, ValueKind};
use std::collections::BTreeMap;

/// 注册表元素
///
/// 布局坐标仅供编辑器摆放使用，不参与解析语义。
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryElement {
    address: ComponentAddress,
    attributes: BTreeMap<String, AttributeValue>,
    references: BTreeMap<String, Vec<String>>,
    layout_position: (f64, f64),
}

impl RegistryElement {
    /// 创建指向给定地址的空元素
    pub fn new(address: ComponentAddress) -> Self {
        Self {
            address,
            attributes: BTreeMap::new(),
            references: BTreeMap::new(),
            layout_position: (0.0, 0.0),
        }
    }

    /// 组件地址
    pub fn address(&self) -> &ComponentAddress {
        &self.address
    }

    /// 设置属性值
    pub fn set_attribute(&mut self, slot_id: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.insert(slot_id.into(), value.into());
    }

    /// 读取属性值
    pub fn attribute(&self, slot_id: &str) -> Option<&AttributeValue> {
        self.attributes.get(slot_id)
    }

    /// 清除属性值
    pub fn clear_attribute(&mut self, slot_id: &str) -> bool {
        self.attributes.remove(slot_id).is_some()
    }

    /// 全部属性值
    pub fn attributes(&self) -> &BTreeMap<String, AttributeValue> {
        &self.attributes
    }

    /// 设置单目标引用接线
    pub fn set_reference(&mut self, slot_id: impl Into<String>, target_id: impl Into<String>) {
        self.references.insert(slot_id.into(), vec![target_id.into()]);
    }

    /// 设置多目标引用接线
    pub fn set_references(&mut self, slot_id: impl Into<String>, target_ids: Vec<String>) {
        self.references.insert(slot_id.into(), target_ids);
    }

    /// 读取引用接线目标
    pub fn references(&self, slot_id: &str) -> &[String] {
        self.references
            .get(slot_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// 清除引用接线
    pub fn clear_references(&mut self, slot_id: &str) -> bool {
        self.references.remove(slot_id).is_some()
    }

    /// 全部引用接线
    pub fn reference_wiring(&self) -> &BTreeMap<String, Vec<String>> {
        &self.references
    }

    /// 设置布局坐标
    pub fn set_layout_position(&mut self, x: f64, y: f64) {
        self.layout_position = (x, y);
    }

    /// 布局坐标
    pub fn layout_position(&self) -> (f64, f64) {
        self.layout_position
    }
}

impl Serializable for RegistryElement {
    fn serialize(&mut self, archive: &mut dyn Archive) -> ArchiveResult<()> {
        let mut address_text = self.address.to_string();
        archive.process_string(&mut address_text)?;
        if !archive.is_storing() {
            self.address =
                address_text
                    .parse()
                    .map_err(|_| ArchiveError::InvalidStructure {
                        message: format!("组件地址格式无效: {address_text}"),
                    })?;
        }

        serialize_attributes(&mut self.attributes, archive)?;
        serialize_references(&mut self.references, archive)?;
        Ok(())
    }
}

fn serialize_attributes(
    attributes: &mut BTreeMap<String, AttributeValue>,
    archive: &mut dyn Archive,
) -> ArchiveResult<()> {
    let mut count = attributes.len();
    archive.begin_multi_tag("attributes", &mut count)?;

    if archive.is_storing() {
        for (slot_id, value) in attributes.iter_mut() {
            archive.begin_tag("attribute")?;
            let mut slot_id = slot_id.clone();
            archive.process_string(&mut slot_id)?;
            process_value(value, archive)?;
            archive.end_tag("attribute")?;
        }
    } else {
        attributes.clear();
        for _ in 0..count {
            archive.begin_tag("attribute")?;
            let mut slot_id = String::new();
            archive.process_string(&mut slot_id)?;
            let mut value = AttributeValue::Bool(false);
            process_value(&mut value, archive)?;
            archive.end_tag("attribute")?;
            attributes.insert(slot_id, value);
        }
    }

    archive.end_tag("attributes")
}

fn serialize_references(
    references: &mut BTreeMap<String, Vec<String>>,
    archive: &mut dyn Archive,
) -> ArchiveResult<()> {
    let mut count = references.len();
    archive.begin_multi_tag("references", &mut count)?;

    if archive.is_storing() {
        for (slot_id, targets) in references.iter_mut() {
            archive.begin_tag("reference")?;
            let mut slot_id = slot_id.clone();
            archive.process_string(&mut slot_id)?;
            let mut target_count = targets.len() as i64;
            archive.process_i64(&mut target_count)?;
            for target in targets.iter_mut() {
                archive.process_string(target)?;
            }
            archive.end_tag("reference")?;
        }
    } else {
        references.clear();
        for _ in 0..count {
            archive.begin_tag("reference")?;
            let mut slot_id = String::new();
            archive.process_string(&mut slot_id)?;
            let mut target_count = 0_i64;
            archive.process_i64(&mut target_count)?;
            let mut targets = Vec::new();
            for _ in 0..target_count {
                let mut target = String::new();
                archive.process_string(&mut target)?;
                targets.push(target);
            }
            archive.end_tag("reference")?;
            references.insert(slot_id, targets);
        }
    }

    archive.end_tag("references")
}

/// 按归档方向处理一个属性值：类型标记在前，载荷在后
pub fn process_value(value: &mut AttributeValue, archive: &mut dyn Archive) -> ArchiveResult<()> {
    let mut kind_name = value.kind().name().to_owned();
    archive.process_string(&mut kind_name)?;

    if archive.is_storing() {
        match value {
            AttributeValue::Bool(payload) => archive.process_bool(payload),
            AttributeValue::Int(payload) => archive.process_i64(payload),
            AttributeValue::Real(payload) => archive.process_f64(payload),
            AttributeValue::Text(payload) => archive.process_string(payload),
            AttributeValue::TextList(items) => {
                let mut item_count = items.len() as i64;
                archive.process_i64(&mut item_count)?;
                for item in items.iter_mut() {
                    archive.process_string(item)?;
                }
                Ok(())
            }
        }
    } else {
        let kind = ValueKind::from_name(&kind_name).ok_or_else(|| ArchiveError::InvalidStructure {
            message: format!("未知的属性值类型: {kind_name}"),
        })?;
        *value = match kind {
            ValueKind::Bool => {
                let mut payload = false;
                archive.process_bool(&mut payload)?;
                AttributeValue::Bool(payload)
            }
            ValueKind::Int => {
                let mut payload = 0_i64;
                archive.process_i64(&mut payload)?;
                AttributeValue::Int(payload)
            }
            ValueKind::Real => {
                let mut payload = 0.0_f64;
                archive.process_f64(&mut payload)?;
                AttributeValue::Real(payload)
            }
            ValueKind::Text => {
                let mut payload = String::new();
                archive.process_string(&mut payload)?;
                AttributeValue::Text(payload)
            }
            ValueKind::TextList => {
                let mut item_count = 0_i64;
                archive.process_i64(&mut item_count)?;
                let mut items = Vec::new();
                for _ in 0..item_count {
                    let mut item = String::new();
                    archive.process_string(&mut item)?;
                    items.push(item);
                }
                AttributeValue::TextList(items)
            }
        };
        Ok(())
    }
}
