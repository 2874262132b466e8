//! 注册表定义
//!
//! 注册表持有声明式对象图：命名元素、导出映射、嵌入注册表，
//! 并负责整体的持久化往返

use crate::archive::{Archive, Serializable, FORMAT_VERSION};
use crate::element::RegistryElement;
use crate::errors::{ArchiveError, ArchiveResult, RegistryError, RegistryResult};
use component_model::{CapabilityKey, ComponentAddress, ComponentCatalog};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// 注册表
///
/// 编辑阶段可变；交付给解析上下文后视为只读，之后的修改对
/// 已创建的实例不产生约定行为。
#[derive(Clone, Default)]
pub struct Registry {
    elements: BTreeMap<String, RegistryElement>,
    exported_interfaces: BTreeMap<String, String>,
    exported_elements: BTreeMap<String, String>,
    embedded: BTreeMap<String, Arc<Registry>>,
    description: String,
    keywords: String,
    catalog: Option<Arc<dyn ComponentCatalog>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("elements", &self.elements)
            .field("exported_interfaces", &self.exported_interfaces)
            .field("exported_elements", &self.exported_elements)
            .field("embedded", &self.embedded.keys().collect::<Vec<_>>())
            .field("description", &self.description)
            .field("keywords", &self.keywords)
            .field("catalog", &self.catalog.as_ref().map(|_| "<catalog>"))
            .finish()
    }
}

impl Registry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建绑定组件目录的注册表
    ///
    /// 绑定目录后，`insert_element` 才能立即校验组件地址。
    pub fn with_catalog(catalog: Arc<dyn ComponentCatalog>) -> Self {
        Self {
            catalog: Some(catalog),
            ..Self::default()
        }
    }

    /// 设置组件目录
    pub fn set_catalog(&mut self, catalog: Arc<dyn ComponentCatalog>) {
        self.catalog = Some(catalog);
    }

    /// 绑定的组件目录
    pub fn catalog(&self) -> Option<&Arc<dyn ComponentCatalog>> {
        self.catalog.as_ref()
    }

    /// 元素数量
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// 全部元素标识
    pub fn element_ids(&self) -> Vec<&str> {
        self.elements.keys().map(String::as_str).collect()
    }

    /// 读取元素
    pub fn element(&self, element_id: &str) -> Option<&RegistryElement> {
        self.elements.get(element_id)
    }

    /// 可变读取元素
    pub fn element_mut(&mut self, element_id: &str) -> Option<&mut RegistryElement> {
        self.elements.get_mut(element_id)
    }

    /// 插入新元素
    ///
    /// `ensure_created` 要求地址立即可解析：配置错误在插入时上报，
    /// 而不是推迟到解析阶段。标识重复时失败。
    pub fn insert_element(
        &mut self,
        element_id: impl Into<String>,
        address: ComponentAddress,
        ensure_created: bool,
    ) -> RegistryResult<&mut RegistryElement> {
        let element_id = element_id.into();
        if self.elements.contains_key(&element_id) {
            return Err(RegistryError::DuplicateElement { element_id });
        }

        if ensure_created && !self.address_resolvable(&address) {
            warn!(element_id = %element_id, address = %address, "无法为该地址创建元素");
            return Err(RegistryError::UnresolvedAddress {
                element_id,
                address: address.to_string(),
            });
        }

        let element = RegistryElement::new(address);
        Ok(self.elements.entry(element_id).or_insert(element))
    }

    /// 移除元素
    pub fn remove_element(&mut self, element_id: &str) -> bool {
        self.elements.remove(element_id).is_some()
    }

    /// 重命名元素
    ///
    /// 只移动元素自身的键；指向旧标识的既有接线不会被改写，
    /// 善后属于调用方的职责。新标识冲突时失败。
    pub fn rename_element(&mut self, old_id: &str, new_id: impl Into<String>) -> RegistryResult<()> {
        let new_id = new_id.into();
        if self.elements.contains_key(&new_id) {
            return Err(RegistryError::DuplicateElement { element_id: new_id });
        }
        let element = self
            .elements
            .remove(old_id)
            .ok_or_else(|| RegistryError::ElementNotFound {
                element_id: old_id.to_owned(),
            })?;
        self.elements.insert(new_id, element);
        Ok(())
    }

    /// 设置能力导出
    ///
    /// `element_path` 为 `元素标识` 或 `元素标识.内部子路径`；
    /// 首段必须指向本注册表的既有元素。`exported` 为假时撤销导出。
    pub fn set_interface_exported(
        &mut self,
        element_path: &str,
        capability: CapabilityKey,
        exported: bool,
    ) -> RegistryResult<()> {
        if !exported {
            self.exported_interfaces.remove(capability.tag());
            return Ok(());
        }

        let element_id = element_path.split('.').next().unwrap_or(element_path);
        if !self.elements.contains_key(element_id) {
            return Err(RegistryError::ElementNotFound {
                element_id: element_id.to_owned(),
            });
        }
        self.exported_interfaces
            .insert(capability.tag().to_owned(), element_path.to_owned());
        Ok(())
    }

    /// 设置元素别名导出
    pub fn set_element_exported(
        &mut self,
        export_id: impl Into<String>,
        element_id: impl Into<String>,
    ) -> RegistryResult<()> {
        let element_id = element_id.into();
        if !self.elements.contains_key(&element_id) {
            return Err(RegistryError::ElementNotFound { element_id });
        }
        self.exported_elements.insert(export_id.into(), element_id);
        Ok(())
    }

    /// 撤销元素别名导出
    pub fn remove_exported_element(&mut self, export_id: &str) -> bool {
        self.exported_elements.remove(export_id).is_some()
    }

    /// 能力导出映射
    pub fn exported_interfaces(&self) -> &BTreeMap<String, String> {
        &self.exported_interfaces
    }

    /// 元素别名导出映射
    pub fn exported_elements(&self) -> &BTreeMap<String, String> {
        &self.exported_elements
    }

    /// 插入嵌入注册表
    pub fn insert_embedded_registry(
        &mut self,
        registry_id: impl Into<String>,
        registry: Arc<Registry>,
    ) -> RegistryResult<()> {
        let registry_id = registry_id.into();
        if self.embedded.contains_key(&registry_id) {
            return Err(RegistryError::DuplicateEmbedded { registry_id });
        }
        self.embedded.insert(registry_id, registry);
        Ok(())
    }

    /// 读取嵌入注册表
    pub fn embedded_registry(&self, registry_id: &str) -> Option<&Arc<Registry>> {
        self.embedded.get(registry_id)
    }

    /// 移除嵌入注册表
    pub fn remove_embedded_registry(&mut self, registry_id: &str) -> bool {
        self.embedded.remove(registry_id).is_some()
    }

    /// 嵌入注册表数量
    pub fn embedded_count(&self) -> usize {
        self.embedded.len()
    }

    /// 注册表描述
    pub fn description(&self) -> &str {
        &self.description
    }

    /// 设置注册表描述
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// 注册表关键字
    pub fn keywords(&self) -> &str {
        &self.keywords
    }

    /// 设置注册表关键字
    pub fn set_keywords(&mut self, keywords: impl Into<String>) {
        self.keywords = keywords.into();
    }

    fn address_resolvable(&self, address: &ComponentAddress) -> bool {
        if address.is_embedded() {
            return self.embedded.contains_key(address.component_id());
        }
        match &self.catalog {
            Some(catalog) => catalog.find_descriptor(address).is_some(),
            None => {
                // 未绑定目录时退化为仅记录，与无工厂的注册表行为一致
                debug!(address = %address, "注册表未绑定组件目录，跳过地址校验");
                true
            }
        }
    }

    /// 读取方向返回暂存的坐标表，待元素表加载完成后回填
    fn serialize_position_map(
        &mut self,
        archive: &mut dyn Archive,
    ) -> ArchiveResult<Vec<(String, f64, f64)>> {
        let mut count = self.elements.len();
        archive.begin_multi_tag("positionMap", &mut count)?;

        let mut positions = Vec::new();
        if archive.is_storing() {
            for (element_id, element) in self.elements.iter_mut() {
                archive.begin_tag("item")?;
                let mut element_id = element_id.clone();
                archive.process_string(&mut element_id)?;
                let (mut x, mut y) = element.layout_position();
                archive.process_f64(&mut x)?;
                archive.process_f64(&mut y)?;
                archive.end_tag("item")?;
            }
        } else {
            positions.reserve(count);
            for _ in 0..count {
                archive.begin_tag("item")?;
                let mut element_id = String::new();
                archive.process_string(&mut element_id)?;
                let mut x = 0.0_f64;
                let mut y = 0.0_f64;
                archive.process_f64(&mut x)?;
                archive.process_f64(&mut y)?;
                archive.end_tag("item")?;
                positions.push((element_id, x, y));
            }
        }

        archive.end_tag("positionMap")?;
        Ok(positions)
    }

    fn serialize_components(&mut self, archive: &mut dyn Archive) -> ArchiveResult<()> {
        let mut count = self.elements.len();
        archive.begin_multi_tag("components", &mut count)?;

        if archive.is_storing() {
            for (element_id, element) in self.elements.iter_mut() {
                archive.begin_tag("component")?;
                let mut element_id = element_id.clone();
                archive.process_string(&mut element_id)?;
                element.serialize(archive)?;
                archive.end_tag("component")?;
            }
        } else {
            self.elements.clear();
            for _ in 0..count {
                archive.begin_tag("component")?;
                let mut element_id = String::new();
                archive.process_string(&mut element_id)?;
                let mut element = RegistryElement::new(ComponentAddress::embedded("pending"));
                element.serialize(archive)?;
                archive.end_tag("component")?;
                self.elements.insert(element_id, element);
            }
        }

        archive.end_tag("components")
    }

    fn serialize_export_map(
        map: &mut BTreeMap<String, String>,
        tag: &str,
        archive: &mut dyn Archive,
    ) -> ArchiveResult<()> {
        let mut count = map.len();
        archive.begin_multi_tag(tag, &mut count)?;

        if archive.is_storing() {
            for (key, value) in map.iter_mut() {
                archive.begin_tag("export")?;
                let mut key = key.clone();
                archive.process_string(&mut key)?;
                archive.process_string(value)?;
                archive.end_tag("export")?;
            }
        } else {
            map.clear();
            for _ in 0..count {
                archive.begin_tag("export")?;
                let mut key = String::new();
                archive.process_string(&mut key)?;
                let mut value = String::new();
                archive.process_string(&mut value)?;
                archive.end_tag("export")?;
                map.insert(key, value);
            }
        }

        archive.end_tag(tag)
    }

    fn serialize_embedded(&mut self, archive: &mut dyn Archive) -> ArchiveResult<()> {
        let mut count = self.embedded.len();
        archive.begin_multi_tag("embeddedRegistries", &mut count)?;

        if archive.is_storing() {
            for (registry_id, registry) in self.embedded.iter() {
                archive.begin_tag("embedded")?;
                let mut registry_id = registry_id.clone();
                archive.process_string(&mut registry_id)?;
                let mut copy = Registry::clone(registry);
                copy.serialize(archive)?;
                archive.end_tag("embedded")?;
            }
        } else {
            self.embedded.clear();
            for _ in 0..count {
                archive.begin_tag("embedded")?;
                let mut registry_id = String::new();
                archive.process_string(&mut registry_id)?;
                let mut registry = Registry::new();
                if let Some(catalog) = &self.catalog {
                    registry.set_catalog(catalog.clone());
                }
                registry.serialize(archive)?;
                archive.end_tag("embedded")?;
                self.embedded.insert(registry_id, Arc::new(registry));
            }
        }

        archive.end_tag("embeddedRegistries")
    }
}

impl Serializable for Registry {
    fn serialize(&mut self, archive: &mut dyn Archive) -> ArchiveResult<()> {
        archive.begin_tag("registry")?;

        let mut version = FORMAT_VERSION;
        archive.process_i64(&mut version)?;
        if !archive.is_storing() && version > FORMAT_VERSION {
            return Err(ArchiveError::UnsupportedVersion { version });
        }

        archive.process_string(&mut self.description)?;
        archive.process_string(&mut self.keywords)?;

        let positions = self.serialize_position_map(archive)?;
        self.serialize_components(archive)?;
        Self::serialize_export_map(&mut self.exported_interfaces, "exportedInterfaces", archive)?;
        Self::serialize_export_map(&mut self.exported_elements, "exportedComponents", archive)?;
        self.serialize_embedded(archive)?;

        if !archive.is_storing() {
            for (element_id, x, y) in positions {
                match self.elements.get_mut(&element_id) {
                    Some(element) => element.set_layout_position(x, y),
                    None => {
                        debug!(element_id = %element_id, "位置表中的元素不存在，忽略该坐标");
                    }
                }
            }
        }

        archive.end_tag("registry")
    }
}
