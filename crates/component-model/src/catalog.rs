//! 组件目录定义
//!
//! 目录把组件地址解析为描述符，是注册表和解析上下文共享的组件工厂视图

use crate::address::ComponentAddress;
use crate::descriptor::ComponentDescriptor;
use crate::errors::{MetadataError, MetadataResult};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// 组件目录 trait
///
/// 按地址解析组件描述符，并支持枚举已登记的包和组件。
pub trait ComponentCatalog: Send + Sync {
    /// 按地址查找描述符；未登记的地址返回 `None`
    fn find_descriptor(&self, address: &ComponentAddress) -> Option<Arc<ComponentDescriptor>>;

    /// 已登记的包标识
    fn package_ids(&self) -> Vec<String>;

    /// 指定包内已登记的组件标识
    fn component_ids(&self, package_id: &str) -> Vec<String>;
}

/// 基于包的组件目录实现
#[derive(Default)]
pub struct PackageCatalog {
    packages: BTreeMap<String, BTreeMap<String, Arc<ComponentDescriptor>>>,
}

impl PackageCatalog {
    /// 创建空目录
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记组件描述符
    ///
    /// 同一包内重复的组件标识登记失败。
    pub fn register_component(
        &mut self,
        package_id: impl Into<String>,
        component_id: impl Into<String>,
        descriptor: Arc<ComponentDescriptor>,
    ) -> MetadataResult<()> {
        let package_id = package_id.into();
        let component_id = component_id.into();

        let package = self.packages.entry(package_id.clone()).or_default();
        if package.contains_key(&component_id) {
            return Err(MetadataError::DuplicateComponent {
                package_id,
                component_id,
            });
        }

        info!(package_id = %package_id, component_id = %component_id, "登记组件描述符");
        package.insert(component_id, descriptor);
        Ok(())
    }

    /// 链式登记组件描述符，重复登记直接忽略
    pub fn with_component(
        mut self,
        package_id: impl Into<String>,
        component_id: impl Into<String>,
        descriptor: Arc<ComponentDescriptor>,
    ) -> Self {
        let _ = self.register_component(package_id, component_id, descriptor);
        self
    }
}

impl ComponentCatalog for PackageCatalog {
    fn find_descriptor(&self, address: &ComponentAddress) -> Option<Arc<ComponentDescriptor>> {
        if address.is_embedded() {
            // 嵌入注册表地址由所属注册表解析，目录不负责
            return None;
        }
        self.packages
            .get(address.package_id())?
            .get(address.component_id())
            .cloned()
    }

    fn package_ids(&self) -> Vec<String> {
        self.packages.keys().cloned().collect()
    }

    fn component_ids(&self, package_id: &str) -> Vec<String> {
        self.packages
            .get(package_id)
            .map(|package| package.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// 进程级组件目录
///
/// 应用启动时设置一次，其后只读访问；进程退出前不销毁。
static PROCESS_CATALOG: Lazy<RwLock<Option<Arc<dyn ComponentCatalog>>>> =
    Lazy::new(|| RwLock::new(None));

/// 获取进程级组件目录
pub fn process_catalog() -> Option<Arc<dyn ComponentCatalog>> {
    PROCESS_CATALOG.read().clone()
}

/// 设置进程级组件目录
pub fn set_process_catalog(catalog: Arc<dyn ComponentCatalog>) {
    *PROCESS_CATALOG.write() = Some(catalog);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DescriptorBuilder;

    #[test]
    fn test_catalog_lookup() {
        let descriptor = DescriptorBuilder::abstract_base("Seed").build();
        let catalog = PackageCatalog::new().with_component("base", "Seed", descriptor);

        let address = ComponentAddress::new("base", "Seed");
        assert!(catalog.find_descriptor(&address).is_some());

        let missing = ComponentAddress::new("base", "Other");
        assert!(catalog.find_descriptor(&missing).is_none());

        assert_eq!(catalog.package_ids(), vec!["base".to_owned()]);
        assert_eq!(catalog.component_ids("base"), vec!["Seed".to_owned()]);
        assert!(catalog.component_ids("unknown").is_empty());
    }

    #[test]
    fn test_duplicate_component_rejected() {
        let mut catalog = PackageCatalog::new();
        let descriptor = DescriptorBuilder::abstract_base("Seed").build();

        assert!(catalog
            .register_component("base", "Seed", descriptor.clone())
            .is_ok());
        assert!(catalog
            .register_component("base", "Seed", descriptor)
            .is_err());
    }

    #[test]
    fn test_embedded_address_not_resolved_by_catalog() {
        let descriptor = DescriptorBuilder::abstract_base("Seed").build();
        let catalog = PackageCatalog::new().with_component("", "Seed", descriptor);

        assert!(catalog
            .find_descriptor(&ComponentAddress::embedded("Seed"))
            .is_none());
    }
}
