//! 注册表管理器
//!
//! 按地址从持久化存储加载注册表，并在进程生命周期内缓存结果。
//! 未命中同样被缓存：同一地址一经查询，其结果在进程内保持确定，
//! 即使底层文件随后发生变化。

use component_model::{ComponentAddress, ComponentCatalog};
use dashmap::DashMap;
use registry_model::{FileSystem, LoadState, Registry, RegistryLoader};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// 已加载的注册表及其来源路径
///
/// 来源路径用于解析相对于本注册表的嵌套地址。
#[derive(Debug, Clone)]
pub struct LoadedRegistry {
    registry: Arc<Registry>,
    path: String,
}

impl LoadedRegistry {
    /// 注册表内容
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// 规范化后的来源路径
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// 注册表管理器
///
/// 应用启动时构造一次，进程退出时销毁；缓存不设淘汰。
pub struct RegistriesManager {
    file_system: Arc<dyn FileSystem>,
    loader: Arc<dyn RegistryLoader>,
    catalog: Arc<dyn ComponentCatalog>,
    cache: DashMap<String, Option<Arc<LoadedRegistry>>>,
}

impl RegistriesManager {
    /// 创建注册表管理器
    pub fn new(
        file_system: Arc<dyn FileSystem>,
        loader: Arc<dyn RegistryLoader>,
        catalog: Arc<dyn ComponentCatalog>,
    ) -> Self {
        Self {
            file_system,
            loader,
            catalog,
            cache: DashMap::new(),
        }
    }

    /// 按地址获取注册表
    ///
    /// 存储路径由上下文注册表的来源路径、包标识和组件标识
    /// 依次拼接而成，再经文件系统协作方规范化。
    pub fn get_registry(
        &self,
        address: &ComponentAddress,
        context: Option<&LoadedRegistry>,
    ) -> Option<Arc<LoadedRegistry>> {
        let mut path = String::new();

        if let Some(context) = context {
            path.push_str(context.path());
            path.push('/');
        }

        if !address.package_id().is_empty() {
            path.push_str(address.package_id());
            path.push('/');
        }

        path.push_str(address.component_id());

        self.registry_from_file(&path)
    }

    /// 按路径获取注册表，结果（含未命中）进入缓存
    pub fn registry_from_file(&self, path: &str) -> Option<Arc<LoadedRegistry>> {
        let normalized = self.file_system.normalized_path(path);

        self.cache
            .entry(normalized.clone())
            .or_insert_with(|| {
                let mut registry = Registry::with_catalog(self.catalog.clone());
                match self
                    .loader
                    .load_from_file(&mut registry, Path::new(&normalized))
                {
                    LoadState::Ok => {
                        info!(path = %normalized, "注册表加载完成");
                        Some(Arc::new(LoadedRegistry {
                            registry: Arc::new(registry),
                            path: normalized.clone(),
                        }))
                    }
                    state => {
                        debug!(path = %normalized, ?state, "注册表加载未成功，缓存未命中结果");
                        None
                    }
                }
            })
            .value()
            .clone()
    }

    /// 缓存中的条目数量（含未命中）
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }
}
