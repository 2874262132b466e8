//! 注册表文件加载与保存
//!
//! 文件系统与文件加载器是外部协作方，以 trait 形式注入；
//! 本模块提供基于 std 与 JSON 归档的默认实现

use crate::archive::Serializable;
use crate::json_archive::{JsonReadArchive, JsonWriteArchive};
use crate::registry::Registry;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// 文件系统抽象
///
/// 解析上下文和注册表管理器只依赖路径规范化这一项能力。
pub trait FileSystem: Send + Sync {
    /// 规范化路径：统一分隔符并消去 `.`/`..` 段
    fn normalized_path(&self, path: &str) -> String;
}

/// 基于 std 的文件系统实现
#[derive(Debug, Default)]
pub struct StdFileSystem;

impl StdFileSystem {
    /// 创建实例
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for StdFileSystem {
    fn normalized_path(&self, path: &str) -> String {
        let unified = path.replace('\\', "/");
        let absolute = unified.starts_with('/');

        let mut segments: Vec<&str> = Vec::new();
        for segment in unified.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if matches!(segments.last(), Some(&last) if last != "..") {
                        segments.pop();
                    } else if !absolute {
                        segments.push("..");
                    }
                }
                other => segments.push(other),
            }
        }

        let joined = segments.join("/");
        if absolute {
            format!("/{joined}")
        } else {
            joined
        }
    }
}

/// 加载结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// 加载或保存成功
    Ok,
    /// 操作被中止
    Aborted,
    /// 操作失败
    Failed,
}

/// 注册表文件加载器抽象
pub trait RegistryLoader: Send + Sync {
    /// 从文件加载注册表内容
    fn load_from_file(&self, registry: &mut Registry, path: &Path) -> LoadState;

    /// 将注册表内容保存到文件
    fn save_to_file(&self, registry: &Registry, path: &Path) -> LoadState;
}

/// 基于 JSON 归档的注册表文件加载器
#[derive(Debug, Default)]
pub struct JsonRegistryLoader;

impl JsonRegistryLoader {
    /// 创建实例
    pub fn new() -> Self {
        Self
    }
}

impl RegistryLoader for JsonRegistryLoader {
    fn load_from_file(&self, registry: &mut Registry, path: &Path) -> LoadState {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(error) => {
                // 文件缺失是常规情况，由调用方缓存未命中结果
                debug!(path = %path.display(), %error, "注册表文件读取失败");
                return LoadState::Failed;
            }
        };

        let tree = match serde_json::from_str(&text) {
            Ok(tree) => tree,
            Err(error) => {
                warn!(path = %path.display(), %error, "注册表文件解析失败");
                return LoadState::Failed;
            }
        };

        let mut archive = match JsonReadArchive::new(tree) {
            Ok(archive) => archive,
            Err(error) => {
                warn!(path = %path.display(), %error, "注册表归档结构无效");
                return LoadState::Failed;
            }
        };

        match registry.serialize(&mut archive) {
            Ok(()) => LoadState::Ok,
            Err(error) => {
                warn!(path = %path.display(), %error, "注册表反序列化失败");
                LoadState::Failed
            }
        }
    }

    fn save_to_file(&self, registry: &Registry, path: &Path) -> LoadState {
        let mut archive = JsonWriteArchive::new();
        let mut copy = registry.clone();
        if let Err(error) = copy.serialize(&mut archive) {
            warn!(path = %path.display(), %error, "注册表序列化失败");
            return LoadState::Failed;
        }

        let tree = match archive.finish() {
            Ok(tree) => tree,
            Err(error) => {
                warn!(path = %path.display(), %error, "注册表归档未正确闭合");
                return LoadState::Failed;
            }
        };

        let text = match serde_json::to_string_pretty(&tree) {
            Ok(text) => text,
            Err(error) => {
                warn!(path = %path.display(), %error, "注册表归档编码失败");
                return LoadState::Failed;
            }
        };

        match fs::write(path, text) {
            Ok(()) => LoadState::Ok,
            Err(error) => {
                warn!(path = %path.display(), %error, "注册表文件写入失败");
                LoadState::Failed
            }
        }
    }
}
