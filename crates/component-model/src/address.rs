//! 组件地址定义
//!
//! 组件类和持久化注册表都通过 `包标识/组件标识` 形式的地址定位

use crate::errors::MetadataError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 组件地址
///
/// 由包标识和组件标识组成。包标识为空时表示地址指向
/// 所属注册表自身的嵌入注册表。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComponentAddress {
    package_id: String,
    component_id: String,
}

impl ComponentAddress {
    /// 创建新的组件地址
    pub fn new(package_id: impl Into<String>, component_id: impl Into<String>) -> Self {
        Self {
            package_id: package_id.into(),
            component_id: component_id.into(),
        }
    }

    /// 创建指向嵌入注册表的地址
    pub fn embedded(component_id: impl Into<String>) -> Self {
        Self::new("", component_id)
    }

    /// 包标识
    pub fn package_id(&self) -> &str {
        &self.package_id
    }

    /// 组件标识
    pub fn component_id(&self) -> &str {
        &self.component_id
    }

    /// 是否指向嵌入注册表
    pub fn is_embedded(&self) -> bool {
        self.package_id.is_empty()
    }
}

impl fmt::Display for ComponentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.package_id.is_empty() {
            f.write_str(&self.component_id)
        } else {
            write!(f, "{}/{}", self.package_id, self.component_id)
        }
    }
}

impl FromStr for ComponentAddress {
    type Err = MetadataError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.is_empty() {
            return Err(MetadataError::InvalidAddress {
                text: text.to_owned(),
            });
        }

        match text.split_once('/') {
            Some((package_id, component_id)) => {
                if component_id.is_empty() {
                    return Err(MetadataError::InvalidAddress {
                        text: text.to_owned(),
                    });
                }
                Ok(Self::new(package_id, component_id))
            }
            None => Ok(Self::embedded(text)),
        }
    }
}
