//! 复合组件
//!
//! 复合组件让一个注册表作为单个组件参与外层对象图：
//! 能力请求通过导出映射转发给内部元素，点路径可以寻址
//! 任意深度的嵌套复合组件。

use crate::context::RegistryContext;
use crate::instance::ComponentInstance;
use component_model::{
    CapabilityHandle, CapabilityKey, ComponentCatalog, ComponentDescriptor, DescriptorBuilder,
};
use registry_model::Registry;
use std::rc::Rc;
use std::sync::Arc;
use tracing::debug;

/// 为注册表支撑的复合组件合成最小描述符
pub(crate) fn composite_descriptor(name: &str) -> Arc<ComponentDescriptor> {
    DescriptorBuilder::composite(name).build()
}

/// 在首个 `.` 处拆分点路径
///
/// 首段是当前复合组件本地的标识，剩余部分原样转发。
pub fn split_component_path(path: &str) -> (&str, &str) {
    match path.split_once('.') {
        Some((local, rest)) => (local, rest),
        None => (path, ""),
    }
}

/// 复合组件的能力请求转发
///
/// 空子路径走能力导出映射；非空子路径先按元素别名定位内部
/// 元素，再把剩余路径递归转发。任何缺失的映射条目、描述符
/// 解析失败或末端能力不符都得到 `None`。
pub(crate) fn query_composite(
    context: &RegistryContext,
    capability: CapabilityKey,
    sub_path: &str,
) -> Option<CapabilityHandle> {
    let registry = context.registry();

    if sub_path.is_empty() {
        let Some(target) = registry.exported_interfaces().get(capability.tag()) else {
            debug!(capability = %capability, "能力未在复合组件上导出");
            return None;
        };
        let (element_id, rest) = split_component_path(target);
        let instance = context.get_instance(element_id)?;
        instance.query(capability, rest)
    } else {
        let (alias, rest) = split_component_path(sub_path);
        let Some(element_id) = registry.exported_elements().get(alias) else {
            debug!(alias = %alias, "元素别名未在复合组件上导出");
            return None;
        };
        let instance = context.get_instance(element_id)?;
        instance.query(capability, rest)
    }
}

/// 把整个注册表包装为单个复合组件实例
pub fn composite_instance(
    name: &str,
    registry: Arc<Registry>,
    catalog: Arc<dyn ComponentCatalog>,
) -> Rc<ComponentInstance> {
    let context = RegistryContext::new(registry, catalog);
    ComponentInstance::composite(composite_descriptor(name), context)
}
