//! 组件实例定义
//!
//! 实例由上下文创建并持有；能力请求通过描述符的提取表
//! 或复合组件的导出映射应答

use crate::composite;
use crate::context::RegistryContext;
use component_model::{
    unwrap_capability, CapabilityHandle, CapabilityKey, ComponentDescriptor, InstanceRef,
};
use std::rc::Rc;
use std::sync::Arc;
use tracing::debug;

/// 实例本体
pub enum InstanceBody {
    /// 普通组件实例
    Plain(InstanceRef),
    /// 复合组件实例，实现由子上下文提供
    Composite(Rc<RegistryContext>),
}

/// 组件实例
///
/// 同一上下文内每个元素至多存在一个实例；实例随上下文一起销毁。
pub struct ComponentInstance {
    descriptor: Arc<ComponentDescriptor>,
    body: InstanceBody,
}

impl ComponentInstance {
    pub(crate) fn plain(descriptor: Arc<ComponentDescriptor>, object: InstanceRef) -> Rc<Self> {
        Rc::new(Self {
            descriptor,
            body: InstanceBody::Plain(object),
        })
    }

    pub(crate) fn composite(
        descriptor: Arc<ComponentDescriptor>,
        context: Rc<RegistryContext>,
    ) -> Rc<Self> {
        Rc::new(Self {
            descriptor,
            body: InstanceBody::Composite(context),
        })
    }

    /// 实例的描述符
    pub fn descriptor(&self) -> &Arc<ComponentDescriptor> {
        &self.descriptor
    }

    /// 是否为复合组件实例
    pub fn is_composite(&self) -> bool {
        matches!(self.body, InstanceBody::Composite(_))
    }

    /// 复合组件实例的子上下文
    pub fn composite_context(&self) -> Option<&Rc<RegistryContext>> {
        match &self.body {
            InstanceBody::Composite(context) => Some(context),
            InstanceBody::Plain(_) => None,
        }
    }

    /// 请求能力
    ///
    /// 普通实例只应答空子路径，通过描述符的提取表（级联）取得能力；
    /// 复合实例把请求转发到导出映射指向的内部元素。任何环节失败
    /// 都返回 `None`，不会恐慌。
    pub fn query(&self, capability: CapabilityKey, sub_path: &str) -> Option<CapabilityHandle> {
        match &self.body {
            InstanceBody::Plain(object) => {
                if !sub_path.is_empty() {
                    debug!(
                        component = %self.descriptor.name(),
                        sub_path = %sub_path,
                        "普通组件不支持子路径寻址"
                    );
                    return None;
                }
                let extractor = self.descriptor.find_capability(capability)?;
                extractor(object)
            }
            InstanceBody::Composite(context) => {
                composite::query_composite(context, capability, sub_path)
            }
        }
    }

    /// 请求能力并还原为具体指针
    pub fn query_as<T: ?Sized + 'static>(
        &self,
        capability: CapabilityKey,
        sub_path: &str,
    ) -> Option<Rc<T>> {
        unwrap_capability(self.query(capability, sub_path)?)
    }
}
