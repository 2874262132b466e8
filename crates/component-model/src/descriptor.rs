//! 组件描述符定义
//!
//! 每个组件类一份静态元数据：可产出的能力、声明的槽位、可选的父描述符。
//! 查找遵循级联规则：先查本地映射，未命中且存在父描述符时委托父级，
//! 首个命中即生效，不合并冲突条目。

use crate::address::ComponentAddress;
use crate::capability::CapabilityKey;
use crate::component::{ComponentSite, CreatorFn, ExtractorFn, InstanceRef};
use crate::errors::ResolveResult;
use crate::slots::{AttributeSlot, ReferenceSlot};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// 描述符本体
///
/// 决定描述符能否被实例化以及如何实例化。
pub enum DescriptorBody {
    /// 抽象基类描述符，仅用于向派生描述符提供元数据
    Abstract,
    /// 具体组件描述符，携带创建函数
    Concrete(CreatorFn),
    /// 复合组件描述符，实现由嵌套注册表提供
    Composite,
}

impl fmt::Debug for DescriptorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abstract => f.write_str("Abstract"),
            Self::Concrete(_) => f.write_str("Concrete(<creator>)"),
            Self::Composite => f.write_str("Composite"),
        }
    }
}

/// 组件描述符
///
/// 构建一次后不可变，由多个注册表和元素以 `Arc` 只读共享。
pub struct ComponentDescriptor {
    name: String,
    description: String,
    keywords: String,
    parent: Option<Arc<ComponentDescriptor>>,
    body: DescriptorBody,
    capabilities: BTreeMap<CapabilityKey, ExtractorFn>,
    attribute_slots: BTreeMap<String, AttributeSlot>,
    reference_slots: BTreeMap<String, ReferenceSlot>,
    subcomponent_slots: BTreeMap<String, ComponentAddress>,
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("name", &self.name)
            .field("body", &self.body)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .field("capabilities", &self.capabilities.keys().collect::<Vec<_>>())
            .field("attribute_slots", &self.attribute_slots)
            .field("reference_slots", &self.reference_slots)
            .field("subcomponent_slots", &self.subcomponent_slots)
            .finish()
    }
}

impl ComponentDescriptor {
    /// 组件类名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 组件描述
    pub fn description(&self) -> &str {
        &self.description
    }

    /// 组件关键字
    pub fn keywords(&self) -> &str {
        &self.keywords
    }

    /// 父描述符
    pub fn parent(&self) -> Option<&Arc<ComponentDescriptor>> {
        self.parent.as_ref()
    }

    /// 是否为抽象基类描述符
    pub fn is_abstract(&self) -> bool {
        matches!(self.body, DescriptorBody::Abstract)
    }

    /// 是否为复合组件描述符
    pub fn is_composite(&self) -> bool {
        matches!(self.body, DescriptorBody::Composite)
    }

    /// 查找能力提取函数（级联）
    pub fn find_capability(&self, key: CapabilityKey) -> Option<&ExtractorFn> {
        match self.capabilities.get(&key) {
            Some(extractor) => Some(extractor),
            None => self.parent.as_ref()?.find_capability(key),
        }
    }

    /// 查找属性槽位描述（级联）
    pub fn find_attribute_slot(&self, slot_id: &str) -> Option<&AttributeSlot> {
        match self.attribute_slots.get(slot_id) {
            Some(slot) => Some(slot),
            None => self.parent.as_ref()?.find_attribute_slot(slot_id),
        }
    }

    /// 查找引用槽位描述（级联）
    pub fn find_reference_slot(&self, slot_id: &str) -> Option<&ReferenceSlot> {
        match self.reference_slots.get(slot_id) {
            Some(slot) => Some(slot),
            None => self.parent.as_ref()?.find_reference_slot(slot_id),
        }
    }

    /// 查找子组件槽位地址（级联）
    pub fn find_subcomponent_slot(&self, slot_id: &str) -> Option<&ComponentAddress> {
        match self.subcomponent_slots.get(slot_id) {
            Some(address) => Some(address),
            None => self.parent.as_ref()?.find_subcomponent_slot(slot_id),
        }
    }

    /// 合并视图下的全部能力标识
    pub fn capability_keys(&self) -> BTreeSet<CapabilityKey> {
        let mut keys = match &self.parent {
            Some(parent) => parent.capability_keys(),
            None => BTreeSet::new(),
        };
        keys.extend(self.capabilities.keys().copied());
        keys
    }

    /// 合并视图下的属性槽位，父级声明在前，被遮蔽的条目取本地定义
    pub fn merged_attribute_slots(&self) -> Vec<&AttributeSlot> {
        self.merged_slot_ids(|descriptor| descriptor.attribute_slots.keys())
            .into_iter()
            .filter_map(|slot_id| self.find_attribute_slot(slot_id))
            .collect()
    }

    /// 合并视图下的引用槽位，父级声明在前，被遮蔽的条目取本地定义
    pub fn merged_reference_slots(&self) -> Vec<&ReferenceSlot> {
        self.merged_slot_ids(|descriptor| descriptor.reference_slots.keys())
            .into_iter()
            .filter_map(|slot_id| self.find_reference_slot(slot_id))
            .collect()
    }

    /// 创建组件实例
    ///
    /// # Panics
    ///
    /// 对抽象基类描述符调用属于编程错误，直接断言失败。
    pub fn create_instance(&self, site: &dyn ComponentSite) -> ResolveResult<InstanceRef> {
        match &self.body {
            DescriptorBody::Abstract => {
                panic!("组件描述符 {} 为抽象基类，禁止实例化", self.name);
            }
            DescriptorBody::Concrete(creator) => creator(site),
            DescriptorBody::Composite => Err(crate::component::creation_failed(
                site.element_id(),
                "复合组件必须通过注册表上下文创建",
            )),
        }
    }

    /// 按"父链在前"的顺序收集合并后的槽位标识
    fn merged_slot_ids<'a, F, I>(&'a self, keys_of: F) -> Vec<&'a str>
    where
        F: Fn(&'a ComponentDescriptor) -> I,
        I: Iterator<Item = &'a String>,
    {
        let mut chain: Vec<&ComponentDescriptor> = Vec::new();
        let mut current = Some(self);
        while let Some(descriptor) = current {
            chain.push(descriptor);
            current = descriptor.parent.as_deref();
        }
        chain.reverse();

        let mut seen = BTreeSet::new();
        let mut ordered = Vec::new();
        for descriptor in chain {
            for slot_id in keys_of(descriptor) {
                if seen.insert(slot_id.as_str()) {
                    ordered.push(slot_id.as_str());
                }
            }
        }
        ordered
    }
}

/// 组件描述符构建器
///
/// 在构建阶段逐项登记能力和槽位，`build` 后元数据即冻结。
pub struct DescriptorBuilder {
    name: String,
    description: String,
    keywords: String,
    parent: Option<Arc<ComponentDescriptor>>,
    body: DescriptorBody,
    capabilities: BTreeMap<CapabilityKey, ExtractorFn>,
    attribute_slots: BTreeMap<String, AttributeSlot>,
    reference_slots: BTreeMap<String, ReferenceSlot>,
    subcomponent_slots: BTreeMap<String, ComponentAddress>,
}

impl DescriptorBuilder {
    /// 创建抽象基类描述符的构建器
    pub fn abstract_base(name: impl Into<String>) -> Self {
        Self::with_body(name, DescriptorBody::Abstract)
    }

    /// 创建具体组件描述符的构建器
    pub fn concrete(name: impl Into<String>, creator: CreatorFn) -> Self {
        Self::with_body(name, DescriptorBody::Concrete(creator))
    }

    /// 创建复合组件描述符的构建器
    pub fn composite(name: impl Into<String>) -> Self {
        Self::with_body(name, DescriptorBody::Composite)
    }

    fn with_body(name: impl Into<String>, body: DescriptorBody) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            keywords: String::new(),
            parent: None,
            body,
            capabilities: BTreeMap::new(),
            attribute_slots: BTreeMap::new(),
            reference_slots: BTreeMap::new(),
            subcomponent_slots: BTreeMap::new(),
        }
    }

    /// 设置父描述符，子描述符继承其元数据
    pub fn with_parent(mut self, parent: Arc<ComponentDescriptor>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// 设置描述
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// 设置关键字
    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = keywords.into();
        self
    }

    /// 登记能力提取函数
    ///
    /// 空能力标识会被静默忽略，使"无能力"的泛型实例化保持无害。
    pub fn register_capability(&mut self, key: CapabilityKey, extractor: ExtractorFn) {
        if key.is_void() {
            debug!(component = %self.name, "忽略空能力标识的提取函数登记");
            return;
        }
        self.capabilities.insert(key, extractor);
    }

    /// 登记属性槽位
    ///
    /// 本地重复登记失败返回 `false`；遮蔽父级槽位是允许的。
    pub fn register_attribute_slot(&mut self, slot: AttributeSlot) -> bool {
        if self.attribute_slots.contains_key(&slot.id) {
            return false;
        }
        self.attribute_slots.insert(slot.id.clone(), slot);
        true
    }

    /// 登记引用槽位
    ///
    /// 本地重复登记失败返回 `false`；遮蔽父级槽位是允许的。
    pub fn register_reference_slot(&mut self, slot: ReferenceSlot) -> bool {
        if self.reference_slots.contains_key(&slot.id) {
            return false;
        }
        self.reference_slots.insert(slot.id.clone(), slot);
        true
    }

    /// 登记子组件槽位
    pub fn register_subcomponent_slot(
        &mut self,
        slot_id: impl Into<String>,
        address: ComponentAddress,
    ) -> bool {
        let slot_id = slot_id.into();
        if self.subcomponent_slots.contains_key(&slot_id) {
            return false;
        }
        self.subcomponent_slots.insert(slot_id, address);
        true
    }

    /// 链式登记能力提取函数
    pub fn with_capability(mut self, key: CapabilityKey, extractor: ExtractorFn) -> Self {
        self.register_capability(key, extractor);
        self
    }

    /// 链式登记属性槽位，重复时记录警告并保留首次定义
    pub fn with_attribute_slot(mut self, slot: AttributeSlot) -> Self {
        let slot_id = slot.id.clone();
        if !self.register_attribute_slot(slot) {
            warn!(component = %self.name, slot_id = %slot_id, "属性槽位重复登记，保留首次定义");
        }
        self
    }

    /// 链式登记引用槽位，重复时记录警告并保留首次定义
    pub fn with_reference_slot(mut self, slot: ReferenceSlot) -> Self {
        let slot_id = slot.id.clone();
        if !self.register_reference_slot(slot) {
            warn!(component = %self.name, slot_id = %slot_id, "引用槽位重复登记，保留首次定义");
        }
        self
    }

    /// 链式登记子组件槽位
    pub fn with_subcomponent_slot(
        mut self,
        slot_id: impl Into<String>,
        address: ComponentAddress,
    ) -> Self {
        let slot_id = slot_id.into();
        if !self.register_subcomponent_slot(slot_id.clone(), address) {
            warn!(component = %self.name, slot_id = %slot_id, "子组件槽位重复登记，保留首次定义");
        }
        self
    }

    /// 冻结元数据并产出可共享的描述符
    pub fn build(self) -> Arc<ComponentDescriptor> {
        Arc::new(ComponentDescriptor {
            name: self.name,
            description: self.description,
            keywords: self.keywords,
            parent: self.parent,
            body: self.body,
            capabilities: self.capabilities,
            attribute_slots: self.attribute_slots,
            reference_slots: self.reference_slots,
            subcomponent_slots: self.subcomponent_slots,
        })
    }
}
