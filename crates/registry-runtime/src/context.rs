//! 惰性解析上下文
//!
//! 上下文绑定单个注册表，首次请求某元素时创建其实例：
//! 先按合并槽位声明顺序解析属性值，再递归解析引用接线，
//! 最后调用创建钩子并写入实例缓存。

use crate::composite;
use crate::instance::ComponentInstance;
use crate::manager::{LoadedRegistry, RegistriesManager};
use component_model::{
    AttributeValue, CapabilityHandle, CapabilityKey, ComponentCatalog, ComponentDescriptor,
    ComponentSite, Multiplicity, ResolveError, ResolveResult,
};
use registry_model::{Registry, RegistryElement};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, warn};

enum InstanceSlot {
    /// 解析进行中的占位标记，用于快速失败地发现接线循环
    Resolving,
    Ready(Rc<ComponentInstance>),
}

/// 注册表解析上下文
///
/// 持有它创建的全部实例；实例不会跨上下文共享。
/// 上下文与实例图面向单线程使用。
pub struct RegistryContext {
    registry: Arc<Registry>,
    catalog: Arc<dyn ComponentCatalog>,
    manager: Option<Rc<RegistriesManager>>,
    origin: Option<Arc<LoadedRegistry>>,
    parent: Option<Rc<RegistryContext>>,
    instances: RefCell<BTreeMap<String, InstanceSlot>>,
}

impl RegistryContext {
    /// 创建绑定给定注册表与组件目录的上下文
    pub fn new(registry: Arc<Registry>, catalog: Arc<dyn ComponentCatalog>) -> Rc<Self> {
        Rc::new(Self {
            registry,
            catalog,
            manager: None,
            origin: None,
            parent: None,
            instances: RefCell::new(BTreeMap::new()),
        })
    }

    /// 创建可通过注册表管理器解析持久化复合组件的上下文
    pub fn with_manager(
        registry: Arc<Registry>,
        catalog: Arc<dyn ComponentCatalog>,
        manager: Rc<RegistriesManager>,
        origin: Option<Arc<LoadedRegistry>>,
    ) -> Rc<Self> {
        Rc::new(Self {
            registry,
            catalog,
            manager: Some(manager),
            origin,
            parent: None,
            instances: RefCell::new(BTreeMap::new()),
        })
    }

    /// 创建链接到父上下文的子上下文
    ///
    /// 子注册表中找不到的元素标识会委托父上下文解析。
    pub fn child_of(parent: &Rc<RegistryContext>, registry: Arc<Registry>) -> Rc<Self> {
        Rc::new(Self {
            registry,
            catalog: parent.catalog.clone(),
            manager: parent.manager.clone(),
            origin: parent.origin.clone(),
            parent: Some(Rc::clone(parent)),
            instances: RefCell::new(BTreeMap::new()),
        })
    }

    /// 绑定的注册表
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// 绑定的组件目录
    pub fn catalog(&self) -> &Arc<dyn ComponentCatalog> {
        &self.catalog
    }

    /// 已解析完成的实例数量
    pub fn resolved_count(&self) -> usize {
        self.instances
            .borrow()
            .values()
            .filter(|slot| matches!(slot, InstanceSlot::Ready(_)))
            .count()
    }

    /// 请求元素实例
    ///
    /// 已缓存时返回同一实例；元素缺失、地址无法解析或配置错误
    /// 时返回 `None` 并记录日志，调用方负责检查。
    pub fn get_instance(&self, element_id: &str) -> Option<Rc<ComponentInstance>> {
        match self.instances.borrow().get(element_id) {
            Some(InstanceSlot::Ready(instance)) => return Some(Rc::clone(instance)),
            Some(InstanceSlot::Resolving) => {
                let error = ResolveError::CircularWiring {
                    element_id: element_id.to_owned(),
                };
                warn!(element_id = %element_id, %error, "解析中止");
                return None;
            }
            None => {}
        }

        let Some(element) = self.registry.element(element_id) else {
            // 本地未命中时委托父上下文
            if let Some(parent) = &self.parent {
                return parent.get_instance(element_id);
            }
            debug!(element_id = %element_id, "注册表中不存在该元素");
            return None;
        };

        self.instances
            .borrow_mut()
            .insert(element_id.to_owned(), InstanceSlot::Resolving);

        let result = self.resolve_element(element_id, element);

        let mut instances = self.instances.borrow_mut();
        match result {
            Ok(instance) => {
                instances.insert(
                    element_id.to_owned(),
                    InstanceSlot::Ready(Rc::clone(&instance)),
                );
                Some(instance)
            }
            Err(error) => {
                // 失败不记忆化，清除占位标记
                instances.remove(element_id);
                warn!(element_id = %element_id, %error, "元素解析失败");
                None
            }
        }
    }

    /// 请求元素实例并立即提取能力
    pub fn get_capability<T: ?Sized + 'static>(
        &self,
        element_id: &str,
        capability: CapabilityKey,
    ) -> Option<Rc<T>> {
        self.get_instance(element_id)?.query_as(capability, "")
    }

    fn resolve_element(
        &self,
        element_id: &str,
        element: &RegistryElement,
    ) -> ResolveResult<Rc<ComponentInstance>> {
        let address = element.address();

        if address.is_embedded() {
            let registry = self
                .registry
                .embedded_registry(address.component_id())
                .ok_or_else(|| ResolveError::DescriptorNotFound {
                    element_id: element_id.to_owned(),
                    address: address.to_string(),
                })?;
            let child = self.composite_child(Arc::clone(registry), None);
            return Ok(ComponentInstance::composite(
                composite::composite_descriptor(address.component_id()),
                child,
            ));
        }

        if let Some(descriptor) = self.catalog.find_descriptor(address) {
            let site = BindingSite::prepare(self, element_id, element, &descriptor)?;
            let object = descriptor.create_instance(&site)?;
            return Ok(ComponentInstance::plain(descriptor, object));
        }

        if let Some(manager) = &self.manager {
            if let Some(loaded) = manager.get_registry(address, self.origin.as_deref()) {
                let child =
                    self.composite_child(Arc::clone(loaded.registry()), Some(Arc::clone(&loaded)));
                return Ok(ComponentInstance::composite(
                    composite::composite_descriptor(address.component_id()),
                    child,
                ));
            }
        }

        Err(ResolveError::DescriptorNotFound {
            element_id: element_id.to_owned(),
            address: address.to_string(),
        })
    }

    /// 为复合组件建立隔离的子上下文；子注册表自带目录时优先使用
    fn composite_child(
        &self,
        registry: Arc<Registry>,
        origin: Option<Arc<LoadedRegistry>>,
    ) -> Rc<RegistryContext> {
        let catalog = registry
            .catalog()
            .cloned()
            .unwrap_or_else(|| self.catalog.clone());
        Rc::new(RegistryContext {
            registry,
            catalog,
            manager: self.manager.clone(),
            origin: origin.or_else(|| self.origin.clone()),
            parent: None,
            instances: RefCell::new(BTreeMap::new()),
        })
    }
}

struct ReferenceBinding {
    capability: CapabilityKey,
    targets: Vec<Rc<ComponentInstance>>,
}

/// 实例化现场的具体实现
///
/// 在组件创建前按合并（级联）槽位声明顺序准备好全部属性值
/// 与引用能力，供创建函数读取。
pub struct BindingSite {
    element_id: String,
    attributes: BTreeMap<String, AttributeValue>,
    references: BTreeMap<String, ReferenceBinding>,
}

impl BindingSite {
    fn prepare(
        context: &RegistryContext,
        element_id: &str,
        element: &RegistryElement,
        descriptor: &Arc<ComponentDescriptor>,
    ) -> ResolveResult<Self> {
        let mut attributes = BTreeMap::new();
        for slot in descriptor.merged_attribute_slots() {
            let configured = element.attribute(&slot.id);
            match configured {
                Some(value) if value.kind() == slot.kind => {
                    attributes.insert(slot.id.clone(), value.clone());
                }
                Some(value) => {
                    if slot.required {
                        return Err(ResolveError::AttributeTypeMismatch {
                            element_id: element_id.to_owned(),
                            slot_id: slot.id.clone(),
                            expected: slot.kind,
                            actual: value.kind(),
                        });
                    }
                    warn!(
                        element_id = %element_id,
                        slot_id = %slot.id,
                        expected = %slot.kind,
                        actual = %value.kind(),
                        "属性类型不匹配，回退到默认值"
                    );
                    if let Some(default) = &slot.default {
                        attributes.insert(slot.id.clone(), default.clone());
                    }
                }
                None => {
                    if let Some(default) = &slot.default {
                        attributes.insert(slot.id.clone(), default.clone());
                    } else if slot.required {
                        return Err(ResolveError::MissingRequiredAttribute {
                            element_id: element_id.to_owned(),
                            slot_id: slot.id.clone(),
                        });
                    }
                }
            }
        }

        let mut references = BTreeMap::new();
        for slot in descriptor.merged_reference_slots() {
            let wired = element.references(&slot.id);
            if wired.is_empty() {
                if slot.required {
                    return Err(ResolveError::MissingRequiredReference {
                        element_id: element_id.to_owned(),
                        slot_id: slot.id.clone(),
                    });
                }
                references.insert(
                    slot.id.clone(),
                    ReferenceBinding {
                        capability: slot.capability,
                        targets: Vec::new(),
                    },
                );
                continue;
            }

            let selected: &[String] = match slot.multiplicity {
                Multiplicity::Single if wired.len() > 1 => {
                    warn!(
                        element_id = %element_id,
                        slot_id = %slot.id,
                        "单目标引用槽位接线了多个目标，仅保留第一个"
                    );
                    &wired[..1]
                }
                _ => wired,
            };

            let mut targets = Vec::with_capacity(selected.len());
            for target_id in selected {
                match context.get_instance(target_id) {
                    Some(instance) => targets.push(instance),
                    None => {
                        // 悬空接线：必需槽位报配置错误，可选槽位空绑定
                        if slot.required {
                            return Err(ResolveError::MissingRequiredReference {
                                element_id: element_id.to_owned(),
                                slot_id: slot.id.clone(),
                            });
                        }
                        warn!(
                            element_id = %element_id,
                            slot_id = %slot.id,
                            target_id = %target_id,
                            "引用接线目标无法解析，保持空绑定"
                        );
                    }
                }
            }
            references.insert(
                slot.id.clone(),
                ReferenceBinding {
                    capability: slot.capability,
                    targets,
                },
            );
        }

        Ok(Self {
            element_id: element_id.to_owned(),
            attributes,
            references,
        })
    }
}

impl ComponentSite for BindingSite {
    fn element_id(&self) -> &str {
        &self.element_id
    }

    fn attribute(&self, slot_id: &str) -> Option<&AttributeValue> {
        self.attributes.get(slot_id)
    }

    fn reference(&self, slot_id: &str) -> Option<CapabilityHandle> {
        let binding = self.references.get(slot_id)?;
        let target = binding.targets.first()?;
        target.query(binding.capability, "")
    }

    fn references(&self, slot_id: &str) -> Vec<CapabilityHandle> {
        match self.references.get(slot_id) {
            Some(binding) => binding
                .targets
                .iter()
                .filter_map(|target| target.query(binding.capability, ""))
                .collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use component_model::{
        creator_with, extract_with, AttributeSlot, Component, ComponentAddress, ComponentSiteExt,
        DescriptorBuilder, PackageCatalog, ReferenceSlot, ValueKind,
    };

    const VALUE_SOURCE: CapabilityKey = CapabilityKey::new("test.IValueSource");

    trait ValueSource {
        fn value(&self) -> i64;
    }

    struct ConstSource {
        value: i64,
    }

    impl Component for ConstSource {}

    impl ValueSource for ConstSource {
        fn value(&self) -> i64 {
            self.value
        }
    }

    struct Doubler {
        input: Option<Rc<dyn ValueSource>>,
    }

    impl Component for Doubler {}

    impl ValueSource for Doubler {
        fn value(&self) -> i64 {
            self.input.as_ref().map_or(0, |input| input.value() * 2)
        }
    }

    struct Strict {
        input: Rc<dyn ValueSource>,
    }

    impl Component for Strict {}

    impl ValueSource for Strict {
        fn value(&self) -> i64 {
            self.input.value()
        }
    }

    struct Adder {
        inputs: Vec<Rc<dyn ValueSource>>,
    }

    impl Component for Adder {}

    impl ValueSource for Adder {
        fn value(&self) -> i64 {
            self.inputs.iter().map(|input| input.value()).sum()
        }
    }

    fn catalog() -> Arc<PackageCatalog> {
        let const_source = DescriptorBuilder::concrete(
            "ConstSource",
            creator_with(|site| {
                Ok(ConstSource {
                    value: site.int_attribute("Value").unwrap_or(0),
                })
            }),
        )
        .with_attribute_slot(
            AttributeSlot::new("Value", ValueKind::Int).with_default(1_i64),
        )
        .with_capability(
            VALUE_SOURCE,
            extract_with::<ConstSource, dyn ValueSource>(|c| c as Rc<dyn ValueSource>),
        )
        .build();

        let doubler = DescriptorBuilder::concrete(
            "Doubler",
            creator_with(|site| {
                Ok(Doubler {
                    input: site.typed_reference::<dyn ValueSource>("Input"),
                })
            }),
        )
        .with_reference_slot(ReferenceSlot::new("Input", VALUE_SOURCE))
        .with_capability(
            VALUE_SOURCE,
            extract_with::<Doubler, dyn ValueSource>(|c| c as Rc<dyn ValueSource>),
        )
        .build();

        let strict = DescriptorBuilder::concrete(
            "Strict",
            creator_with(|site| {
                let input = site
                    .typed_reference::<dyn ValueSource>("Input")
                    .ok_or_else(|| {
                        component_model::creation_failed(site.element_id(), "Input 能力缺失")
                    })?;
                Ok(Strict { input })
            }),
        )
        .with_reference_slot(ReferenceSlot::new("Input", VALUE_SOURCE).required())
        .with_capability(
            VALUE_SOURCE,
            extract_with::<Strict, dyn ValueSource>(|c| c as Rc<dyn ValueSource>),
        )
        .build();

        let adder = DescriptorBuilder::concrete(
            "Adder",
            creator_with(|site| {
                Ok(Adder {
                    inputs: site.typed_references::<dyn ValueSource>("Inputs"),
                })
            }),
        )
        .with_reference_slot(ReferenceSlot::new("Inputs", VALUE_SOURCE).multi())
        .with_capability(
            VALUE_SOURCE,
            extract_with::<Adder, dyn ValueSource>(|c| c as Rc<dyn ValueSource>),
        )
        .build();

        let needs_value = DescriptorBuilder::concrete(
            "NeedsValue",
            creator_with(|site| {
                Ok(ConstSource {
                    value: site.int_attribute("Value").unwrap_or(0),
                })
            }),
        )
        .with_attribute_slot(AttributeSlot::new("Value", ValueKind::Int).required())
        .with_capability(
            VALUE_SOURCE,
            extract_with::<ConstSource, dyn ValueSource>(|c| c as Rc<dyn ValueSource>),
        )
        .build();

        Arc::new(
            PackageCatalog::new()
                .with_component("calc", "ConstSource", const_source)
                .with_component("calc", "Doubler", doubler)
                .with_component("calc", "Strict", strict)
                .with_component("calc", "Adder", adder)
                .with_component("calc", "NeedsValue", needs_value),
        )
    }

    fn context_of(registry: Registry) -> Rc<RegistryContext> {
        RegistryContext::new(Arc::new(registry), catalog())
    }

    #[test]
    fn test_lazy_resolution_is_idempotent() {
        let mut registry = Registry::new();
        registry
            .insert_element("A", ComponentAddress::new("calc", "ConstSource"), false)
            .unwrap();

        let context = context_of(registry);

        let first = context.get_instance("A").unwrap();
        let second = context.get_instance("A").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(context.resolved_count(), 1);
    }

    #[test]
    fn test_reference_binding_creates_target_first() {
        let mut registry = Registry::new();
        registry
            .insert_element("A", ComponentAddress::new("calc", "ConstSource"), false)
            .unwrap()
            .set_attribute("Value", 5_i64);
        registry
            .insert_element("B", ComponentAddress::new("calc", "Doubler"), false)
            .unwrap()
            .set_reference("Input", "A");

        let context = context_of(registry);

        // 解析 B 时先创建 A 并把 Target 绑定到同一个 A 实例
        let b = context
            .get_capability::<dyn ValueSource>("B", VALUE_SOURCE)
            .unwrap();
        assert_eq!(b.value(), 10);
        assert_eq!(context.resolved_count(), 2);

        // 此后请求 A 返回的是同一个实例
        let a_first = context.get_instance("A").unwrap();
        let a_second = context.get_instance("A").unwrap();
        assert!(Rc::ptr_eq(&a_first, &a_second));
    }

    #[test]
    fn test_default_attribute_applied() {
        let mut registry = Registry::new();
        registry
            .insert_element("A", ComponentAddress::new("calc", "ConstSource"), false)
            .unwrap();

        let context = context_of(registry);

        let a = context
            .get_capability::<dyn ValueSource>("A", VALUE_SOURCE)
            .unwrap();
        assert_eq!(a.value(), 1);
    }

    #[test]
    fn test_missing_required_attribute_fails() {
        let mut registry = Registry::new();
        registry
            .insert_element("Bad", ComponentAddress::new("calc", "NeedsValue"), false)
            .unwrap();
        registry
            .insert_element("Good", ComponentAddress::new("calc", "ConstSource"), false)
            .unwrap();

        let context = context_of(registry);

        assert!(context.get_instance("Bad").is_none());
        // 无关元素的解析不受影响
        assert!(context.get_instance("Good").is_some());
    }

    #[test]
    fn test_multi_reference_binds_all_targets() {
        let mut registry = Registry::new();
        registry
            .insert_element("One", ComponentAddress::new("calc", "ConstSource"), false)
            .unwrap()
            .set_attribute("Value", 1_i64);
        registry
            .insert_element("Two", ComponentAddress::new("calc", "ConstSource"), false)
            .unwrap()
            .set_attribute("Value", 2_i64);
        registry
            .insert_element("Sum", ComponentAddress::new("calc", "Adder"), false)
            .unwrap()
            .set_references("Inputs", vec!["One".to_owned(), "Two".to_owned()]);

        let context = context_of(registry);

        let sum = context
            .get_capability::<dyn ValueSource>("Sum", VALUE_SOURCE)
            .unwrap();
        assert_eq!(sum.value(), 3);
        assert_eq!(context.resolved_count(), 3);
    }

    #[test]
    fn test_dangling_optional_reference_survives() {
        let mut registry = Registry::new();
        registry
            .insert_element("B", ComponentAddress::new("calc", "Doubler"), false)
            .unwrap()
            .set_reference("Input", "Missing");

        let context = context_of(registry);

        // 可选槽位的悬空接线得到空绑定，而不是解析失败
        let b = context
            .get_capability::<dyn ValueSource>("B", VALUE_SOURCE)
            .unwrap();
        assert_eq!(b.value(), 0);
    }

    #[test]
    fn test_dangling_required_reference_fails() {
        let mut registry = Registry::new();
        registry
            .insert_element("B", ComponentAddress::new("calc", "Strict"), false)
            .unwrap()
            .set_reference("Input", "Missing");

        let context = context_of(registry);
        assert!(context.get_instance("B").is_none());
    }

    #[test]
    fn test_wiring_cycle_fails_fast() {
        let mut registry = Registry::new();
        registry
            .insert_element("A", ComponentAddress::new("calc", "Strict"), false)
            .unwrap()
            .set_reference("Input", "B");
        registry
            .insert_element("B", ComponentAddress::new("calc", "Strict"), false)
            .unwrap()
            .set_reference("Input", "A");

        let context = context_of(registry);

        // 真正的接线循环快速失败，而不是无界递归
        assert!(context.get_instance("A").is_none());
        assert_eq!(context.resolved_count(), 0);
    }

    #[test]
    fn test_unknown_element_yields_none() {
        let context = context_of(Registry::new());
        assert!(context.get_instance("Nobody").is_none());
    }

    #[test]
    fn test_parent_context_chain() {
        let mut parent_registry = Registry::new();
        parent_registry
            .insert_element("Shared", ComponentAddress::new("calc", "ConstSource"), false)
            .unwrap()
            .set_attribute("Value", 21_i64);

        let mut child_registry = Registry::new();
        child_registry
            .insert_element("User", ComponentAddress::new("calc", "Doubler"), false)
            .unwrap()
            .set_reference("Input", "Shared");

        let parent = context_of(parent_registry);
        let child = RegistryContext::child_of(&parent, Arc::new(child_registry));

        let user = child
            .get_capability::<dyn ValueSource>("User", VALUE_SOURCE)
            .unwrap();
        assert_eq!(user.value(), 42);

        // 父上下文持有被委托解析的实例
        assert_eq!(parent.resolved_count(), 1);
        assert_eq!(child.resolved_count(), 1);
    }
}
