//! 注册表引擎的集成测试
//!
//! 覆盖从目录登记、注册表编辑、文件持久化到惰性解析与
//! 复合组件转发的完整链路

use component_model::{
    creator_with, extract_with, AttributeSlot, CapabilityKey, Component, ComponentAddress,
    ComponentSiteExt, DescriptorBuilder, PackageCatalog, ReferenceSlot, ValueKind,
};
use registry_model::{JsonRegistryLoader, LoadState, Registry, RegistryLoader, StdFileSystem};
use registry_runtime::{composite_instance, RegistriesManager, RegistryContext};
use std::rc::Rc;
use std::sync::Arc;

const MEASURE: CapabilityKey = CapabilityKey::new("it.IMeasure");

trait Measure {
    fn value(&self) -> i64;
}

/// 测试组件：携带一个整数值
struct Foo {
    value: i64,
}

impl Component for Foo {}

impl Measure for Foo {
    fn value(&self) -> i64 {
        self.value
    }
}

/// 测试组件：转发绑定目标的值
struct Bar {
    target: Rc<dyn Measure>,
}

impl Component for Bar {}

impl Measure for Bar {
    fn value(&self) -> i64 {
        self.target.value()
    }
}

fn catalog() -> Arc<PackageCatalog> {
    let foo = DescriptorBuilder::concrete(
        "Foo",
        creator_with(|site| {
            Ok(Foo {
                value: site.int_attribute("Value").unwrap_or(0),
            })
        }),
    )
    .with_attribute_slot(AttributeSlot::new("Value", ValueKind::Int).with_default(0_i64))
    .with_capability(MEASURE, extract_with::<Foo, dyn Measure>(|c| c as Rc<dyn Measure>))
    .build();

    let bar = DescriptorBuilder::concrete(
        "Bar",
        creator_with(|site| {
            let target = site
                .typed_reference::<dyn Measure>("Target")
                .ok_or_else(|| {
                    component_model::creation_failed(site.element_id(), "Target 能力缺失")
                })?;
            Ok(Bar { target })
        }),
    )
    .with_reference_slot(ReferenceSlot::new("Target", MEASURE).required())
    .with_capability(MEASURE, extract_with::<Bar, dyn Measure>(|c| c as Rc<dyn Measure>))
    .build();

    Arc::new(
        PackageCatalog::new()
            .with_component("it", "Foo", foo)
            .with_component("it", "Bar", bar),
    )
}

#[test]
fn test_reference_resolution_scenario() {
    let mut registry = Registry::with_catalog(catalog());
    registry
        .insert_element("A", ComponentAddress::new("it", "Foo"), true)
        .unwrap()
        .set_attribute("Value", 5_i64);
    registry
        .insert_element("B", ComponentAddress::new("it", "Bar"), true)
        .unwrap()
        .set_reference("Target", "A");

    let context = RegistryContext::new(Arc::new(registry), catalog());

    // 解析 B 会先创建 A（Value==5）并绑定到同一实例
    let b = context.get_capability::<dyn Measure>("B", MEASURE).unwrap();
    assert_eq!(b.value(), 5);

    let a_first = context.get_instance("A").unwrap();
    let a_second = context.get_instance("A").unwrap();
    assert!(Rc::ptr_eq(&a_first, &a_second));
}

#[test]
fn test_insert_with_ensure_created_validates_address() {
    let mut registry = Registry::with_catalog(catalog());

    assert!(registry
        .insert_element("Ok", ComponentAddress::new("it", "Foo"), true)
        .is_ok());
    assert!(registry
        .insert_element("Bogus", ComponentAddress::new("it", "Nothing"), true)
        .is_err());

    // 不要求立即创建时，未知地址推迟到解析阶段才失败
    assert!(registry
        .insert_element("Lazy", ComponentAddress::new("it", "Nothing"), false)
        .is_ok());
    let context = RegistryContext::new(Arc::new(registry), catalog());
    assert!(context.get_instance("Lazy").is_none());
    assert!(context.get_instance("Ok").is_some());
}

/// 把内层注册表保存为文件，再经由管理器按地址装配为复合组件
#[test]
fn test_persisted_composite_forwarding() {
    let directory = tempfile::tempdir().unwrap();
    let package_dir = directory.path().join("pkg");
    std::fs::create_dir_all(&package_dir).unwrap();

    // 内层注册表：导出 Leaf 的能力与别名
    let mut inner = Registry::with_catalog(catalog());
    inner
        .insert_element("Leaf", ComponentAddress::new("it", "Foo"), true)
        .unwrap()
        .set_attribute("Value", 5_i64);
    inner.set_interface_exported("Leaf", MEASURE, true).unwrap();
    inner.set_element_exported("leaf", "Leaf").unwrap();

    let loader = JsonRegistryLoader::new();
    assert_eq!(
        loader.save_to_file(&inner, &package_dir.join("Inner")),
        LoadState::Ok
    );

    // 主注册表：Nested 元素指向持久化的内层注册表，Relay 接线到它
    let package_id = package_dir.display().to_string();
    let mut main = Registry::with_catalog(catalog());
    main.insert_element("Nested", ComponentAddress::new(&package_id, "Inner"), false)
        .unwrap();
    main.insert_element("Relay", ComponentAddress::new("it", "Bar"), true)
        .unwrap()
        .set_reference("Target", "Nested");

    let manager = Rc::new(RegistriesManager::new(
        Arc::new(StdFileSystem::new()),
        Arc::new(JsonRegistryLoader::new()),
        catalog(),
    ));
    let context =
        RegistryContext::with_manager(Arc::new(main), catalog(), Rc::clone(&manager), None);

    // 复合组件实例通过导出映射转发能力请求
    let nested = context.get_instance("Nested").unwrap();
    assert!(nested.is_composite());
    let leaf = nested.query_as::<dyn Measure>(MEASURE, "").unwrap();
    assert_eq!(leaf.value(), 5);

    // 普通组件的引用槽位同样可以接线到复合组件
    let relay = context.get_capability::<dyn Measure>("Relay", MEASURE).unwrap();
    assert_eq!(relay.value(), 5);

    // 同一地址只加载一次
    assert_eq!(manager.cached_count(), 1);
}

#[test]
fn test_manager_caches_misses() {
    let manager = RegistriesManager::new(
        Arc::new(StdFileSystem::new()),
        Arc::new(JsonRegistryLoader::new()),
        catalog(),
    );

    let bogus = ComponentAddress::new("/nonexistent", "Void");
    assert!(manager.get_registry(&bogus, None).is_none());
    assert!(manager.get_registry(&bogus, None).is_none());
    assert_eq!(manager.cached_count(), 1);
}

/// 嵌套两层的复合组件通过点路径寻址最内层能力
#[test]
fn test_two_level_export_forwarding() {
    let mut inner = Registry::new();
    inner
        .insert_element("Leaf", ComponentAddress::new("it", "Foo"), false)
        .unwrap()
        .set_attribute("Value", 99_i64);
    inner.set_interface_exported("Leaf", MEASURE, true).unwrap();
    inner.set_element_exported("leaf", "Leaf").unwrap();

    let mut middle = Registry::new();
    middle
        .insert_embedded_registry("InnerReg", Arc::new(inner))
        .unwrap();
    middle
        .insert_element("Inner", ComponentAddress::embedded("InnerReg"), true)
        .unwrap();
    middle.set_element_exported("inner", "Inner").unwrap();
    middle
        .set_interface_exported("Inner", MEASURE, true)
        .unwrap();

    let composite = composite_instance("Middle", Arc::new(middle), catalog());

    // 直接导出与点路径寻址等价
    let direct = composite.query_as::<dyn Measure>(MEASURE, "").unwrap();
    let dotted = composite
        .query_as::<dyn Measure>(MEASURE, "inner.leaf")
        .unwrap();
    assert_eq!(direct.value(), 99);
    assert_eq!(dotted.value(), 99);
}

/// 写出-读回往返保持元素、接线、导出映射与布局坐标
#[test]
fn test_file_round_trip_preserves_graph() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("graph.registry");

    let mut original = Registry::with_catalog(catalog());
    original
        .insert_element("A", ComponentAddress::new("it", "Foo"), true)
        .unwrap()
        .set_attribute("Value", 5_i64);
    original
        .insert_element("B", ComponentAddress::new("it", "Bar"), true)
        .unwrap()
        .set_reference("Target", "A");
    original
        .element_mut("A")
        .unwrap()
        .set_layout_position(10.25, -3.5);
    original.set_interface_exported("A", MEASURE, true).unwrap();
    original.set_element_exported("entry", "A").unwrap();
    original.set_description("往返测试图");

    let loader = JsonRegistryLoader::new();
    assert_eq!(loader.save_to_file(&original, &path), LoadState::Ok);

    let mut loaded = Registry::with_catalog(catalog());
    assert_eq!(loader.load_from_file(&mut loaded, &path), LoadState::Ok);

    assert_eq!(loaded.element_ids(), original.element_ids());
    assert_eq!(loaded.element("A"), original.element("A"));
    assert_eq!(loaded.element("B"), original.element("B"));
    assert_eq!(loaded.exported_interfaces(), original.exported_interfaces());
    assert_eq!(loaded.exported_elements(), original.exported_elements());
    assert_eq!(
        loaded.element("A").unwrap().layout_position(),
        (10.25, -3.5)
    );

    // 读回的注册表可以直接解析
    let context = RegistryContext::new(Arc::new(loaded), catalog());
    let b = context.get_capability::<dyn Measure>("B", MEASURE).unwrap();
    assert_eq!(b.value(), 5);
}
