//! # 组合引擎演示程序
//!
//! 演示如何登记组件描述符、编辑注册表、持久化到文件，
//! 以及通过解析上下文获取活动实例

use clap::Parser;
use component_model::{
    creator_with, extract_with, set_process_catalog, AttributeSlot, CapabilityKey, Component,
    ComponentAddress, ComponentCatalog, ComponentSiteExt, DescriptorBuilder, PackageCatalog,
    ReferenceSlot, ValueKind,
};
use registry_model::{JsonRegistryLoader, LoadState, Registry, RegistryLoader};
use registry_runtime::RegistryContext;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{error, info};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "composer-demo")]
#[command(about = "组合引擎演示应用")]
struct Args {
    /// 注册表文件保存路径
    #[arg(short, long)]
    registry: Option<PathBuf>,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// 问候语能力
const GREETER: CapabilityKey = CapabilityKey::new("demo.IGreeter");

trait Greeter {
    fn greeting(&self) -> String;
}

/// 基础组件：输出固定问候语
struct PlainGreeter {
    text: String,
}

impl Component for PlainGreeter {
    fn on_created(&mut self) {
        info!(text = %self.text, "PlainGreeter 创建完成");
    }
}

impl Greeter for PlainGreeter {
    fn greeting(&self) -> String {
        self.text.clone()
    }
}

/// 装饰组件：重复内部问候语
struct RepeatingGreeter {
    times: i64,
    inner: Option<Rc<dyn Greeter>>,
}

impl Component for RepeatingGreeter {}

impl Greeter for RepeatingGreeter {
    fn greeting(&self) -> String {
        let base = self
            .inner
            .as_ref()
            .map_or_else(|| "...".to_owned(), |inner| inner.greeting());
        vec![base; self.times.max(0) as usize].join(" ")
    }
}

fn main() {
    let args = Args::parse();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_max_level(parse_log_level(&args.log_level))
        .init();

    info!("启动组合引擎演示应用");

    let catalog = build_catalog();
    set_process_catalog(catalog.clone());

    let registry = build_registry(&catalog);

    if let Some(path) = &args.registry {
        let loader = JsonRegistryLoader::new();
        match loader.save_to_file(&registry, path) {
            LoadState::Ok => info!(path = %path.display(), "注册表已保存"),
            state => error!(path = %path.display(), ?state, "注册表保存失败"),
        }
    }

    demonstrate_resolution(registry, catalog);
}

/// 登记全部演示组件
fn build_catalog() -> Arc<PackageCatalog> {
    let plain = DescriptorBuilder::concrete(
        "PlainGreeter",
        creator_with(|site| {
            Ok(PlainGreeter {
                text: site.text_attribute("Text").unwrap_or("你好").to_owned(),
            })
        }),
    )
    .with_description("输出固定问候语的组件")
    .with_attribute_slot(
        AttributeSlot::new("Text", ValueKind::Text)
            .with_description("问候语文本")
            .with_default("你好"),
    )
    .with_capability(
        GREETER,
        extract_with::<PlainGreeter, dyn Greeter>(|c| c as Rc<dyn Greeter>),
    )
    .build();

    let repeating = DescriptorBuilder::concrete(
        "RepeatingGreeter",
        creator_with(|site| {
            Ok(RepeatingGreeter {
                times: site.int_attribute("Times").unwrap_or(1),
                inner: site.typed_reference::<dyn Greeter>("Inner"),
            })
        }),
    )
    .with_description("重复内部问候语的装饰组件")
    .with_attribute_slot(AttributeSlot::new("Times", ValueKind::Int).with_default(2_i64))
    .with_reference_slot(ReferenceSlot::new("Inner", GREETER))
    .with_capability(
        GREETER,
        extract_with::<RepeatingGreeter, dyn Greeter>(|c| c as Rc<dyn Greeter>),
    )
    .build();

    Arc::new(
        PackageCatalog::new()
            .with_component("demo", "PlainGreeter", plain)
            .with_component("demo", "RepeatingGreeter", repeating),
    )
}

/// 编排演示对象图
fn build_registry(catalog: &Arc<PackageCatalog>) -> Registry {
    let mut registry = Registry::with_catalog(catalog.clone() as Arc<dyn ComponentCatalog>);
    registry.set_description("组合引擎演示图");

    match registry.insert_element("Base", ComponentAddress::new("demo", "PlainGreeter"), true) {
        Ok(element) => element.set_attribute("Text", "早上好"),
        Err(error) => error!(%error, "元素插入失败"),
    }

    match registry.insert_element(
        "Echo",
        ComponentAddress::new("demo", "RepeatingGreeter"),
        true,
    ) {
        Ok(element) => {
            element.set_attribute("Times", 3_i64);
            element.set_reference("Inner", "Base");
        }
        Err(error) => error!(%error, "元素插入失败"),
    }

    registry
}

/// 解析对象图并输出结果
fn demonstrate_resolution(registry: Registry, catalog: Arc<PackageCatalog>) {
    let context = RegistryContext::new(Arc::new(registry), catalog);

    match context.get_capability::<dyn Greeter>("Echo", GREETER) {
        Some(greeter) => info!(greeting = %greeter.greeting(), "解析完成"),
        None => error!("Echo 元素解析失败"),
    }

    info!(resolved = context.resolved_count(), "上下文实例统计");
}

fn parse_log_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
