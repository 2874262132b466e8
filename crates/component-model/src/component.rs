//! 组件基础接口定义
//!
//! 提供组件实例的创建钩子、实例化现场访问接口以及类型擦除的创建/提取函数

use crate::errors::{ResolveError, ResolveResult};
use crate::value::AttributeValue;
use std::any::Any;
use std::rc::Rc;
use std::sync::Arc;

/// 组件基础 trait
///
/// 注册表驱动创建的组件实现此 trait；`on_created` 在所有槽位
/// 绑定完成后、实例进入缓存前调用一次。
pub trait Component: Any {
    /// 创建完成钩子
    fn on_created(&mut self) {}
}

/// 类型擦除的组件实例引用
pub type InstanceRef = Rc<dyn Any>;

/// 类型擦除的能力句柄
///
/// 内部承载一个 `Rc<dyn Trait>`，通过 [`unwrap_capability`] 还原。
pub type CapabilityHandle = Box<dyn Any>;

/// 从能力句柄还原具体的能力指针
///
/// 句柄承载的类型与请求不符时返回 `None`，不会恐慌。
pub fn unwrap_capability<T: ?Sized + 'static>(handle: CapabilityHandle) -> Option<Rc<T>> {
    handle.downcast::<Rc<T>>().ok().map(|boxed| *boxed)
}

/// 实例化现场
///
/// 组件创建函数通过此接口读取解析完成的属性值和引用能力。
pub trait ComponentSite {
    /// 正在实例化的元素标识
    fn element_id(&self) -> &str;

    /// 读取属性槽位的解析结果（配置值或槽位默认值）
    fn attribute(&self, slot_id: &str) -> Option<&AttributeValue>;

    /// 读取引用槽位绑定的第一个能力句柄
    fn reference(&self, slot_id: &str) -> Option<CapabilityHandle>;

    /// 读取引用槽位绑定的所有能力句柄
    fn references(&self, slot_id: &str) -> Vec<CapabilityHandle>;
}

/// 实例化现场的类型化访问扩展
pub trait ComponentSiteExt: ComponentSite {
    /// 读取引用槽位并还原为具体能力指针
    fn typed_reference<T: ?Sized + 'static>(&self, slot_id: &str) -> Option<Rc<T>> {
        unwrap_capability(self.reference(slot_id)?)
    }

    /// 读取引用槽位的所有目标并还原为具体能力指针
    fn typed_references<T: ?Sized + 'static>(&self, slot_id: &str) -> Vec<Rc<T>> {
        self.references(slot_id)
            .into_iter()
            .filter_map(unwrap_capability)
            .collect()
    }

    /// 读取布尔属性
    fn bool_attribute(&self, slot_id: &str) -> Option<bool> {
        self.attribute(slot_id)?.as_bool()
    }

    /// 读取整数属性
    fn int_attribute(&self, slot_id: &str) -> Option<i64> {
        self.attribute(slot_id)?.as_int()
    }

    /// 读取浮点属性
    fn real_attribute(&self, slot_id: &str) -> Option<f64> {
        self.attribute(slot_id)?.as_real()
    }

    /// 读取文本属性
    fn text_attribute(&self, slot_id: &str) -> Option<&str> {
        self.attribute(slot_id)?.as_text()
    }

    /// 读取文本列表属性
    fn text_list_attribute(&self, slot_id: &str) -> Option<&[String]> {
        self.attribute(slot_id)?.as_text_list()
    }
}

impl<S: ComponentSite + ?Sized> ComponentSiteExt for S {}

/// 组件创建函数类型
///
/// 由 [`creator_with`] 包装具体组件类型的创建闭包得到。
pub type CreatorFn =
    Arc<dyn Fn(&dyn ComponentSite) -> ResolveResult<InstanceRef> + Send + Sync>;

/// 能力提取函数类型
///
/// 给定一个活动实例，返回暴露某项能力的句柄；实例类型不符时返回 `None`。
pub type ExtractorFn = Arc<dyn Fn(&InstanceRef) -> Option<CapabilityHandle> + Send + Sync>;

/// 包装具体组件类型的创建闭包
///
/// 创建成功后先调用 [`Component::on_created`]，再做类型擦除。
pub fn creator_with<C, F>(create: F) -> CreatorFn
where
    C: Component + 'static,
    F: Fn(&dyn ComponentSite) -> ResolveResult<C> + Send + Sync + 'static,
{
    Arc::new(move |site| {
        let mut component = create(site)?;
        component.on_created();
        Ok(Rc::new(component) as InstanceRef)
    })
}

/// 由具体类型到能力指针的映射函数构建提取函数
pub fn extract_with<C, T>(map: fn(Rc<C>) -> Rc<T>) -> ExtractorFn
where
    C: 'static,
    T: ?Sized + 'static,
{
    Arc::new(move |instance| {
        let concrete = Rc::clone(instance).downcast::<C>().ok()?;
        Some(Box::new(map(concrete)) as CapabilityHandle)
    })
}

/// 构造创建失败错误的便捷函数
pub fn creation_failed(element_id: impl Into<String>, message: impl Into<String>) -> ResolveError {
    ResolveError::CreationFailed {
        element_id: element_id.into(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter {
        fn greet(&self) -> String;
    }

    struct HelloComponent {
        created: bool,
    }

    impl Component for HelloComponent {
        fn on_created(&mut self) {
            self.created = true;
        }
    }

    impl Greeter for HelloComponent {
        fn greet(&self) -> String {
            format!("hello (created: {})", self.created)
        }
    }

    struct EmptySite;

    impl ComponentSite for EmptySite {
        fn element_id(&self) -> &str {
            "test"
        }

        fn attribute(&self, _slot_id: &str) -> Option<&AttributeValue> {
            None
        }

        fn reference(&self, _slot_id: &str) -> Option<CapabilityHandle> {
            None
        }

        fn references(&self, _slot_id: &str) -> Vec<CapabilityHandle> {
            Vec::new()
        }
    }

    #[test]
    fn test_creator_invokes_hook() {
        let creator = creator_with(|_site| Ok(HelloComponent { created: false }));

        let instance = creator(&EmptySite).unwrap();
        let concrete = instance.downcast::<HelloComponent>().ok().unwrap();
        assert!(concrete.created);
    }

    #[test]
    fn test_extractor_type_mismatch() {
        let extractor = extract_with::<HelloComponent, dyn Greeter>(|c| c as Rc<dyn Greeter>);

        let matching: InstanceRef = Rc::new(HelloComponent { created: true });
        let greeter = unwrap_capability::<dyn Greeter>(extractor(&matching).unwrap()).unwrap();
        assert_eq!(greeter.greet(), "hello (created: true)");

        // 实例类型不符时提取返回 None
        let other: InstanceRef = Rc::new(42_i64);
        assert!(extractor(&other).is_none());
    }
}
