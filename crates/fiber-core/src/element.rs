//! Element descriptors and the factory that builds them.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::props::{Props, Scalar};

type RenderFn = dyn Fn(&Props) -> Element;

type RenderFnPtr = fn(&Props) -> Element;

/// A render function usable as an element type.
///
/// Two components are the same type when they wrap the same Rust function
/// type. Passing the same function item (or the same closure expression) on
/// every render therefore keeps its hook state, while a different function at
/// the same position replaces the subtree.
///
/// Function pointers all share one Rust type, so they are told apart by
/// address instead. Shared `Rc<dyn Fn>` render functions go through
/// [`Component::from_rc`] and are keyed by allocation: keep the same `Rc`
/// across renders to keep its state. A `Box<dyn Fn>` has no stable identity
/// and becomes a new component every time it is wrapped. Closures are keyed
/// by their expression: two values of one closure expression are the same
/// component whatever they capture.
#[derive(Clone)]
pub struct Component {
    key: ComponentKey,
    name: &'static str,
    render: Rc<RenderFn>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ComponentKey {
    Type(TypeId),
    Address(usize),
    Unique(u64),
}

static NEXT_UNIQUE: AtomicU64 = AtomicU64::new(0);

impl Component {
    pub fn new<F>(render: F) -> Self
    where
        F: Fn(&Props) -> Element + 'static,
    {
        let erased: &dyn Any = &render;
        if let Some(render) = erased.downcast_ref::<RenderFnPtr>() {
            return Self::from_fn(*render);
        }
        let key = if erased.is::<Box<RenderFn>>() {
            ComponentKey::Unique(NEXT_UNIQUE.fetch_add(1, Ordering::Relaxed))
        } else {
            ComponentKey::Type(TypeId::of::<F>())
        };
        Self {
            key,
            name: short_type_name(type_name::<F>()),
            render: Rc::new(render),
        }
    }

    /// Component keyed by the address of `render`. Functions the compiler
    /// merges into one body share an address.
    pub fn from_fn(render: RenderFnPtr) -> Self {
        Self {
            key: ComponentKey::Address(render as usize),
            name: "fn",
            render: Rc::new(render),
        }
    }

    /// Component keyed by the allocation behind `render`.
    pub fn from_rc(render: Rc<RenderFn>) -> Self {
        Self {
            key: ComponentKey::Address(Rc::as_ptr(&render) as *const () as usize),
            name: "dyn Fn",
            render,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn render(&self, props: &Props) -> Element {
        (self.render)(props)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.name)
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    full.rsplit("::").next().unwrap_or(full)
}

/// Closed set of element types.
#[derive(Clone, Debug, PartialEq)]
pub enum ElementKind {
    Host(Rc<str>),
    Text,
    Component(Component),
}

impl ElementKind {
    pub fn is_component(&self) -> bool {
        matches!(self, ElementKind::Component(_))
    }

    pub fn label(&self) -> &str {
        match self {
            ElementKind::Host(tag) => tag,
            ElementKind::Text => "#text",
            ElementKind::Component(component) => component.name(),
        }
    }
}

impl From<&str> for ElementKind {
    fn from(tag: &str) -> Self {
        ElementKind::Host(Rc::from(tag))
    }
}

impl From<Component> for ElementKind {
    fn from(component: Component) -> Self {
        ElementKind::Component(component)
    }
}

struct ElementInner {
    kind: ElementKind,
    props: Props,
}

/// Immutable declarative description of one node.
#[derive(Clone)]
pub struct Element {
    inner: Rc<ElementInner>,
}

impl Element {
    pub fn host(tag: &str) -> ElementBuilder {
        ElementBuilder::new(ElementKind::from(tag))
    }

    pub fn component(component: &Component, props: Props) -> Element {
        create_element(component.clone(), props, ())
    }

    /// Text element holding `value` as its node value.
    pub fn text(value: impl Into<Scalar>) -> Element {
        let scalar: Scalar = value.into();
        Element {
            inner: Rc::new(ElementInner {
                kind: ElementKind::Text,
                props: Props::text(scalar),
            }),
        }
    }

    pub fn kind(&self) -> &ElementKind {
        &self.inner.kind
    }

    pub fn props(&self) -> &Props {
        &self.inner.props
    }

    pub fn children(&self) -> &[Child] {
        self.inner.props.children()
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
            || (self.inner.kind == other.inner.kind && self.inner.props == other.inner.props)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("kind", &self.inner.kind)
            .field("props", &self.inner.props)
            .finish()
    }
}

/// One entry of a `children` sequence.
#[derive(Clone, Debug, PartialEq)]
pub enum Child {
    Element(Element),
    Scalar(Scalar),
}

/// Anything that can be flattened into a children sequence.
pub trait IntoChildren {
    fn push_into(self, out: &mut Vec<Child>);
}

impl IntoChildren for () {
    fn push_into(self, _out: &mut Vec<Child>) {}
}

impl IntoChildren for Child {
    fn push_into(self, out: &mut Vec<Child>) {
        out.push(self);
    }
}

impl IntoChildren for Element {
    fn push_into(self, out: &mut Vec<Child>) {
        out.push(Child::Element(self));
    }
}

impl IntoChildren for ElementBuilder {
    fn push_into(self, out: &mut Vec<Child>) {
        out.push(Child::Element(self.build()));
    }
}

impl IntoChildren for Scalar {
    fn push_into(self, out: &mut Vec<Child>) {
        out.push(Child::Scalar(self));
    }
}

macro_rules! scalar_children {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoChildren for $ty {
                fn push_into(self, out: &mut Vec<Child>) {
                    out.push(Child::Scalar(Scalar::from(self)));
                }
            }
        )*
    };
}

scalar_children!(&str, String, i32, i64, u32, usize, f64, bool);

impl<T: IntoChildren> IntoChildren for Vec<T> {
    fn push_into(self, out: &mut Vec<Child>) {
        for child in self {
            child.push_into(out);
        }
    }
}

impl<T: IntoChildren, const N: usize> IntoChildren for [T; N] {
    fn push_into(self, out: &mut Vec<Child>) {
        for child in self {
            child.push_into(out);
        }
    }
}

impl<T: IntoChildren> IntoChildren for Option<T> {
    fn push_into(self, out: &mut Vec<Child>) {
        if let Some(child) = self {
            child.push_into(out);
        }
    }
}

macro_rules! tuple_children {
    ($($name:ident),+) => {
        impl<$($name: IntoChildren),+> IntoChildren for ($($name,)+) {
            #[allow(non_snake_case)]
            fn push_into(self, out: &mut Vec<Child>) {
                let ($($name,)+) = self;
                $($name.push_into(out);)+
            }
        }
    };
}

tuple_children!(A);
tuple_children!(A, B);
tuple_children!(A, B, C);
tuple_children!(A, B, C, D);
tuple_children!(A, B, C, D, E);
tuple_children!(A, B, C, D, E, F);

/// Flattens `children` into an ordered list.
pub fn flatten_children(children: impl IntoChildren) -> Vec<Child> {
    let mut out = Vec::new();
    children.push_into(&mut out);
    out
}

/// Builds an element descriptor. Nested child sequences are flattened, raw
/// scalars are kept as-is and become text nodes during reconciliation.
pub fn create_element(
    kind: impl Into<ElementKind>,
    mut props: Props,
    children: impl IntoChildren,
) -> Element {
    props.set_children(flatten_children(children));
    Element {
        inner: Rc::new(ElementInner {
            kind: kind.into(),
            props,
        }),
    }
}

/// Collects heterogeneous children into one flattened `Vec<Child>`.
#[macro_export]
macro_rules! children {
    () => {
        ::std::vec::Vec::<$crate::Child>::new()
    };
    ($($child:expr),+ $(,)?) => {{
        let mut out = ::std::vec::Vec::<$crate::Child>::new();
        $($crate::IntoChildren::push_into($child, &mut out);)+
        out
    }};
}

/// Fluent builder for host elements.
pub struct ElementBuilder {
    kind: ElementKind,
    props: Props,
    children: Vec<Child>,
}

impl ElementBuilder {
    fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            props: Props::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &str, value: impl Into<crate::props::PropValue>) -> Self {
        self.props.insert(name, value);
        self
    }

    pub fn on(self, name: &str, handler: impl Fn(&crate::props::Event) + 'static) -> Self {
        self.attr(name, crate::props::EventHandler::new(handler))
    }

    pub fn child(mut self, child: impl IntoChildren) -> Self {
        child.push_into(&mut self.children);
        self
    }

    pub fn build(self) -> Element {
        create_element(self.kind, self.props, self.children)
    }
}

impl From<ElementBuilder> for Element {
    fn from(builder: ElementBuilder) -> Self {
        builder.build()
    }
}
