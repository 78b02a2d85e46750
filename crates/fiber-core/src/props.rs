//! Property bags carried by elements and work nodes.
//!
//! Values compare by identity: scalars compare by value, handlers and opaque
//! data compare by pointer. Two bags built from the same render are therefore
//! equal only where the component actually reused a value.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::element::Child;
use crate::host::HostId;

/// Attribute name prefix marking an event listener property.
pub const EVENT_PREFIX: &str = "on";

/// Attribute carrying the content of a text node.
pub const NODE_VALUE: &str = "nodeValue";

/// Event delivered to listeners registered through `on*` properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: String,
    pub target: HostId,
    pub value: Option<String>,
}

impl Event {
    pub fn new(kind: impl Into<String>, target: HostId) -> Self {
        Self {
            kind: kind.into(),
            target,
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Shared event callback. Identity is the allocation, so cloning a handler
/// keeps it "unchanged" for diffing while rebuilding the closure does not.
#[derive(Clone)]
pub struct EventHandler {
    callback: Rc<dyn Fn(&Event)>,
}

impl EventHandler {
    pub fn new(callback: impl Fn(&Event) + 'static) -> Self {
        Self {
            callback: Rc::new(callback),
        }
    }

    pub fn call(&self, event: &Event) {
        (self.callback)(event);
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHandler({:p})", Rc::as_ptr(&self.callback) as *const ())
    }
}

/// Raw, non-element child value. Classified as a text node during
/// reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Str(Rc<str>),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => f.write_str(s),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(Rc::from(value))
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(Rc::from(value))
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(i64::from(value))
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Scalar::Int(i64::from(value))
    }
}

impl From<usize> for Scalar {
    fn from(value: usize) -> Self {
        Scalar::Int(value as i64)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// A single property value.
#[derive(Clone)]
pub enum PropValue {
    Str(Rc<str>),
    Int(i64),
    Float(f64),
    Bool(bool),
    Handler(EventHandler),
    Data(Rc<dyn Any>),
}

impl PropValue {
    pub fn data<T: 'static>(value: T) -> Self {
        PropValue::Data(Rc::new(value))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_handler(&self) -> Option<&EventHandler> {
        match self {
            PropValue::Handler(handler) => Some(handler),
            _ => None,
        }
    }

    pub fn downcast<T: 'static>(&self) -> Option<Rc<T>> {
        match self {
            PropValue::Data(data) => Rc::clone(data).downcast::<T>().ok(),
            _ => None,
        }
    }

    /// Identity comparison used by the property diff.
    pub fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Str(a), PropValue::Str(b)) => a == b,
            (PropValue::Int(a), PropValue::Int(b)) => a == b,
            (PropValue::Float(a), PropValue::Float(b)) => a.to_bits() == b.to_bits(),
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Handler(a), PropValue::Handler(b)) => a.ptr_eq(b),
            (PropValue::Data(a), PropValue::Data(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Str(s) => write!(f, "{s:?}"),
            PropValue::Int(i) => write!(f, "{i}"),
            PropValue::Float(v) => write!(f, "{v}"),
            PropValue::Bool(b) => write!(f, "{b}"),
            PropValue::Handler(handler) => fmt::Debug::fmt(handler, f),
            PropValue::Data(data) => write!(f, "Data({:p})", Rc::as_ptr(data) as *const ()),
        }
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Str(s) => f.write_str(s),
            PropValue::Int(i) => write!(f, "{i}"),
            PropValue::Float(v) => write!(f, "{v}"),
            PropValue::Bool(b) => write!(f, "{b}"),
            other => fmt::Debug::fmt(other, f),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(Rc::from(value))
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(Rc::from(value))
    }
}

impl From<Rc<str>> for PropValue {
    fn from(value: Rc<str>) -> Self {
        PropValue::Str(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Int(i64::from(value))
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<EventHandler> for PropValue {
    fn from(value: EventHandler) -> Self {
        PropValue::Handler(value)
    }
}

impl From<Scalar> for PropValue {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Str(s) => PropValue::Str(s),
            Scalar::Int(i) => PropValue::Int(i),
            Scalar::Float(v) => PropValue::Float(v),
            Scalar::Bool(b) => PropValue::Bool(b),
        }
    }
}

/// Returns whether `name` denotes an event listener property.
pub fn is_event(name: &str) -> bool {
    name.starts_with(EVENT_PREFIX)
}

/// Derives the host event name from a listener property name.
///
/// `onClick` becomes `click`.
pub fn event_name(name: &str) -> String {
    name.get(EVENT_PREFIX.len()..)
        .unwrap_or_default()
        .to_lowercase()
}

/// Name-to-value mapping plus the ordered `children` sequence.
#[derive(Clone, Default, PartialEq)]
pub struct Props {
    attrs: IndexMap<String, PropValue>,
    children: Vec<Child>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_handler(self, name: impl Into<String>, handler: impl Fn(&Event) + 'static) -> Self {
        self.with(name, EventHandler::new(handler))
    }

    pub fn with_data<T: 'static>(self, name: impl Into<String>, value: T) -> Self {
        self.with(name, PropValue::data(value))
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PropValue>) {
        self.attrs.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.attrs.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(PropValue::as_str)
    }

    pub fn get_data<T: 'static>(&self, name: &str) -> Option<Rc<T>> {
        self.get(name).and_then(PropValue::downcast::<T>)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.attrs.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn attr_count(&self) -> usize {
        self.attrs.len()
    }

    pub fn children(&self) -> &[Child] {
        &self.children
    }

    pub(crate) fn set_children(&mut self, children: Vec<Child>) {
        self.children = children;
    }

    pub(crate) fn text(value: impl Into<PropValue>) -> Self {
        Props::new().with(NODE_VALUE, value)
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("attrs", &self.attrs)
            .field("children", &self.children.len())
            .finish()
    }
}
