//! Host adapter interface.
//!
//! The runtime never touches host nodes directly. It calls the provided
//! operations here (`instantiate`, `apply_property_diff`, `remove`), which
//! are written in terms of a small set of primitives each host implements.

use std::fmt;

use crate::element::ElementKind;
use crate::error::HostError;
use crate::props::{event_name, is_event, EventHandler, PropValue, Props, NODE_VALUE};

/// Opaque handle to a host node, assigned by the host adapter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostId(pub usize);

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub trait HostAdapter {
    fn create_element(&mut self, tag: &str) -> HostId;
    fn create_text(&mut self, text: &str) -> HostId;
    fn set_property(&mut self, node: HostId, name: &str, value: &PropValue) -> Result<(), HostError>;
    fn clear_property(&mut self, node: HostId, name: &str) -> Result<(), HostError>;
    fn add_listener(
        &mut self,
        node: HostId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError>;
    fn remove_listener(
        &mut self,
        node: HostId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError>;
    /// Attaches `child` under `parent`, before `before` when given, else last.
    fn insert_child(
        &mut self,
        parent: HostId,
        child: HostId,
        before: Option<HostId>,
    ) -> Result<(), HostError>;
    fn remove_child(&mut self, parent: HostId, child: HostId) -> Result<(), HostError>;
    /// Frees a detached node and its subtree.
    fn release(&mut self, node: HostId) -> Result<(), HostError>;
    fn contains(&self, node: HostId) -> bool;

    /// Creates a host node for `kind` with all of `props` applied.
    ///
    /// Component kinds have no host node; callers never ask for one.
    fn instantiate(&mut self, kind: &ElementKind, props: &Props) -> Result<HostId, HostError> {
        match kind {
            ElementKind::Text => {
                let text = props.get(NODE_VALUE).map(|v| v.to_string()).unwrap_or_default();
                Ok(self.create_text_host(&text))
            }
            ElementKind::Host(tag) => {
                let node = self.create_element(tag);
                self.apply_property_diff(node, &Props::new(), props)?;
                Ok(node)
            }
            ElementKind::Component(component) => {
                unreachable!("component {} has no host node", component.name())
            }
        }
    }

    fn create_text_host(&mut self, text: &str) -> HostId {
        self.create_text(text)
    }

    /// Applies the difference between two property bags to `node`.
    fn apply_property_diff(
        &mut self,
        node: HostId,
        old: &Props,
        new: &Props,
    ) -> Result<(), HostError> {
        let diff = diff_props(old, new);
        for (event, handler) in &diff.removed_listeners {
            self.remove_listener(node, event, handler)?;
        }
        for (event, handler) in &diff.added_listeners {
            self.add_listener(node, event, handler)?;
        }
        for name in &diff.cleared {
            self.clear_property(node, name)?;
        }
        for (name, value) in &diff.set {
            self.set_property(node, name, value)?;
        }
        Ok(())
    }

    /// Detaches `node` from `parent` and frees it.
    fn remove(&mut self, parent: HostId, node: HostId) -> Result<(), HostError> {
        self.remove_child(parent, node)?;
        self.release(node)
    }
}

/// Changes needed to move a host node from one property bag to another.
#[derive(Debug, Default, PartialEq)]
pub struct PropDiff {
    pub removed_listeners: Vec<(String, EventHandler)>,
    pub added_listeners: Vec<(String, EventHandler)>,
    pub cleared: Vec<String>,
    pub set: Vec<(String, PropValue)>,
}

impl PropDiff {
    pub fn is_empty(&self) -> bool {
        self.removed_listeners.is_empty()
            && self.added_listeners.is_empty()
            && self.cleared.is_empty()
            && self.set.is_empty()
    }
}

/// Computes the listener and attribute changes between `old` and `new`.
///
/// Values are compared by identity (see [`PropValue::same`]). An `on*`
/// property whose value is not a handler is ignored with a warning.
pub fn diff_props(old: &Props, new: &Props) -> PropDiff {
    let mut diff = PropDiff::default();
    let changed = |name: &str, value: &PropValue, other: &Props| {
        other.get(name).map_or(true, |current| !current.same(value))
    };

    for (name, value) in old.attrs().filter(|(name, _)| is_event(name)) {
        if changed(name, value, new) {
            if let Some(handler) = listener(name, value) {
                diff.removed_listeners.push((event_name(name), handler));
            }
        }
    }
    for (name, value) in new.attrs().filter(|(name, _)| is_event(name)) {
        if changed(name, value, old) {
            if let Some(handler) = listener(name, value) {
                diff.added_listeners.push((event_name(name), handler));
            }
        }
    }
    for (name, _) in old.attrs().filter(|(name, _)| !is_event(name)) {
        if !new.contains(name) {
            diff.cleared.push(name.to_owned());
        }
    }
    for (name, value) in new.attrs().filter(|(name, _)| !is_event(name)) {
        if changed(name, value, old) {
            diff.set.push((name.to_owned(), value.clone()));
        }
    }
    diff
}

fn listener(name: &str, value: &PropValue) -> Option<EventHandler> {
    match value.as_handler() {
        Some(handler) => Some(handler.clone()),
        None => {
            log::warn!("property {name} looks like a listener but holds {value:?}; skipped");
            None
        }
    }
}
