//! In-process host tree used by tests, benches and headless apps.

use std::fmt::Write as _;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::collections::map::HashMap;
use crate::error::HostError;
use crate::host::{HostAdapter, HostId};
use crate::props::{Event, EventHandler, PropValue, NODE_VALUE};

#[derive(Debug)]
pub enum HostNodeKind {
    Element {
        tag: String,
        attrs: HashMap<String, PropValue>,
        listeners: Vec<(String, EventHandler)>,
    },
    Text {
        text: String,
    },
}

#[derive(Debug)]
pub struct HostNode {
    pub kind: HostNodeKind,
    pub parent: Option<HostId>,
    pub children: Vec<HostId>,
}

impl HostNode {
    fn new(kind: HostNodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            HostNodeKind::Element { tag, .. } => Some(tag),
            HostNodeKind::Text { .. } => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            HostNodeKind::Text { text } => Some(text),
            HostNodeKind::Element { .. } => None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&PropValue> {
        match &self.kind {
            HostNodeKind::Element { attrs, .. } => attrs.get(name),
            HostNodeKind::Text { .. } => None,
        }
    }

    pub fn listener_count(&self, event: &str) -> usize {
        match &self.kind {
            HostNodeKind::Element { listeners, .. } => {
                listeners.iter().filter(|(name, _)| name == event).count()
            }
            HostNodeKind::Text { .. } => 0,
        }
    }
}

/// One observable change made to the host tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Create { id: HostId, label: String },
    SetProperty { id: HostId, name: String },
    ClearProperty { id: HostId, name: String },
    AddListener { id: HostId, event: String },
    RemoveListener { id: HostId, event: String },
    Insert { parent: HostId, child: HostId },
    Remove { parent: HostId, child: HostId },
    Release { id: HostId },
}

impl Mutation {
    /// Property and listener mutations, as opposed to structural ones.
    pub fn is_property(&self) -> bool {
        matches!(
            self,
            Mutation::SetProperty { .. }
                | Mutation::ClearProperty { .. }
                | Mutation::AddListener { .. }
                | Mutation::RemoveListener { .. }
        )
    }
}

/// Outcome of delivering one event to a node's listeners.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Default)]
pub struct MemoryHost {
    nodes: Vec<Option<HostNode>>,
    /// Released slots, reused by the next created node.
    free: Vec<usize>,
    journal: Vec<Mutation>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a detached element usable as a render container.
    pub fn create_container(&mut self, tag: &str) -> HostId {
        self.create_element(tag)
    }

    pub fn node(&self, id: HostId) -> Option<&HostNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: HostId) -> Result<&mut HostNode, HostError> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(HostError::Missing { id })
    }

    pub fn children(&self, id: HostId) -> &[HostId] {
        self.node(id).map(|node| node.children.as_slice()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Number of slots ever allocated, live or free.
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drains the mutation journal.
    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.journal)
    }

    /// Concatenated text of all text descendants of `id`.
    pub fn text_content(&self, id: HostId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: HostId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        if let Some(text) = node.text() {
            out.push_str(text);
        }
        for child in &node.children {
            self.collect_text(*child, out);
        }
    }

    /// Delivers `event` to every listener registered on `target` for its
    /// kind. A panicking listener is logged and does not stop the others.
    pub fn dispatch(&self, target: HostId, event: &Event) -> DispatchOutcome {
        let handlers: Vec<EventHandler> = match self.node(target).map(|node| &node.kind) {
            Some(HostNodeKind::Element { listeners, .. }) => listeners
                .iter()
                .filter(|(name, _)| *name == event.kind)
                .map(|(_, handler)| handler.clone())
                .collect(),
            _ => Vec::new(),
        };
        let mut outcome = DispatchOutcome::default();
        for handler in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler.call(event))) {
                Ok(()) => outcome.delivered += 1,
                Err(_) => {
                    log::error!("listener for {} on {target} panicked", event.kind);
                    outcome.failed += 1;
                }
            }
        }
        outcome
    }

    /// Finds the first element with attribute `name` equal to `value` under `root`.
    pub fn find_by_attr(&self, root: HostId, name: &str, value: &str) -> Option<HostId> {
        let node = self.node(root)?;
        if node.attr(name).and_then(PropValue::as_str) == Some(value) {
            return Some(root);
        }
        node.children
            .iter()
            .find_map(|child| self.find_by_attr(*child, name, value))
    }

    /// Renders the subtree at `root` as markup with sorted attributes.
    /// Listeners are omitted.
    pub fn dump_tree(&self, root: HostId) -> String {
        let mut output = String::new();
        self.dump_node(&mut output, root);
        output
    }

    fn dump_node(&self, output: &mut String, id: HostId) {
        let Some(node) = self.node(id) else {
            let _ = write!(output, "<missing {id}>");
            return;
        };
        match &node.kind {
            HostNodeKind::Text { text } => output.push_str(text),
            HostNodeKind::Element { tag, attrs, .. } => {
                let mut names: Vec<&String> = attrs.keys().collect();
                names.sort();
                let _ = write!(output, "<{tag}");
                for name in names {
                    let _ = write!(output, " {name}=\"{}\"", attrs[name]);
                }
                output.push('>');
                for child in &node.children {
                    self.dump_node(output, *child);
                }
                let _ = write!(output, "</{tag}>");
            }
        }
    }

    fn push(&mut self, node: HostNode, label: String) -> HostId {
        let id = match self.free.pop() {
            Some(index) => {
                self.nodes[index] = Some(node);
                HostId(index)
            }
            None => {
                self.nodes.push(Some(node));
                HostId(self.nodes.len() - 1)
            }
        };
        self.journal.push(Mutation::Create { id, label });
        id
    }
}

impl HostAdapter for MemoryHost {
    fn create_element(&mut self, tag: &str) -> HostId {
        let node = HostNode::new(HostNodeKind::Element {
            tag: tag.to_owned(),
            attrs: HashMap::new(),
            listeners: Vec::new(),
        });
        self.push(node, tag.to_owned())
    }

    fn create_text(&mut self, text: &str) -> HostId {
        let node = HostNode::new(HostNodeKind::Text {
            text: text.to_owned(),
        });
        self.push(node, "#text".to_owned())
    }

    fn set_property(&mut self, id: HostId, name: &str, value: &PropValue) -> Result<(), HostError> {
        match &mut self.node_mut(id)?.kind {
            HostNodeKind::Element { attrs, .. } => {
                attrs.insert(name.to_owned(), value.clone());
            }
            HostNodeKind::Text { text } if name == NODE_VALUE => {
                *text = value.to_string();
            }
            HostNodeKind::Text { .. } => {
                return Err(HostError::NotAnElement {
                    id,
                    operation: "hold attributes",
                })
            }
        }
        self.journal.push(Mutation::SetProperty {
            id,
            name: name.to_owned(),
        });
        Ok(())
    }

    fn clear_property(&mut self, id: HostId, name: &str) -> Result<(), HostError> {
        match &mut self.node_mut(id)?.kind {
            HostNodeKind::Element { attrs, .. } => {
                attrs.remove(name);
            }
            HostNodeKind::Text { text } => text.clear(),
        }
        self.journal.push(Mutation::ClearProperty {
            id,
            name: name.to_owned(),
        });
        Ok(())
    }

    fn add_listener(
        &mut self,
        id: HostId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError> {
        match &mut self.node_mut(id)?.kind {
            HostNodeKind::Element { listeners, .. } => {
                listeners.push((event.to_owned(), handler.clone()));
            }
            HostNodeKind::Text { .. } => {
                return Err(HostError::NotAnElement {
                    id,
                    operation: "receive listeners",
                })
            }
        }
        self.journal.push(Mutation::AddListener {
            id,
            event: event.to_owned(),
        });
        Ok(())
    }

    fn remove_listener(
        &mut self,
        id: HostId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError> {
        if let HostNodeKind::Element { listeners, .. } = &mut self.node_mut(id)?.kind {
            listeners.retain(|(name, existing)| !(name == event && existing.ptr_eq(handler)));
        }
        self.journal.push(Mutation::RemoveListener {
            id,
            event: event.to_owned(),
        });
        Ok(())
    }

    fn insert_child(
        &mut self,
        parent: HostId,
        child: HostId,
        before: Option<HostId>,
    ) -> Result<(), HostError> {
        self.node_mut(child)?;
        let parent_node = self.node_mut(parent)?;
        if parent_node.text().is_some() {
            return Err(HostError::NotAnElement {
                id: parent,
                operation: "hold children",
            });
        }
        let index = match before {
            Some(anchor) => parent_node
                .children
                .iter()
                .position(|existing| *existing == anchor)
                .ok_or(HostError::NotAChild {
                    parent,
                    child: anchor,
                })?,
            None => parent_node.children.len(),
        };
        parent_node.children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        self.journal.push(Mutation::Insert { parent, child });
        Ok(())
    }

    fn remove_child(&mut self, parent: HostId, child: HostId) -> Result<(), HostError> {
        let parent_node = self.node_mut(parent)?;
        let index = parent_node
            .children
            .iter()
            .position(|existing| *existing == child)
            .ok_or(HostError::NotAChild { parent, child })?;
        parent_node.children.remove(index);
        self.node_mut(child)?.parent = None;
        self.journal.push(Mutation::Remove { parent, child });
        Ok(())
    }

    fn release(&mut self, id: HostId) -> Result<(), HostError> {
        let children = std::mem::take(&mut self.node_mut(id)?.children);
        for child in children {
            // A child may already be gone if it was released on its own.
            let _ = self.release(child);
        }
        if let Some(slot) = self.nodes.get_mut(id.0) {
            if slot.take().is_some() {
                self.free.push(id.0);
            }
        }
        self.journal.push(Mutation::Release { id });
        Ok(())
    }

    fn contains(&self, id: HostId) -> bool {
        self.node(id).is_some()
    }
}

#[cfg(test)]
#[path = "tests/memory_host_tests.rs"]
mod tests;
