//! Work nodes and the generation-tagged arena that owns them.
//!
//! Every live tree (the last committed one and the one being built) stores
//! its nodes here. Links between nodes, including the `alternate` link into
//! the previous tree, are plain [`NodeId`]s. A lookup through an id whose
//! slot has since been freed and reused returns `None` instead of aliasing
//! an unrelated node.

use std::fmt;

use crate::element::ElementKind;
use crate::hooks::HookStore;
use crate::host::HostId;
use crate::props::Props;

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Operation assigned during reconciliation and consumed by the commit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Op {
    Add,
    Update,
    Delete,
}

pub struct WorkNode {
    pub(crate) kind: ElementKind,
    pub(crate) props: Props,
    pub(crate) host: Option<HostId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) child: Option<NodeId>,
    pub(crate) sibling: Option<NodeId>,
    pub(crate) alternate: Option<NodeId>,
    pub(crate) op: Option<Op>,
    pub(crate) hooks: Option<HookStore>,
}

impl WorkNode {
    pub(crate) fn new(kind: ElementKind, props: Props) -> Self {
        let hooks = kind.is_component().then(HookStore::default);
        Self {
            kind,
            props,
            host: None,
            parent: None,
            child: None,
            sibling: None,
            alternate: None,
            op: None,
            hooks,
        }
    }

    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn host(&self) -> Option<HostId> {
        self.host
    }

    pub fn op(&self) -> Option<Op> {
        self.op
    }

    pub fn alternate(&self) -> Option<NodeId> {
        self.alternate
    }
}

impl fmt::Debug for WorkNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkNode")
            .field("kind", &self.kind.label())
            .field("host", &self.host)
            .field("op", &self.op)
            .field("alternate", &self.alternate)
            .finish()
    }
}

struct Entry {
    generation: u32,
    node: Option<WorkNode>,
}

#[derive(Default)]
pub struct WorkArena {
    entries: Vec<Entry>,
    free: Vec<u32>,
}

impl WorkArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: WorkNode) -> NodeId {
        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index as usize];
            entry.node = Some(node);
            return NodeId {
                index,
                generation: entry.generation,
            };
        }
        let index = u32::try_from(self.entries.len()).expect("work arena exceeded u32 slots");
        self.entries.push(Entry {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&WorkNode> {
        self.entries
            .get(id.index as usize)
            .filter(|entry| entry.generation == id.generation)
            .and_then(|entry| entry.node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut WorkNode> {
        self.entries
            .get_mut(id.index as usize)
            .filter(|entry| entry.generation == id.generation)
            .and_then(|entry| entry.node.as_mut())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn remove(&mut self, id: NodeId) -> Option<WorkNode> {
        let entry = self.entries.get_mut(id.index as usize)?;
        if entry.generation != id.generation {
            return None;
        }
        let node = entry.node.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(node)
    }

    /// Number of live nodes across all trees.
    pub fn len(&self) -> usize {
        self.entries.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Depth-first successor of `id` within the subtree rooted at `root`:
    /// first child, else the nearest sibling found walking up to `root`.
    pub fn next_in(&self, root: NodeId, id: NodeId) -> Option<NodeId> {
        let node = self.get(id)?;
        if let Some(child) = node.child {
            return Some(child);
        }
        let mut current = id;
        while current != root {
            let node = self.get(current)?;
            if let Some(sibling) = node.sibling {
                return Some(sibling);
            }
            current = node.parent?;
        }
        None
    }

    /// All node ids of the subtree at `root`, in depth-first order.
    pub fn subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = Some(root);
        while let Some(id) = cursor {
            out.push(id);
            cursor = self.next_in(root, id);
        }
        out
    }

    /// Removes every node of the subtree at `root`.
    pub fn free_tree(&mut self, root: NodeId) -> Vec<WorkNode> {
        self.subtree(root)
            .into_iter()
            .filter_map(|id| self.remove(id))
            .collect()
    }

    /// Ids of the children of `id`, in order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.get(id).and_then(|node| node.child);
        while let Some(child) = cursor {
            out.push(child);
            cursor = self.get(child).and_then(|node| node.sibling);
        }
        out
    }
}

#[cfg(test)]
#[path = "tests/work_tests.rs"]
mod tests;
