//! One unit of work: expand a node and reconcile its children against the
//! previous render by position.

use crate::element::{Child, ElementKind};
use crate::error::RenderError;
use crate::hooks::with_render_frame;
use crate::host::HostAdapter;
use crate::props::Props;
use crate::runtime::{RuntimeHandle, RuntimeInner};
use crate::work::{NodeId, Op, WorkNode};

/// Processes `id` and returns the next node in depth-first order, or `None`
/// once the in-progress tree is exhausted.
pub(crate) fn process_node<H: HostAdapter + ?Sized>(
    inner: &RuntimeInner,
    handle: &RuntimeHandle,
    host: &mut H,
    id: NodeId,
) -> Result<Option<NodeId>, RenderError> {
    let (kind, props, existing_host) = {
        let mut state = inner.state.borrow_mut();
        let node = state
            .arena
            .get_mut(id)
            .ok_or(RenderError::StaleNode { node: id })?;
        if let Some(hooks) = node.hooks.as_mut() {
            hooks.reset();
        }
        (node.kind.clone(), node.props.clone(), node.host)
    };

    let children = match &kind {
        ElementKind::Component(component) => {
            log::trace!("render {} at {id:?}", component.name());
            let element = with_render_frame(handle, id, || component.render(&props));
            vec![Child::Element(element)]
        }
        ElementKind::Host(_) | ElementKind::Text => {
            if existing_host.is_none() {
                let created = host.instantiate(&kind, &props)?;
                let mut state = inner.state.borrow_mut();
                let node = state
                    .arena
                    .get_mut(id)
                    .ok_or(RenderError::StaleNode { node: id })?;
                node.host = Some(created);
            }
            props.children().to_vec()
        }
    };

    let mut state = inner.state.borrow_mut();
    let root = owning_root(&state.arena, id);
    if state.wip_root != Some(root) {
        // A state update during the render abandoned this tree.
        log::trace!("tree {root:?} abandoned while rendering {id:?}");
        return Ok(None);
    }
    reconcile_children(&mut state, id, &children)?;
    Ok(state.arena.next_in(root, id))
}

fn owning_root(arena: &crate::work::WorkArena, mut id: NodeId) -> NodeId {
    while let Some(parent) = arena.get(id).and_then(|node| node.parent) {
        id = parent;
    }
    id
}

fn classify(child: &Child) -> (ElementKind, Props) {
    match child {
        Child::Element(element) => (element.kind().clone(), element.props().clone()),
        Child::Scalar(scalar) => (ElementKind::Text, Props::text(scalar.clone())),
    }
}

/// Walks `children` and the alternate's child chain in lockstep.
///
/// Same kind at the same position ⇒ `Update` (host node and alternate
/// carried over). Otherwise the new child is an `Add` and the old child, if
/// any, is tagged `Delete` and queued for removal.
pub(crate) fn reconcile_children(
    state: &mut crate::runtime::WorkState,
    parent: NodeId,
    children: &[Child],
) -> Result<(), RenderError> {
    let parent_node = state
        .arena
        .get(parent)
        .ok_or(RenderError::StaleNode { node: parent })?;
    let mut old = parent_node
        .alternate
        .and_then(|alternate| state.arena.get(alternate))
        .and_then(|alternate| alternate.child);

    let mut previous_new: Option<NodeId> = None;
    let mut index = 0;
    while index < children.len() || old.is_some() {
        let next = children.get(index).map(classify);
        let old_node = old.and_then(|id| state.arena.get(id));
        let old_sibling = old_node.and_then(|node| node.sibling);
        let same_kind = match (&next, old_node) {
            (Some((kind, _)), Some(old_node)) => *kind == old_node.kind,
            _ => false,
        };

        let mut created = None;
        if let Some((kind, props)) = next {
            let mut node = WorkNode::new(kind, props);
            node.parent = Some(parent);
            if same_kind {
                let old_id = old.ok_or(RenderError::StaleNode { node: parent })?;
                node.host = old_node.and_then(|old_node| old_node.host);
                node.alternate = Some(old_id);
                node.op = Some(Op::Update);
            } else {
                node.op = Some(Op::Add);
            }
            created = Some(state.arena.insert(node));
        }
        if !same_kind {
            if let Some(old_id) = old {
                if let Some(old_node) = state.arena.get_mut(old_id) {
                    old_node.op = Some(Op::Delete);
                }
                state.deletions.push(old_id);
            }
        }

        if let Some(created) = created {
            match previous_new {
                None => {
                    if let Some(parent_node) = state.arena.get_mut(parent) {
                        parent_node.child = Some(created);
                    }
                }
                Some(previous) => {
                    if let Some(previous_node) = state.arena.get_mut(previous) {
                        previous_node.sibling = Some(created);
                    }
                }
            }
            previous_new = Some(created);
        }

        old = old_sibling;
        index += 1;
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/reconciler_tests.rs"]
mod tests;
