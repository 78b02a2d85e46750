//! Applies a finished in-progress tree to the host, then runs effects.
//!
//! Host mutations happen with the work state borrowed. Every user callback
//! (state settlement, effect cleanups, effects) runs after the borrow is
//! released so it may schedule further updates.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::RenderError;
use crate::hooks::{plan_effects, EffectCleanup, EffectJob};
use crate::host::{HostAdapter, HostId};
use crate::runtime::{RuntimeInner, WorkState};
use crate::work::{NodeId, Op, WorkArena, WorkNode};

/// Counters describing one commit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CommitStats {
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
    pub effects_run: usize,
    pub effect_failures: usize,
}

/// Callbacks gathered while the state was borrowed.
#[derive(Default)]
struct Deferred {
    settlements: Vec<Box<dyn FnOnce()>>,
    unmounts: Vec<EffectCleanup>,
    jobs: Vec<EffectJob>,
    freed: Vec<WorkNode>,
}

/// Commits the in-progress tree of `inner` to `host`.
///
/// On error the in-progress tree is left in place for the caller to discard.
pub(crate) fn commit_root<H: HostAdapter + ?Sized>(
    inner: &RuntimeInner,
    host: &mut H,
) -> Result<CommitStats, RenderError> {
    let mut stats = CommitStats::default();
    let deferred = {
        let mut state = inner.state.borrow_mut();
        match state.wip_root {
            Some(root) => apply(&mut state, host, root, &mut stats)?,
            None => return Ok(stats),
        }
    };

    let Deferred {
        settlements,
        unmounts,
        jobs,
        freed,
    } = deferred;
    drop(freed);
    for settle in settlements {
        settle();
    }
    for cleanup in unmounts {
        if isolate("unmount cleanup", || cleanup.run()).is_none() {
            stats.effect_failures += 1;
        }
    }
    for job in jobs {
        run_job(inner, job, &mut stats);
    }
    log::debug!("commit finished: {stats:?}");
    Ok(stats)
}

fn apply<H: HostAdapter + ?Sized>(
    state: &mut WorkState,
    host: &mut H,
    root: NodeId,
    stats: &mut CommitStats,
) -> Result<Deferred, RenderError> {
    let mut deferred = Deferred::default();

    let deletions = std::mem::take(&mut state.deletions);
    for &id in &deletions {
        commit_deletion(&mut state.arena, host, id, &mut deferred.unmounts)?;
        stats.deleted += 1;
    }

    let nodes = state.arena.subtree(root);
    for &id in nodes.iter().skip(1) {
        commit_work(&state.arena, host, id, stats)?;
    }

    for &id in &nodes {
        let arena = &mut state.arena;
        let Some(mut hooks) = arena.get_mut(id).and_then(|node| node.hooks.take()) else {
            continue;
        };
        deferred.settlements.extend(hooks.take_settlements());
        let previous = arena
            .get(id)
            .and_then(|node| node.alternate)
            .and_then(|alternate| arena.get_mut(alternate))
            .and_then(|alternate| alternate.hooks.as_mut());
        deferred.jobs.extend(plan_effects(id, &mut hooks, previous));
        if let Some(node) = arena.get_mut(id) {
            node.hooks = Some(hooks);
        }
    }

    for &id in &nodes {
        if let Some(node) = state.arena.get_mut(id) {
            node.op = None;
            node.alternate = None;
        }
    }
    state.wip_root = None;
    state.next_unit = None;
    if let Some(previous) = state.current_root.replace(root) {
        deferred.freed = state.arena.free_tree(previous);
    }
    Ok(deferred)
}

fn commit_work<H: HostAdapter + ?Sized>(
    arena: &WorkArena,
    host: &mut H,
    id: NodeId,
    stats: &mut CommitStats,
) -> Result<(), RenderError> {
    let node = arena.get(id).ok_or(RenderError::StaleNode { node: id })?;
    match node.op {
        Some(Op::Add) => {
            stats.added += 1;
            let Some(child) = node.host else {
                return Ok(());
            };
            let parent = host_parent(arena, id)?;
            let before = next_attached_host(arena, id);
            host.insert_child(parent, child, before)?;
        }
        Some(Op::Update) => {
            stats.updated += 1;
            let Some(target) = node.host else {
                return Ok(());
            };
            let alternate = node
                .alternate
                .and_then(|alternate| arena.get(alternate))
                .ok_or(RenderError::StaleNode { node: id })?;
            host.apply_property_diff(target, &alternate.props, &node.props)?;
        }
        Some(Op::Delete) | None => {}
    }
    Ok(())
}

/// Removes the host nodes of the deleted subtree at `id` and collects the
/// effect cleanups of its components.
fn commit_deletion<H: HostAdapter + ?Sized>(
    arena: &mut WorkArena,
    host: &mut H,
    id: NodeId,
    unmounts: &mut Vec<EffectCleanup>,
) -> Result<(), RenderError> {
    for node in arena.subtree(id) {
        if let Some(hooks) = arena.get_mut(node).and_then(|node| node.hooks.as_mut()) {
            unmounts.extend(hooks.take_cleanups());
        }
    }
    let parent = host_parent(arena, id)?;
    let mut removed = Vec::new();
    top_hosts(arena, id, &mut removed);
    for child in removed {
        host.remove(parent, child)?;
    }
    Ok(())
}

/// Host node of the nearest ancestor that has one.
fn host_parent(arena: &WorkArena, id: NodeId) -> Result<HostId, RenderError> {
    let mut cursor = arena.get(id).and_then(|node| node.parent);
    while let Some(parent) = cursor {
        let node = arena.get(parent).ok_or(RenderError::StaleNode { node: parent })?;
        if let Some(host) = node.host {
            return Ok(host);
        }
        cursor = node.parent;
    }
    Err(RenderError::Detached { node: id })
}

/// Outermost host nodes within the subtree at `id`.
fn top_hosts(arena: &WorkArena, id: NodeId, out: &mut Vec<HostId>) {
    let Some(node) = arena.get(id) else {
        return;
    };
    match node.host {
        Some(host) => out.push(host),
        None => {
            for child in arena.children(id) {
                top_hosts(arena, child, out);
            }
        }
    }
}

/// First host node after `id`, among its host siblings, that is already
/// attached. Component parents are transparent.
fn next_attached_host(arena: &WorkArena, id: NodeId) -> Option<HostId> {
    let mut current = id;
    loop {
        let node = arena.get(current)?;
        let mut sibling = node.sibling;
        while let Some(candidate) = sibling {
            if let Some(found) = first_attached_host(arena, candidate) {
                return Some(found);
            }
            sibling = arena.get(candidate).and_then(|node| node.sibling);
        }
        let parent = arena.get(node.parent?)?;
        if parent.host.is_some() {
            return None;
        }
        current = node.parent?;
    }
}

fn first_attached_host(arena: &WorkArena, id: NodeId) -> Option<HostId> {
    let node = arena.get(id)?;
    match node.host {
        Some(host) => (node.op == Some(Op::Update)).then_some(host),
        None => arena
            .children(id)
            .into_iter()
            .find_map(|child| first_attached_host(arena, child)),
    }
}

fn run_job(inner: &RuntimeInner, job: EffectJob, stats: &mut CommitStats) {
    let EffectJob {
        node,
        index,
        cleanup,
        effect,
    } = job;
    if let Some(cleanup) = cleanup {
        if isolate("effect cleanup", || cleanup.run()).is_none() {
            stats.effect_failures += 1;
        }
    }
    stats.effects_run += 1;
    let Some(next) = isolate("effect", effect) else {
        stats.effect_failures += 1;
        return;
    };
    if !next.is_some() {
        return;
    }
    let orphaned = {
        let mut state = inner.state.borrow_mut();
        let slot = state
            .arena
            .get_mut(node)
            .and_then(|node| node.hooks.as_mut())
            .and_then(|hooks| hooks.effects.get_mut(index));
        match slot {
            Some(slot) => {
                slot.cleanup = Some(next);
                None
            }
            None => Some(next),
        }
    };
    if let Some(cleanup) = orphaned {
        log::debug!("node {node:?} gone before its effect finished; running cleanup now");
        if isolate("effect cleanup", || cleanup.run()).is_none() {
            stats.effect_failures += 1;
        }
    }
}

fn isolate<R>(what: &str, callback: impl FnOnce() -> R) -> Option<R> {
    match catch_unwind(AssertUnwindSafe(callback)) {
        Ok(value) => Some(value),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|message| message.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_owned());
            log::error!("{what} panicked: {message}");
            None
        }
    }
}

#[cfg(test)]
#[path = "tests/commit_tests.rs"]
mod tests;
