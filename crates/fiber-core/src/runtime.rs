use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::element::ElementKind;
use crate::hooks::{HookCursors, HookStore};
use crate::host::HostId;
use crate::platform::{DefaultScheduler, RuntimeScheduler};
use crate::props::Props;
use crate::work::{NodeId, Op, WorkArena, WorkNode};

/// Tag of the synthetic node standing for the render container.
pub(crate) const ROOT_TAG: &str = "#root";

/// Mutable scheduler and tree state of one runtime instance.
#[derive(Default)]
pub(crate) struct WorkState {
    pub(crate) arena: WorkArena,
    /// Root of the last committed tree.
    pub(crate) current_root: Option<NodeId>,
    /// Root of the tree being built, if a cycle is in flight.
    pub(crate) wip_root: Option<NodeId>,
    /// Next node the loop will process.
    pub(crate) next_unit: Option<NodeId>,
    /// Nodes of the committed tree scheduled for removal.
    pub(crate) deletions: Vec<NodeId>,
    /// In-flight trees overwritten by a newer update, freed on the next loop entry.
    pub(crate) abandoned: Vec<NodeId>,
    pub(crate) container: Option<HostId>,
    pub(crate) root_props: Props,
}

impl WorkState {
    /// Starts a fresh in-progress tree grafted onto the last committed root.
    ///
    /// A tree that is still being built is abandoned rather than cancelled.
    pub(crate) fn begin_cycle(&mut self) -> bool {
        let Some(container) = self.container else {
            return false;
        };
        self.discard_wip();
        let mut root = WorkNode::new(ElementKind::from(ROOT_TAG), self.root_props.clone());
        root.host = Some(container);
        root.alternate = self.current_root;
        root.op = self.current_root.map(|_| Op::Update);
        let root = self.arena.insert(root);
        self.wip_root = Some(root);
        self.next_unit = Some(root);
        true
    }

    /// Drops the in-progress tree, if any, and untags its queued deletions.
    /// Its nodes are released on the next loop entry.
    pub(crate) fn discard_wip(&mut self) {
        if let Some(previous) = self.wip_root.take() {
            log::debug!("abandoning in-flight tree {previous:?}");
            self.abandoned.push(previous);
        }
        self.next_unit = None;
        for id in self.deletions.drain(..) {
            if let Some(node) = self.arena.get_mut(id) {
                node.op = None;
            }
        }
    }

    pub(crate) fn has_pending_work(&self) -> bool {
        self.wip_root.is_some() || !self.abandoned.is_empty()
    }

    /// Hook slots of `node`'s alternate, plus `node`'s current cursors.
    pub(crate) fn alternate_hooks(&self, node: NodeId) -> Option<(&HookStore, HookCursors)> {
        let current = self.arena.get(node)?;
        let cursors = current.hooks.as_ref()?.cursors;
        let alternate = self.arena.get(current.alternate?)?;
        Some((alternate.hooks.as_ref()?, cursors))
    }

    pub(crate) fn hooks_mut(&mut self, node: NodeId) -> &mut HookStore {
        self.arena
            .get_mut(node)
            .and_then(|node| node.hooks.as_mut())
            .expect("hook called on a node that is not a rendering component")
    }
}

pub(crate) struct RuntimeInner {
    scheduler: Arc<dyn RuntimeScheduler>,
    pub(crate) state: RefCell<WorkState>,
    frames_requested: Cell<u64>,
}

impl RuntimeInner {
    fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            scheduler,
            state: RefCell::new(WorkState::default()),
            frames_requested: Cell::new(0),
        }
    }

    pub(crate) fn schedule(&self) {
        self.frames_requested.set(self.frames_requested.get() + 1);
        self.scheduler.schedule_frame();
    }

    fn schedule_update(&self) {
        let started = self.state.borrow_mut().begin_cycle();
        if started {
            self.schedule();
        } else {
            log::debug!("update requested before the root was rendered; ignored");
        }
    }
}

/// Owns the tree state of one mounted root.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(&self.inner))
    }

    pub(crate) fn inner(&self) -> &RuntimeInner {
        &self.inner
    }

    /// Whether a tree is being built or abandoned trees await release.
    pub fn has_pending_work(&self) -> bool {
        self.inner.state.borrow().has_pending_work()
    }

    /// Number of frame requests made to the scheduler so far.
    pub fn frames_requested(&self) -> u64 {
        self.inner.frames_requested.get()
    }

    /// Live work nodes across the committed and in-progress trees.
    pub fn live_nodes(&self) -> usize {
        self.inner.state.borrow().arena.len()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(Arc::new(DefaultScheduler))
    }
}

/// Non-owning handle captured by hooks and state setters.
#[derive(Clone)]
pub struct RuntimeHandle(pub(crate) Weak<RuntimeInner>);

impl RuntimeHandle {
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut WorkState) -> R) -> Option<R> {
        let inner = self.0.upgrade()?;
        let mut state = inner.state.borrow_mut();
        Some(f(&mut state))
    }

    /// Starts a new render cycle from the last committed tree.
    pub fn schedule_update(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.schedule_update();
        }
    }
}
