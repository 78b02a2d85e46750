use crate::commit::{commit_root, CommitStats};
use crate::element::{Child, Element};
use crate::error::RenderError;
use crate::host::{HostAdapter, HostId};
use crate::platform::{Deadline, Unbounded};
use crate::props::Props;
use crate::reconciler::process_node;
use crate::runtime::Runtime;
use crate::work::{Op, WorkNode};

/// Outcome of one [`Root::work_loop`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkStatus {
    /// Nothing to do.
    Idle,
    /// The deadline asked to pause; the scheduler was re-armed.
    Yielded,
    /// The in-progress tree was finished and committed.
    Committed(CommitStats),
}

/// A top-level element bound to a host and a runtime.
pub struct Root<H: HostAdapter> {
    runtime: Runtime,
    host: H,
    element: Element,
}

/// Binds `element` to `host` with a default runtime. Nothing is rendered
/// until [`Root::render`] names a container.
pub fn mount<H: HostAdapter>(element: Element, host: H) -> Root<H> {
    Root::with_runtime(element, host, Runtime::default())
}

impl<H: HostAdapter> Root<H> {
    pub fn with_runtime(element: Element, host: H, runtime: Runtime) -> Self {
        Self {
            runtime,
            host,
            element,
        }
    }

    /// Starts rendering the bound element into `container`.
    ///
    /// The first cycle produces the whole host tree; later calls diff against
    /// the last committed tree.
    pub fn render(&mut self, container: HostId) -> Result<(), RenderError> {
        if !self.host.contains(container) {
            return Err(RenderError::MissingContainer { container });
        }
        {
            let mut state = self.runtime.inner().state.borrow_mut();
            state.container = Some(container);
            state.root_props = root_props(&self.element);
        }
        self.runtime.handle().schedule_update();
        Ok(())
    }

    /// Replaces the bound element and schedules a render if a container is set.
    pub fn update(&mut self, element: Element) {
        self.element = element;
        let rendered = {
            let mut state = self.runtime.inner().state.borrow_mut();
            state.root_props = root_props(&self.element);
            state.container.is_some()
        };
        if rendered {
            self.runtime.handle().schedule_update();
        }
    }

    /// Processes units of work until none remain or `deadline` asks to yield,
    /// then commits if the in-progress tree is complete.
    ///
    /// At least one unit is processed per call when work is pending.
    pub fn work_loop(&mut self, deadline: &dyn Deadline) -> Result<WorkStatus, RenderError> {
        self.release_abandoned();
        let handle = self.runtime.handle();
        loop {
            let (unit, root) = {
                let state = self.runtime.inner().state.borrow();
                (state.next_unit, state.wip_root)
            };
            let Some(unit) = unit else {
                break;
            };
            match process_node(self.runtime.inner(), &handle, &mut self.host, unit) {
                Ok(next) => {
                    let mut state = self.runtime.inner().state.borrow_mut();
                    // An update during the render replaced the tree; keep its cursor.
                    if state.wip_root == root {
                        state.next_unit = next;
                    }
                }
                Err(error) => return Err(self.abort(error)),
            }
            if deadline.should_yield() {
                break;
            }
        }

        let (next_unit, wip_root) = {
            let state = self.runtime.inner().state.borrow();
            (state.next_unit, state.wip_root)
        };
        if next_unit.is_some() {
            self.runtime.inner().schedule();
            return Ok(WorkStatus::Yielded);
        }
        if wip_root.is_none() {
            return Ok(WorkStatus::Idle);
        }
        match commit_root(self.runtime.inner(), &mut self.host) {
            Ok(stats) => {
                if self.runtime.has_pending_work() {
                    self.runtime.inner().schedule();
                }
                Ok(WorkStatus::Committed(stats))
            }
            Err(error) => Err(self.abort(error)),
        }
    }

    /// Runs the loop with an unbounded deadline until no work is left,
    /// including cycles scheduled by effects. Returns the last commit's stats.
    pub fn flush(&mut self) -> Result<Option<CommitStats>, RenderError> {
        let mut last = None;
        loop {
            match self.work_loop(&Unbounded)? {
                WorkStatus::Committed(stats) => last = Some(stats),
                WorkStatus::Yielded => {}
                WorkStatus::Idle => {}
            }
            if !self.runtime.has_pending_work() {
                return Ok(last);
            }
        }
    }

    fn abort(&mut self, error: RenderError) -> RenderError {
        log::error!("render cycle aborted: {error}");
        self.runtime.inner().state.borrow_mut().discard_wip();
        self.release_abandoned();
        error
    }

    /// Frees abandoned in-progress trees and releases the host nodes their
    /// `Add` nodes created.
    fn release_abandoned(&mut self) {
        let freed: Vec<WorkNode> = {
            let mut state = self.runtime.inner().state.borrow_mut();
            let roots = std::mem::take(&mut state.abandoned);
            roots
                .into_iter()
                .flat_map(|root| state.arena.free_tree(root))
                .collect()
        };
        for node in &freed {
            let Some(id) = node.host.filter(|_| node.op == Some(Op::Add)) else {
                continue;
            };
            if !self.host.contains(id) {
                continue;
            }
            if let Err(error) = self.host.release(id) {
                log::warn!("failed to release abandoned host node {id}: {error}");
            }
        }
        if !freed.is_empty() {
            log::debug!("released {} nodes of abandoned trees", freed.len());
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn element(&self) -> &Element {
        &self.element
    }

    pub fn container(&self) -> Option<HostId> {
        self.runtime.inner().state.borrow().container
    }

    /// Whether a cycle is in flight or abandoned trees await release.
    pub fn has_pending_work(&self) -> bool {
        self.runtime.has_pending_work()
    }
}

fn root_props(element: &Element) -> Props {
    let mut props = Props::new();
    props.set_children(vec![Child::Element(element.clone())]);
    props
}

#[cfg(test)]
#[path = "tests/root_tests.rs"]
mod tests;
