//! Testing utilities and harness for the fiber renderer.
//!
//! [`TestRoot`] binds an element to a [`MemoryHost`] container and exposes
//! the operations scenario tests need: step the loop a few units at a time,
//! flush, dispatch events by attribute lookup, and inspect the host tree.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fiber_core::{
    CommitStats, DispatchOutcome, Element, Event, HostId, MemoryHost, Mutation, RenderError, Root,
    Runtime, RuntimeScheduler, UnitBudget, WorkStatus,
};

/// Scheduler that counts frame requests.
#[derive(Debug, Default)]
pub struct CountingScheduler {
    frames: AtomicUsize,
}

impl CountingScheduler {
    pub fn frames(&self) -> usize {
        self.frames.load(Ordering::SeqCst)
    }
}

impl RuntimeScheduler for CountingScheduler {
    fn schedule_frame(&self) {
        self.frames.fetch_add(1, Ordering::SeqCst);
    }
}

/// Shared ordered log for recording callbacks from components and effects.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    entries: Rc<RefCell<Vec<String>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.borrow_mut().push(entry.into());
    }

    /// Drains and returns everything recorded so far.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.entries.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

/// A root rendering into a fresh `<root>` container of an in-memory host.
pub struct TestRoot {
    root: Root<MemoryHost>,
    container: HostId,
    scheduler: Arc<CountingScheduler>,
}

impl TestRoot {
    /// Binds `element` without rendering it.
    pub fn new(element: Element) -> Self {
        let scheduler = Arc::new(CountingScheduler::default());
        let mut host = MemoryHost::new();
        let container = host.create_container("root");
        host.take_mutations();
        let runtime = Runtime::new(scheduler.clone());
        Self {
            root: Root::with_runtime(element, host, runtime),
            container,
            scheduler,
        }
    }

    /// Binds, renders and flushes `element`.
    pub fn mount(element: Element) -> Self {
        let mut test_root = Self::new(element);
        test_root.render().expect("initial render");
        test_root.flush();
        test_root
    }

    pub fn render(&mut self) -> Result<(), RenderError> {
        self.root.render(self.container)
    }

    /// Runs all pending work and returns the last commit's stats.
    pub fn flush(&mut self) -> Option<CommitStats> {
        self.root.flush().expect("flush")
    }

    /// Runs one slice of at most `units` units of work.
    pub fn step(&mut self, units: usize) -> WorkStatus {
        self.root.work_loop(&UnitBudget::new(units)).expect("work loop")
    }

    pub fn update(&mut self, element: Element) {
        self.root.update(element);
    }

    /// Markup of the container's children.
    pub fn dump(&self) -> String {
        self.host()
            .children(self.container)
            .iter()
            .map(|child| self.host().dump_tree(*child))
            .collect()
    }

    pub fn text(&self) -> String {
        self.host().text_content(self.container)
    }

    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        self.root.host_mut().take_mutations()
    }

    /// Finds the element whose attribute `name` equals `value`.
    pub fn find(&self, name: &str, value: &str) -> HostId {
        self.host()
            .find_by_attr(self.container, name, value)
            .unwrap_or_else(|| panic!("no element with {name}={value:?} in {}", self.dump()))
    }

    /// Dispatches `event` to the element whose attribute `name` equals `value`.
    pub fn dispatch(&mut self, name: &str, value: &str, event: &str) -> DispatchOutcome {
        let target = self.find(name, value);
        self.host().dispatch(target, &Event::new(event, target))
    }

    pub fn click(&mut self, name: &str, value: &str) -> DispatchOutcome {
        self.dispatch(name, value, "click")
    }

    /// Dispatches an `input` event carrying `text`.
    pub fn input(&mut self, name: &str, value: &str, text: &str) -> DispatchOutcome {
        let target = self.find(name, value);
        self.host()
            .dispatch(target, &Event::new("input", target).with_value(text))
    }

    pub fn host(&self) -> &MemoryHost {
        self.root.host()
    }

    pub fn container(&self) -> HostId {
        self.container
    }

    pub fn root(&self) -> &Root<MemoryHost> {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Root<MemoryHost> {
        &mut self.root
    }

    pub fn frames_requested(&self) -> usize {
        self.scheduler.frames()
    }

    pub fn has_pending_work(&self) -> bool {
        self.root.has_pending_work()
    }
}
