//! Call-order addressed hook slots for component nodes.
//!
//! Each component work node owns three slot vectors (state, effect, ref)
//! that are filled in call order while its render function runs. The slot
//! at index `k` is paired with the slot at index `k` of the node's
//! `alternate`, so a component must call its hooks unconditionally and in
//! the same order on every render. A reordered call sequence is not
//! detected; a slot whose stored type no longer matches is re-initialised.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::hash::Hash;
use std::rc::{Rc, Weak};

use crate::hash::hash_one;
use crate::runtime::RuntimeHandle;
use crate::work::NodeId;

thread_local! {
    static ACTIVE_RENDERS: RefCell<Vec<RenderFrame>> = RefCell::new(Vec::new());
}

#[derive(Clone)]
struct RenderFrame {
    runtime: RuntimeHandle,
    node: NodeId,
}

struct FrameGuard;

impl Drop for FrameGuard {
    fn drop(&mut self) {
        ACTIVE_RENDERS.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Runs `render` with hooks bound to `node` of `runtime`.
pub(crate) fn with_render_frame<R>(runtime: &RuntimeHandle, node: NodeId, render: impl FnOnce() -> R) -> R {
    ACTIVE_RENDERS.with(|stack| {
        stack.borrow_mut().push(RenderFrame {
            runtime: runtime.clone(),
            node,
        })
    });
    let _guard = FrameGuard;
    render()
}

fn current_frame() -> RenderFrame {
    ACTIVE_RENDERS
        .with(|stack| stack.borrow().last().cloned())
        .expect("hooks may only be called while a component is rendering")
}

/// Returns whether a component render is active on this thread.
pub fn is_rendering() -> bool {
    ACTIVE_RENDERS.with(|stack| !stack.borrow().is_empty())
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct HookCursors {
    pub(crate) state: usize,
    pub(crate) effect: usize,
    pub(crate) reference: usize,
}

type Settle = Box<dyn FnOnce()>;

pub(crate) struct StateSlot {
    cell: Rc<dyn Any>,
    settle: Option<Settle>,
}

pub(crate) struct EffectSlot {
    deps: Option<Deps>,
    effect: Option<Box<dyn FnOnce() -> EffectCleanup>>,
    pub(crate) cleanup: Option<EffectCleanup>,
}

#[derive(Default)]
pub(crate) struct HookStore {
    pub(crate) states: Vec<StateSlot>,
    pub(crate) effects: Vec<EffectSlot>,
    pub(crate) refs: Vec<Rc<dyn Any>>,
    pub(crate) cursors: HookCursors,
}

impl HookStore {
    pub(crate) fn reset(&mut self) {
        self.states.clear();
        self.effects.clear();
        self.refs.clear();
        self.cursors = HookCursors::default();
    }

    /// Takes the commit-time state settlement callbacks of this render.
    pub(crate) fn take_settlements(&mut self) -> Vec<Settle> {
        self.states
            .iter_mut()
            .filter_map(|slot| slot.settle.take())
            .collect()
    }

    /// Takes every stored effect cleanup, used when the node unmounts.
    pub(crate) fn take_cleanups(&mut self) -> Vec<EffectCleanup> {
        self.effects
            .iter_mut()
            .filter_map(|slot| slot.cleanup.take())
            .collect()
    }
}

/// Either a replacement value or a function of the previous value.
pub enum SetStateAction<T> {
    Replace(T),
    Update(Rc<dyn Fn(&T) -> T>),
}

impl<T: Clone> SetStateAction<T> {
    fn apply(&self, previous: T) -> T {
        match self {
            SetStateAction::Replace(value) => value.clone(),
            SetStateAction::Update(update) => update(&previous),
        }
    }
}

/// Persistent cell behind one `use_state` call site.
///
/// `base` is the value as of the last commit. Actions queued since then are
/// folded over it on every render without being consumed, so a render that
/// gets abandoned loses nothing. The commit drops exactly the actions its
/// render folded.
struct StateCell<T> {
    base: T,
    queue: Vec<SetStateAction<T>>,
}

impl<T: Clone> StateCell<T> {
    fn resolve(&self) -> T {
        self.queue
            .iter()
            .fold(self.base.clone(), |value, action| action.apply(value))
    }
}

/// Update function returned by [`use_state`].
pub struct SetState<T> {
    cell: Weak<RefCell<StateCell<T>>>,
    runtime: RuntimeHandle,
}

impl<T> Clone for SetState<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Weak::clone(&self.cell),
            runtime: self.runtime.clone(),
        }
    }
}

impl<T: 'static> SetState<T> {
    pub fn dispatch(&self, action: SetStateAction<T>) {
        let Some(cell) = self.cell.upgrade() else {
            log::warn!("state update on an unmounted component ignored");
            return;
        };
        cell.borrow_mut().queue.push(action);
        self.runtime.schedule_update();
    }

    pub fn set(&self, value: T) {
        self.dispatch(SetStateAction::Replace(value));
    }

    pub fn update(&self, update: impl Fn(&T) -> T + 'static) {
        self.dispatch(SetStateAction::Update(Rc::new(update)));
    }

    /// Returns whether the component owning this state is still mounted.
    pub fn is_live(&self) -> bool {
        self.cell.strong_count() > 0
    }
}

impl<T> fmt::Debug for SetState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetState")
            .field("live", &(self.cell.strong_count() > 0))
            .finish()
    }
}

/// Declares a piece of component state.
///
/// `initial` is used on the first render only. The returned value reflects
/// every update queued before this render started.
pub fn use_state<T: Clone + 'static>(initial: T) -> (T, SetState<T>) {
    let frame = current_frame();
    let runtime = frame.runtime.clone();
    frame
        .runtime
        .with_state(|state| {
            let previous = state
                .alternate_hooks(frame.node)
                .and_then(|(hooks, index)| hooks.states.get(index.state).map(|slot| Rc::clone(&slot.cell)))
                .and_then(|cell| cell.downcast::<RefCell<StateCell<T>>>().ok());
            let cell = match previous {
                Some(cell) => cell,
                None => Rc::new(RefCell::new(StateCell {
                    base: initial,
                    queue: Vec::new(),
                })),
            };
            let (value, folded) = {
                let current = cell.borrow();
                (current.resolve(), current.queue.len())
            };
            let settle: Settle = {
                let cell = Rc::clone(&cell);
                let value = value.clone();
                Box::new(move || {
                    let mut current = cell.borrow_mut();
                    current.base = value;
                    let folded = folded.min(current.queue.len());
                    current.queue.drain(..folded);
                })
            };
            let hooks = state.hooks_mut(frame.node);
            hooks.states.push(StateSlot {
                cell: Rc::clone(&cell) as Rc<dyn Any>,
                settle: Some(settle),
            });
            hooks.cursors.state += 1;
            (
                value,
                SetState {
                    cell: Rc::downgrade(&cell),
                    runtime,
                },
            )
        })
        .expect("runtime dropped while rendering")
}

/// Dispatch function returned by [`use_reducer`].
pub struct Dispatch<S, A> {
    set_state: SetState<S>,
    reducer: Rc<dyn Fn(&S, A) -> S>,
}

impl<S, A> Clone for Dispatch<S, A> {
    fn clone(&self) -> Self {
        Self {
            set_state: self.set_state.clone(),
            reducer: Rc::clone(&self.reducer),
        }
    }
}

impl<S: 'static, A: Clone + 'static> Dispatch<S, A> {
    pub fn dispatch(&self, action: A) {
        let reducer = Rc::clone(&self.reducer);
        self.set_state
            .update(move |state| reducer(state, action.clone()));
    }
}

/// State driven by a reducer, built on [`use_state`].
pub fn use_reducer<S, A>(reducer: impl Fn(&S, A) -> S + 'static, initial: S) -> (S, Dispatch<S, A>)
where
    S: Clone + 'static,
    A: Clone + 'static,
{
    let (state, set_state) = use_state(initial);
    (
        state,
        Dispatch {
            set_state,
            reducer: Rc::new(reducer),
        },
    )
}

/// Positional dependency list of an effect.
///
/// Each entry is reduced to a 64-bit hash when added; two lists match when
/// they have the same length and equal hashes at every position. A hash
/// collision between an old and a new value would therefore skip the effect.
/// Entries must implement `Hash`, which floats do not: pass `f64::to_bits`
/// to depend on a float.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Deps(Vec<u64>);

impl Deps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Hash + ?Sized>(mut self, value: &T) -> Self {
        self.0.push(hash_one(value));
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Builds `Some(Deps)` from a list of hashable expressions.
///
/// `deps![]` runs an effect once after mount; passing `None` instead runs it
/// after every commit.
#[macro_export]
macro_rules! deps {
    () => {
        ::std::option::Option::Some($crate::Deps::new())
    };
    ($($dep:expr),+ $(,)?) => {
        ::std::option::Option::Some($crate::Deps::new()$(.with(&$dep))+)
    };
}

/// Whether an effect recorded with `next` must run given the prior slot.
pub(crate) fn deps_changed(previous: Option<&Option<Deps>>, next: &Option<Deps>) -> bool {
    match (previous, next) {
        (Some(Some(previous)), Some(next)) => previous != next,
        _ => true,
    }
}

/// Cleanup returned from an effect, run before the effect re-runs and when
/// its component unmounts.
#[derive(Default)]
pub struct EffectCleanup {
    callback: Option<Box<dyn FnOnce()>>,
}

impl EffectCleanup {
    pub fn new(cleanup: impl FnOnce() + 'static) -> Self {
        Self {
            callback: Some(Box::new(cleanup)),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_some(&self) -> bool {
        self.callback.is_some()
    }

    pub(crate) fn run(self) {
        if let Some(callback) = self.callback {
            callback();
        }
    }
}

impl From<()> for EffectCleanup {
    fn from(_: ()) -> Self {
        Self::none()
    }
}

impl fmt::Debug for EffectCleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectCleanup")
            .field("present", &self.callback.is_some())
            .finish()
    }
}

/// Registers a side effect to run after the commit that follows this render.
pub fn use_effect<F, C>(effect: F, deps: Option<Deps>)
where
    F: FnOnce() -> C + 'static,
    C: Into<EffectCleanup>,
{
    let frame = current_frame();
    frame
        .runtime
        .with_state(|state| {
            let hooks = state.hooks_mut(frame.node);
            hooks.effects.push(EffectSlot {
                deps,
                effect: Some(Box::new(move || effect().into())),
                cleanup: None,
            });
            hooks.cursors.effect += 1;
        })
        .expect("runtime dropped while rendering");
}

/// Mutable cell whose identity survives re-renders.
pub struct MutableRef<T> {
    inner: Rc<RefCell<T>>,
}

impl<T> Clone for MutableRef<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> MutableRef<T> {
    fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(value)),
        }
    }

    /// Run `f` with an immutable reference to the current value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow())
    }

    /// Run `f` with a mutable reference to the current value.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.inner.borrow_mut())
    }

    pub fn set(&self, value: T) {
        *self.inner.borrow_mut() = value;
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone> MutableRef<T> {
    pub fn current(&self) -> T {
        self.inner.borrow().clone()
    }
}

impl<T: fmt::Debug> fmt::Debug for MutableRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutableRef")
            .field("current", &*self.inner.borrow())
            .finish()
    }
}

/// Returns the mutable cell for this call site, reusing the previous
/// render's cell when one exists.
pub fn use_ref<T: 'static>(initial: T) -> MutableRef<T> {
    let frame = current_frame();
    frame
        .runtime
        .with_state(|state| {
            let previous = state
                .alternate_hooks(frame.node)
                .and_then(|(hooks, index)| hooks.refs.get(index.reference).cloned())
                .and_then(|cell| cell.downcast::<RefCell<T>>().ok());
            let cell = match previous {
                Some(inner) => MutableRef { inner },
                None => MutableRef::new(initial),
            };
            let hooks = state.hooks_mut(frame.node);
            hooks.refs.push(Rc::clone(&cell.inner) as Rc<dyn Any>);
            hooks.cursors.reference += 1;
            cell
        })
        .expect("runtime dropped while rendering")
}

/// One effect selected to run during the effect pass.
pub(crate) struct EffectJob {
    pub(crate) node: NodeId,
    pub(crate) index: usize,
    pub(crate) cleanup: Option<EffectCleanup>,
    pub(crate) effect: Box<dyn FnOnce() -> EffectCleanup>,
}

/// Decides which effects of `hooks` run, given the prior render's slots.
///
/// Prior cleanups of skipped effects move into the new slots; prior cleanups
/// of effects that run are handed to the job so they run first.
pub(crate) fn plan_effects(
    node: NodeId,
    hooks: &mut HookStore,
    mut previous: Option<&mut HookStore>,
) -> Vec<EffectJob> {
    let mut jobs = Vec::new();
    for (index, slot) in hooks.effects.iter_mut().enumerate() {
        let prior = previous
            .as_deref_mut()
            .and_then(|previous| previous.effects.get_mut(index));
        let prior_deps = prior.as_ref().map(|prior| &prior.deps);
        let run = deps_changed(prior_deps, &slot.deps);
        let prior_cleanup = prior.and_then(|prior| prior.cleanup.take());
        let effect = slot.effect.take();
        match (run, effect) {
            (true, Some(effect)) => jobs.push(EffectJob {
                node,
                index,
                cleanup: prior_cleanup,
                effect,
            }),
            _ => slot.cleanup = prior_cleanup,
        }
    }
    jobs
}

#[cfg(test)]
#[path = "tests/hooks_tests.rs"]
mod tests;
