//! Standard runtime services backed by Rust's `std` library.
//!
//! This crate provides concrete implementations of the platform traits
//! defined in `fiber-core`: a scheduler that records frame requests, a
//! wall-clock deadline, and a [`StdRuntime`] bundle that drives a
//! [`fiber_core::Root`] until it is idle.

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use fiber_core::{
    Clock, Deadline, HostAdapter, RenderError, Root, Runtime, RuntimeScheduler,
    SchedulerOptions, WorkStatus,
};

/// Environment variable overriding [`SchedulerOptions::yield_threshold`], in milliseconds.
pub const YIELD_THRESHOLD_ENV: &str = "FIBER_YIELD_THRESHOLD_MS";

type Waker = Arc<dyn Fn() + Send + Sync + 'static>;

/// Scheduler that records frame requests and optionally wakes an event loop.
pub struct StdScheduler {
    frame_requested: AtomicBool,
    frame_waker: RwLock<Option<Waker>>,
}

impl StdScheduler {
    pub fn new() -> Self {
        Self {
            frame_requested: AtomicBool::new(false),
            frame_waker: RwLock::new(None),
        }
    }

    /// Returns whether a frame has been requested since the last call.
    pub fn take_frame_request(&self) -> bool {
        self.frame_requested.swap(false, Ordering::SeqCst)
    }

    /// Registers a waker that will be invoked whenever a new frame is scheduled.
    pub fn set_frame_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self
            .frame_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(waker));
    }

    /// Clears any registered frame waker.
    pub fn clear_frame_waker(&self) {
        *self
            .frame_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn wake(&self) {
        let waker = self
            .frame_waker
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdScheduler")
            .field(
                "frame_requested",
                &self.frame_requested.load(Ordering::SeqCst),
            )
            .finish()
    }
}

impl RuntimeScheduler for StdScheduler {
    fn schedule_frame(&self) {
        self.frame_requested.store(true, Ordering::SeqCst);
        self.wake();
    }
}

/// Clock implementation backed by [`std::time`].
#[derive(Debug, Default, Clone)]
pub struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Self::Instant {
        Instant::now()
    }

    fn elapsed(&self, since: Self::Instant) -> Duration {
        since.elapsed()
    }
}

/// Deadline for one time slice, in the manner of an idle callback: the loop
/// yields once less than the yield threshold of the slice is left.
pub struct IdleDeadline<C: Clock> {
    clock: C,
    started: C::Instant,
    options: SchedulerOptions,
    units: Cell<usize>,
}

impl<C: Clock> IdleDeadline<C> {
    pub fn start(clock: C, options: SchedulerOptions) -> Self {
        let started = clock.now();
        Self {
            clock,
            started,
            options,
            units: Cell::new(0),
        }
    }

    /// Time left in the slice.
    pub fn time_remaining(&self) -> Duration {
        self.options
            .slice
            .saturating_sub(self.clock.elapsed(self.started))
    }

    /// Units of work observed by this deadline so far.
    pub fn units(&self) -> usize {
        self.units.get()
    }
}

impl<C: Clock> Deadline for IdleDeadline<C> {
    fn should_yield(&self) -> bool {
        let units = self.units.get() + 1;
        self.units.set(units);
        if self
            .options
            .max_units_per_slice
            .is_some_and(|max| units >= max)
        {
            return true;
        }
        self.time_remaining() < self.options.yield_threshold
    }
}

/// Convenience container bundling the standard scheduler, clock and options.
#[derive(Clone)]
pub struct StdRuntime {
    scheduler: Arc<StdScheduler>,
    clock: StdClock,
    options: SchedulerOptions,
    runtime: Runtime,
}

impl StdRuntime {
    /// Creates a new standard runtime instance.
    pub fn new() -> Self {
        Self::with_options(SchedulerOptions::default())
    }

    pub fn with_options(options: SchedulerOptions) -> Self {
        let scheduler = Arc::new(StdScheduler::default());
        let runtime = Runtime::new(scheduler.clone());
        Self {
            scheduler,
            clock: StdClock,
            options,
            runtime,
        }
    }

    /// Default options, with the yield threshold taken from
    /// [`YIELD_THRESHOLD_ENV`] when it holds a whole number of milliseconds.
    pub fn from_env() -> Self {
        Self::with_options(options_from(std::env::var(YIELD_THRESHOLD_ENV).ok().as_deref()))
    }

    /// Returns a [`fiber_core::Runtime`] configured with the standard scheduler.
    pub fn runtime(&self) -> Runtime {
        self.runtime.clone()
    }

    /// Returns the scheduler implementation.
    pub fn scheduler(&self) -> Arc<StdScheduler> {
        Arc::clone(&self.scheduler)
    }

    pub fn options(&self) -> SchedulerOptions {
        self.options
    }

    /// Returns whether a frame was requested since the last poll.
    pub fn take_frame_request(&self) -> bool {
        self.scheduler.take_frame_request()
    }

    /// Registers a waker to be called when the runtime schedules a new frame.
    pub fn set_frame_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        self.scheduler.set_frame_waker(waker);
    }

    /// Clears any previously registered frame waker.
    pub fn clear_frame_waker(&self) {
        self.scheduler.clear_frame_waker();
    }

    /// Starts a deadline for one time slice.
    pub fn deadline(&self) -> IdleDeadline<StdClock> {
        IdleDeadline::start(self.clock.clone(), self.options)
    }

    /// Binds `root` to this runtime's scheduler.
    pub fn mount<H: HostAdapter>(&self, element: fiber_core::Element, host: H) -> Root<H> {
        Root::with_runtime(element, host, self.runtime())
    }

    /// Runs one slice per requested frame until the root stops asking.
    /// Returns the number of slices run.
    pub fn run_until_idle<H: HostAdapter>(&self, root: &mut Root<H>) -> Result<usize, RenderError> {
        let mut slices = 0;
        while self.take_frame_request() || root.has_pending_work() {
            let status = root.work_loop(&self.deadline())?;
            slices += 1;
            if let WorkStatus::Committed(stats) = status {
                log::debug!("slice {slices} committed {stats:?}");
            }
        }
        Ok(slices)
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .field("options", &self.options)
            .finish()
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}

fn options_from(threshold_ms: Option<&str>) -> SchedulerOptions {
    let mut options = SchedulerOptions::default();
    if let Some(raw) = threshold_ms {
        match raw.trim().parse::<u64>() {
            Ok(ms) => options.yield_threshold = Duration::from_millis(ms),
            Err(err) => log::warn!("ignoring {YIELD_THRESHOLD_ENV}={raw:?}: {err}"),
        }
    }
    options
}
