//! Platform abstraction traits for the runtime's cooperative scheduling.
//!
//! The runtime asks a [`Deadline`] whether it should pause between two units
//! of work, and asks a [`RuntimeScheduler`] to be called back later when work
//! is left over. The host drives the runtime by calling
//! [`Root::work_loop`](crate::Root::work_loop) whenever a callback fires.

use std::cell::Cell;
use std::time::Duration;

/// Requests that the host call the work loop again.
///
/// Mirrors an idle-callback registration: the runtime calls
/// [`schedule_frame`](Self::schedule_frame) whenever a render is triggered or
/// a time slice ran out with work left. Implementations must be safe to use
/// from multiple threads even though the runtime itself is single threaded.
pub trait RuntimeScheduler: Send + Sync {
    fn schedule_frame(&self);
}

/// Yield point consulted between two units of work, never during one.
pub trait Deadline {
    fn should_yield(&self) -> bool;
}

/// Provides timing information for time-sliced deadlines.
pub trait Clock: Send + Sync {
    type Instant: Copy + Send + Sync;

    fn now(&self) -> Self::Instant;

    fn elapsed(&self, since: Self::Instant) -> Duration;
}

/// Scheduler that ignores frame requests. The owner polls the root instead.
#[derive(Debug, Default)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn schedule_frame(&self) {}
}

/// Deadline that never asks the loop to yield.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unbounded;

impl Deadline for Unbounded {
    fn should_yield(&self) -> bool {
        false
    }
}

/// Deadline that yields after a fixed number of units of work.
#[derive(Debug)]
pub struct UnitBudget {
    remaining: Cell<usize>,
}

impl UnitBudget {
    pub fn new(units: usize) -> Self {
        Self {
            remaining: Cell::new(units),
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining.get()
    }
}

impl Deadline for UnitBudget {
    fn should_yield(&self) -> bool {
        let left = self.remaining.get().saturating_sub(1);
        self.remaining.set(left);
        left == 0
    }
}

/// Knobs for time-sliced deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// Length of one slice handed to the loop by the host.
    pub slice: Duration,
    /// Yield once less than this much of the slice is left.
    pub yield_threshold: Duration,
    /// Hard cap on units per slice, if any.
    pub max_units_per_slice: Option<usize>,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            slice: Duration::from_millis(16),
            yield_threshold: Duration::from_millis(5),
            max_units_per_slice: None,
        }
    }
}
