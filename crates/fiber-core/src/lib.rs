#![doc = r"Core runtime of a fiber-style declarative tree renderer."]

extern crate self as fiber_core;

pub mod collections;
pub mod commit;
pub mod element;
pub mod error;
pub mod hash;
pub mod hooks;
pub mod host;
pub mod memory_host;
pub mod platform;
pub mod props;
mod reconciler;
pub mod root;
pub mod runtime;
pub mod work;

pub use commit::CommitStats;
pub use element::{
    create_element, flatten_children, Child, Component, Element, ElementBuilder, ElementKind,
    IntoChildren,
};
pub use error::{HostError, RenderError};
pub use hooks::{
    is_rendering, use_effect, use_reducer, use_ref, use_state, Deps, Dispatch, EffectCleanup,
    MutableRef, SetState, SetStateAction,
};
pub use host::{diff_props, HostAdapter, HostId, PropDiff};
pub use memory_host::{DispatchOutcome, HostNode, HostNodeKind, MemoryHost, Mutation};
pub use platform::{
    Clock, Deadline, DefaultScheduler, RuntimeScheduler, SchedulerOptions, UnitBudget, Unbounded,
};
pub use props::{Event, EventHandler, PropValue, Props, Scalar};
pub use root::{mount, Root, WorkStatus};
pub use runtime::{Runtime, RuntimeHandle};
pub use work::{NodeId, Op};
