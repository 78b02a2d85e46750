use thiserror::Error;

use crate::host::HostId;
use crate::work::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("host node {id} missing")]
    Missing { id: HostId },
    #[error("host node {id} is a text node and cannot {operation}")]
    NotAnElement { id: HostId, operation: &'static str },
    #[error("host node {child} is not a child of {parent}")]
    NotAChild { parent: HostId, child: HostId },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("render target {container} does not exist in the host tree")]
    MissingContainer { container: HostId },
    #[error("work node {node:?} has no host ancestor; host and work trees diverged")]
    Detached { node: NodeId },
    #[error("work node {node:?} vanished from the arena mid-cycle")]
    StaleNode { node: NodeId },
    #[error(transparent)]
    Host(#[from] HostError),
}
