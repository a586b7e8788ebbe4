//! # Nebula Flow Propagator
//!
//! Routes an event from a source node along a workflow's outgoing
//! connections to target nodes, with filters, per-edge transforms, and
//! cycle-safe traversal.

pub mod error;
pub mod propagator;

pub use error::PropagatorError;
pub use propagator::{EventPropagator, FilterFn, PropagateOptions, TransformFn};
