//! # Nebula Flow Action
//!
//! The node executor: a per-type registry of executor functions and their
//! interceptor chains (input transform, input validate, execute, output
//! validate, output transform). This is the extension seam through which
//! all node behavior is installed — node *types* are string keys into this
//! registry rather than a class hierarchy.

pub mod error;
pub mod registry;
pub mod snapshot;

pub use error::ActionError;
pub use registry::{ExecutorFn, NodeRegistry, PortMap, TransformFn, ValidatorFn};
pub use snapshot::ExecutionSnapshot;
