//! # Nebula Flow Engine
//!
//! The workflow engine: validates a graph, derives execution order, drives
//! nodes to completion under sequential or parallel scheduling, and exposes
//! pause / resume / cancel / timeout controls over a run.

pub mod engine;
pub mod error;
pub mod handle;

pub use engine::{Engine, ExecuteOptions, ExecutionResult, ExecutionStats};
pub use error::EngineError;
pub use handle::RunHandle;

/// Common prelude for consumers of `nebula-engine`.
pub mod prelude {
    pub use crate::{Engine, EngineError, ExecuteOptions, ExecutionResult, ExecutionStats, RunHandle};
}
