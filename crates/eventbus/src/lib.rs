//! # Nebula Flow Event Bus
//!
//! A process-wide, string-keyed publish/subscribe bus used for workflow and
//! node lifecycle notifications. Subscribers are isolated from one another:
//! a panic in one callback never stops its siblings from running, and is
//! instead surfaced as a `system:error` event.

pub mod bus;
pub mod error;
pub mod subscription;

pub use bus::EventBus;
pub use error::EventBusError;
pub use subscription::{EventCallback, SubscribeOptions, Subscription};
