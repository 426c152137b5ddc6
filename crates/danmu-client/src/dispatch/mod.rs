//! Event dispatch
//!
//! Turns decoded leaf packets into events and runs the matching handlers.

mod dispatcher;

pub use dispatcher::{EventDispatcher, EventDispatcherConfig};
