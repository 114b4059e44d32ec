//! Event system for the mission client
//!
//! This crate provides the event bus and event types a presentation layer
//! subscribes to in order to render a mission's transcript and progress.

mod bus;
mod types;

pub use bus::EventBus;
pub use types::*;
