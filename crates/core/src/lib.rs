//! Domain model for the mission orchestration client.
//!
//! This crate holds the types shared by the protocol client and the
//! orchestrator: the orchestration [`Stage`], transcript entries, the
//! results of each protocol phase, persisted [`Receipt`]s and the
//! [`ErrorClassifier`] that turns raw failures into user-facing sentences.

pub mod classify;
pub mod domain;
pub mod error;

pub use classify::{ClassifiedError, ErrorCategory, ErrorClassifier, Failure};
pub use domain::*;
pub use error::{CoreError, Result};
