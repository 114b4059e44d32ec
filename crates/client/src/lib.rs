pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod stream;
pub mod types;

pub use api::MissionApi;
pub use client::MissionClient;
pub use config::ClientConfig;
pub use error::{MissionClientError, Result};
pub use stream::{ExecuteStream, ExecuteStreamEvent, FinalPayload};
pub use types::*;
