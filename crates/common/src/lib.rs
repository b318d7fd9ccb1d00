//! Shared identifier types used across the saga orchestrator crates.

pub mod types;

pub use types::{OrderId, SagaId, UserId};
