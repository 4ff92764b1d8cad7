//! crates/flower_timer_core/src/ports.rs
//!
//! Defines the service contracts (traits) the timer core depends on.
//! Storage, the wall clock and the flower renderer all live behind these traits,
//! so the core never touches a filesystem, a socket or a real clock directly.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::Species;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Storage unavailable: {0}")]
    Storage(String),
    #[error("Malformed document: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// A key/value blob store holding whole serialized documents.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Returns the blob stored under `key`, or `None` if nothing was ever written.
    async fn read(&self, key: &str) -> PortResult<Option<String>>;

    /// Replaces the blob stored under `key`.
    async fn write(&self, key: &str, value: &str) -> PortResult<()>;
}

/// Draws the growing flower. Called on every work tick.
pub trait GrowthRenderer: Send + Sync {
    /// Announces the species for the session about to grow.
    fn init(&self, species: Species);

    /// `progress_percent` is in `0.0..=100.0`.
    fn update_growth(&self, progress_percent: f64);

    /// Back to a seed.
    fn reset(&self);
}

/// Wall-clock source.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;

    /// The current local calendar date.
    fn today(&self) -> NaiveDate;

    fn now_utc(&self) -> DateTime<Utc>;
}
