//! Common types and utilities for Cloudsweep
//!
//! This crate contains the shared data structures, error types, and the raw
//! record store used across the catalog, collector, and analyzer components.

use thiserror::Error;

pub mod records;
pub mod store;

pub use records::{
    AccountMetadata, CollectionStats, ErrorKind, RawRecord, RecordError, RecordMetadata,
};
pub use store::RawStore;

/// Errors that can occur during collection or analysis
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for Cloudsweep operations
pub type Result<T> = std::result::Result<T, SweepError>;
