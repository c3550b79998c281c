//! Remote API seam
//!
//! The executor never talks to a concrete SDK client; it drives the
//! [`CloudApi`] trait. Session establishment and credential plumbing live
//! behind implementations of this trait, outside this crate.

use async_trait::async_trait;
use chrono::Utc;
use cloudsweep_common::records::{AccountMetadata, ErrorKind};
use thiserror::Error;

/// One remote call: a single page fetch of one operation
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub service: String,
    pub region: String,
    pub operation: String,
    /// Inferred parameters, empty for safe-no-params operations
    pub params: serde_json::Map<String, serde_json::Value>,
    /// Continuation token from the previous page
    pub page_token: Option<String>,
}

/// One page of a remote response
#[derive(Debug, Clone)]
pub struct ApiPage {
    pub body: serde_json::Value,
    pub next_token: Option<String>,
}

/// Remote call failure taxonomy
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("throttled: {0}")]
    Throttled(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unsupported in region: {0}")]
    Unsupported(String),

    #[error("call timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("{0}")]
    Other(String),
}

impl ApiError {
    /// Transient failures are retried with backoff; everything else is
    /// terminal on first occurrence.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::Throttled(_) | ApiError::Timeout(_) | ApiError::Connection(_)
        )
    }

    /// Terminal errors that record the task as skipped rather than failed
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            ApiError::AccessDenied(_) | ApiError::NotFound(_) | ApiError::Unsupported(_)
        )
    }

    /// The error kind persisted into the raw record
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::AccessDenied(_) => ErrorKind::AccessDenied,
            ApiError::Throttled(_) => ErrorKind::Throttled,
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::Unsupported(_) => ErrorKind::Unsupported,
            ApiError::Timeout(_) => ErrorKind::Timeout,
            ApiError::Connection(_) => ErrorKind::Connection,
            ApiError::Malformed(_) => ErrorKind::ParseError,
            ApiError::Other(_) => ErrorKind::Other,
        }
    }
}

/// The remote surface the executor collects from
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CloudApi: Send + Sync {
    /// Fetch one page of one operation. Implementations must not retry
    /// internally; the executor owns the retry policy.
    async fn invoke(&self, request: &ApiRequest) -> Result<ApiPage, ApiError>;
}

/// Explicit per-run context passed to the executor and resolver.
/// Replaces any process-wide session state; lifetime is one run.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub account_id: Option<String>,
    pub account_alias: Option<String>,
    pub regions: Vec<String>,
}

impl RunContext {
    pub fn new(regions: Vec<String>) -> Self {
        Self {
            account_id: None,
            account_alias: None,
            regions,
        }
    }

    /// Snapshot for the `metadata.json` collaborator output
    pub fn account_metadata(&self) -> AccountMetadata {
        AccountMetadata {
            account_id: self.account_id.clone(),
            account_alias: self.account_alias.clone(),
            regions: self.regions.clone(),
            timestamp: Some(Utc::now()),
        }
    }
}
