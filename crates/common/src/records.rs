//! On-disk record and statistics types
//!
//! These types define the stable schemas shared between the collection and
//! analysis phases: one `RawRecord` per (service, region, operation), plus
//! the run-level statistics and account metadata documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of a failed or skipped remote call, preserved in records so the
/// analysis phase can distinguish "denied" from "absent" from "broken".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Operation forbidden for the current credentials
    AccessDenied,
    /// Rate limit exhausted after bounded retries
    Throttled,
    /// Resource or operation does not exist for this account
    NotFound,
    /// Operation not supported in the target region
    Unsupported,
    /// Per-call timeout exhausted after bounded retries
    Timeout,
    /// Transport-level failure (endpoint unreachable)
    Connection,
    /// Response payload did not match the expected shape
    ParseError,
    /// Anything else
    Other,
}

impl ErrorKind {
    /// Kinds that mean "not available here" rather than a real failure.
    /// The indexer counts these as neither successful nor failed.
    pub fn is_not_available(&self) -> bool {
        matches!(self, ErrorKind::NotFound | ErrorKind::Unsupported)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::AccessDenied => "AccessDenied",
            ErrorKind::Throttled => "Throttled",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Unsupported => "Unsupported",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Connection => "Connection",
            ErrorKind::ParseError => "ParseError",
            ErrorKind::Other => "Other",
        };
        write!(f, "{s}")
    }
}

/// Structured error persisted inside a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Metadata header of a raw record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub service: String,
    pub region: String,
    pub operation: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default)]
    pub paginated: bool,
    /// Pagination cap was reached; the payload holds only the fetched pages
    #[serde(default)]
    pub truncated: bool,
    pub success: bool,
}

/// One collected record: the on-disk unit of the raw store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub metadata: RecordMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RecordError>,
}

impl RawRecord {
    /// Successful record with a payload
    pub fn success(metadata: RecordMetadata, data: serde_json::Value) -> Self {
        Self {
            metadata,
            data: Some(data),
            error: None,
        }
    }

    /// Failed or skipped record with a structured error
    pub fn failure(mut metadata: RecordMetadata, error: RecordError) -> Self {
        metadata.success = false;
        Self {
            metadata,
            data: None,
            error: Some(error),
        }
    }
}

/// Run-level collection statistics, serialized to `collection_stats.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionStats {
    pub services_discovered: usize,
    pub operations_executed: u64,
    pub operations_successful: u64,
    pub operations_failed: u64,
    pub operations_skipped: u64,
    pub elapsed_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl CollectionStats {
    /// Merge counters from another stats block (used when joining workers)
    pub fn absorb(&mut self, other: &CollectionStats) {
        self.operations_executed += other.operations_executed;
        self.operations_successful += other.operations_successful;
        self.operations_failed += other.operations_failed;
        self.operations_skipped += other.operations_skipped;
    }
}

/// Account context captured at the start of a run, serialized to
/// `metadata.json` for the report layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_alias: Option<String>,
    pub regions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_available_kinds() {
        assert!(ErrorKind::NotFound.is_not_available());
        assert!(ErrorKind::Unsupported.is_not_available());
        assert!(!ErrorKind::AccessDenied.is_not_available());
        assert!(!ErrorKind::Throttled.is_not_available());
    }

    #[test]
    fn test_failure_record_clears_success_flag() {
        let metadata = RecordMetadata {
            service: "ec2".to_string(),
            region: "us-east-1".to_string(),
            operation: "DescribeInstances".to_string(),
            timestamp: Utc::now(),
            account: None,
            paginated: false,
            truncated: false,
            success: true,
        };
        let record = RawRecord::failure(
            metadata,
            RecordError {
                kind: ErrorKind::AccessDenied,
                message: "denied".to_string(),
            },
        );
        assert!(!record.metadata.success);
        assert!(record.data.is_none());
    }

    #[test]
    fn test_stats_absorb() {
        let mut a = CollectionStats {
            operations_executed: 2,
            operations_successful: 1,
            operations_failed: 1,
            ..Default::default()
        };
        let b = CollectionStats {
            operations_executed: 3,
            operations_successful: 3,
            ..Default::default()
        };
        a.absorb(&b);
        assert_eq!(a.operations_executed, 5);
        assert_eq!(a.operations_successful, 4);
        assert_eq!(a.operations_failed, 1);
    }
}
