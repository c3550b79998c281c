//! Registry overlay loading from YAML files
//!
//! The overlay carries the hand-maintained tables that the capability model
//! itself cannot express: operations excluded from scheduling, and the
//! explicit describe-parameter producer mapping.

use cloudsweep_common::{Result, SweepError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Root structure for registry overlay YAML files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryOverlay {
    /// Overlay format version
    #[serde(default)]
    pub version: u32,

    /// Operations excluded from scheduling, as "service.Operation" keys
    #[serde(default)]
    pub denylist: Vec<String>,

    /// Explicit "list-result feeds describe-parameter" mappings, maintained
    /// alongside the capability registry
    #[serde(default)]
    pub followups: Vec<FollowupEntry>,
}

/// One describe-operation parameter producer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowupEntry {
    /// Owning service (e.g., "route53")
    pub service: String,
    /// The describe/get operation needing a parameter
    pub operation: String,
    /// The list operation whose items carry the value
    pub producer: String,
    /// Field holding the identifier within each produced item
    pub identifier: String,
}

impl RegistryOverlay {
    /// Load an overlay from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            SweepError::Catalog(format!(
                "Failed to read overlay file {}: {e}",
                path.as_ref().display()
            ))
        })?;

        serde_yaml::from_str(&content).map_err(|e| {
            SweepError::Catalog(format!(
                "Failed to parse overlay YAML from {}: {e}",
                path.as_ref().display()
            ))
        })
    }

    /// Whether an operation is excluded from scheduling
    pub fn is_denied(&self, service: &str, operation: &str) -> bool {
        let key = format!("{service}.{operation}");
        self.denylist.iter().any(|d| d == &key)
    }

    /// Explicit producer for a describe operation, if one is declared
    pub fn followup(&self, service: &str, operation: &str) -> Option<&FollowupEntry> {
        self.followups
            .iter()
            .find(|f| f.service == service && f.operation == operation)
    }
}
