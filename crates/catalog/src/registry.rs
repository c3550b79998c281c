//! Immutable operation registry
//!
//! The catalog is loaded once at startup and never mutated afterwards; the
//! classifier and scheduler treat it as a plain lookup table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything the scheduler needs to know about one callable operation.
/// Derived once per catalog load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    /// Owning service identifier (e.g., "ec2")
    pub service: String,
    /// Operation wire name (e.g., "DescribeInstances")
    pub name: String,
    /// Input members that must be supplied, sorted
    pub required_params: Vec<String>,
    /// Remaining input members, sorted
    pub optional_params: Vec<String>,
    /// Output carries a continuation token
    pub paginated: bool,
    /// Output member holding the principal result list
    pub list_member: Option<String>,
}

impl OperationDescriptor {
    /// List-style operations are the ones whose results can seed follow-up
    /// describe calls.
    pub fn is_list_like(&self) -> bool {
        let lower = self.name.to_lowercase();
        lower.starts_with("list") || lower.starts_with("describe")
    }
}

/// The immutable in-memory capability table
#[derive(Debug, Clone)]
pub struct Catalog {
    version: u32,
    provider: Option<String>,
    services: BTreeMap<String, Vec<OperationDescriptor>>,
}

impl Catalog {
    pub(crate) fn new(
        version: u32,
        provider: Option<String>,
        services: BTreeMap<String, Vec<OperationDescriptor>>,
    ) -> Self {
        Self {
            version,
            provider,
            services,
        }
    }

    /// Model format version this catalog was loaded from
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Provider identifier, if the model declared one
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Service names in sorted order
    pub fn services(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    pub fn operation_count(&self) -> usize {
        self.services.values().map(Vec::len).sum()
    }

    /// All descriptors, grouped by service, sorted within each service
    pub fn operations(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.services.values().flatten()
    }

    /// Descriptors for one service (empty slice if unknown)
    pub fn service_operations(&self, service: &str) -> &[OperationDescriptor] {
        self.services.get(service).map_or(&[], Vec::as_slice)
    }

    /// Look up a single operation
    pub fn find(&self, service: &str, name: &str) -> Option<&OperationDescriptor> {
        self.services
            .get(service)?
            .iter()
            .find(|op| op.name == name)
    }
}
