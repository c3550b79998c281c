//! Normalized index over the raw store
//!
//! The index is recomputed in full on every analysis run; it never patches
//! a prior index. All maps are ordered so the same store always produces
//! the same serialized index.

use crate::extraction::ExtractionMap;
use cloudsweep_common::records::{ErrorKind, RecordError};
use cloudsweep_common::{RawStore, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// One indexed operation record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationEntry {
    pub operation: String,
    pub success: bool,
    pub paginated: bool,
    pub truncated: bool,
    /// Error meant "not available here", not a real failure
    pub not_available: bool,
    pub resource_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RecordError>,
}

/// Per-region view of one service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionIndex {
    pub operations: Vec<OperationEntry>,
    pub successful: usize,
    pub failed: usize,
    pub resource_count: u64,
}

/// Per-service aggregate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceIndex {
    pub regions: BTreeMap<String, RegionIndex>,
    pub total_operations: usize,
    pub successful_operations: usize,
    pub failed_operations: usize,
    pub resource_count: u64,
}

/// The queryable index consumed by findings, scoring, and the report layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Index {
    pub services: BTreeMap<String, ServiceIndex>,
    pub regions: BTreeSet<String>,
    pub total_operations: usize,
    /// Best-effort global estimate; truncated or permission-limited lists
    /// contribute only what was actually fetched
    pub total_resources: u64,
}

impl Index {
    /// A service is present when at least one of its operations succeeded
    /// somewhere.
    pub fn service_present(&self, service: &str) -> bool {
        self.services
            .get(service)
            .is_some_and(|s| s.successful_operations > 0)
    }

    /// For an absent service, the error kind observed (first by sorted
    /// region/operation order), e.g. NotFound vs AccessDenied.
    pub fn absence_kind(&self, service: &str) -> Option<ErrorKind> {
        let service = self.services.get(service)?;
        if service.successful_operations > 0 {
            return None;
        }
        service
            .regions
            .values()
            .flat_map(|r| r.operations.iter())
            .find_map(|op| op.error.as_ref().map(|e| e.kind))
    }

    /// Total resources attributed to one service
    pub fn resource_total(&self, service: &str) -> u64 {
        self.services.get(service).map_or(0, |s| s.resource_count)
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Successful operation references for evidence lists, capped
    pub fn presence_refs(&self, service: &str, cap: usize) -> Vec<String> {
        let Some(idx) = self.services.get(service) else {
            return Vec::new();
        };
        idx.regions
            .iter()
            .flat_map(|(region, r)| {
                r.operations
                    .iter()
                    .filter(|op| op.success)
                    .map(move |op| format!("{service}/{region}/{}", op.operation))
            })
            .take(cap)
            .collect()
    }

    /// Services ranked by resource count, descending, name-tiebroken
    pub fn top_services(&self, n: usize) -> Vec<(String, u64)> {
        let mut ranked: Vec<(String, u64)> = self
            .services
            .iter()
            .map(|(name, s)| (name.clone(), s.resource_count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }

    /// Regions ranked by resource count, descending, name-tiebroken
    pub fn top_regions(&self, n: usize) -> Vec<(String, u64)> {
        let mut by_region: BTreeMap<String, u64> = BTreeMap::new();
        for service in self.services.values() {
            for (region, r) in &service.regions {
                *by_region.entry(region.clone()).or_insert(0) += r.resource_count;
            }
        }
        let mut ranked: Vec<(String, u64)> = by_region.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }
}

/// Build the index from every readable record in the store.
/// Pure over the store contents; unreadable files are logged and skipped.
pub fn build_index(store: &RawStore, extraction: &ExtractionMap) -> Result<Index> {
    let mut index = Index::default();

    for record in store.iter(None) {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "skipping unreadable record");
                continue;
            }
        };
        let metadata = &record.metadata;
        index.regions.insert(metadata.region.clone());

        let not_available = record
            .error
            .as_ref()
            .is_some_and(|e| e.kind.is_not_available());

        let resource_count = if metadata.success {
            record
                .data
                .as_ref()
                .map_or(0, |data| {
                    extraction.count_resources(&metadata.service, &metadata.operation, data)
                })
        } else {
            0
        };

        let entry = OperationEntry {
            operation: metadata.operation.clone(),
            success: metadata.success,
            paginated: metadata.paginated,
            truncated: metadata.truncated,
            not_available,
            resource_count,
            error: record.error.clone(),
        };
        debug!(
            service = %metadata.service,
            region = %metadata.region,
            operation = %metadata.operation,
            resource_count,
            "indexed record"
        );

        let service = index.services.entry(metadata.service.clone()).or_default();
        let region = service.regions.entry(metadata.region.clone()).or_default();
        if entry.success {
            region.successful += 1;
        } else if !not_available {
            region.failed += 1;
        }
        region.resource_count += resource_count;
        region.operations.push(entry);
        index.total_operations += 1;
    }

    // Region operation lists arrive in walk order; normalize them, then
    // roll up the per-service aggregates.
    for service in index.services.values_mut() {
        for region in service.regions.values_mut() {
            region.operations.sort_by(|a, b| a.operation.cmp(&b.operation));
        }
        service.total_operations = service.regions.values().map(|r| r.operations.len()).sum();
        service.successful_operations = service.regions.values().map(|r| r.successful).sum();
        service.failed_operations = service.regions.values().map(|r| r.failed).sum();
        service.resource_count = service.regions.values().map(|r| r.resource_count).sum();
    }
    index.total_resources = index.services.values().map(|s| s.resource_count).sum();

    Ok(index)
}
