//! Operation safety classification
//!
//! Decides, from static metadata alone, which operations may be invoked:
//! read-style with no required input, read-style with an inferable
//! identifier, or never.

use crate::overlay::RegistryOverlay;
use crate::registry::{Catalog, OperationDescriptor};

/// Prefixes of the read-only action family
const READ_PREFIXES: &[&str] = &["list", "describe", "get", "head"];

/// Mutating verb prefixes, always excluded
const MUTATING_PREFIXES: &[&str] = &[
    "create", "put", "update", "modify", "delete", "remove", "start", "stop", "terminate",
    "reboot", "attach", "detach", "associate", "disassociate", "enable", "disable", "register",
    "deregister", "tag", "untag", "cancel", "accept", "reject", "restore", "copy", "import",
    "export", "send", "invoke", "run", "execute", "publish", "set", "add", "purchase",
];

/// Identifier suffixes stripped when inferring a producing list operation
const IDENTIFIER_SUFFIXES: &[&str] = &["Identifier", "Id", "Arn", "Name"];

/// Safety classification of one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafetyClassification {
    /// Read-style, zero required input: call as-is
    SafeNoParams,
    /// Read-style, one required identifier fed by a companion list operation
    SafeWithInferredParams {
        /// Name of the producing list operation in the same service
        producer: String,
        /// Required input member filled from each produced item
        identifier: String,
    },
    /// Required input with no resolvable producer; never scheduled
    UnsafeRequiresUnknownParams,
    /// Mutating verb or denylisted; never scheduled
    Excluded,
}

/// Classifies operations against the catalog and overlay tables
pub struct SafetyClassifier {
    overlay: RegistryOverlay,
}

impl SafetyClassifier {
    /// Classifier with no overlay entries (built-in verb rules only)
    pub fn new() -> Self {
        Self {
            overlay: RegistryOverlay::default(),
        }
    }

    /// Classifier with a loaded overlay
    pub fn with_overlay(overlay: RegistryOverlay) -> Self {
        Self { overlay }
    }

    /// Classify one operation. Pure over the catalog and overlay tables:
    /// the same descriptor always yields the same classification.
    pub fn classify(
        &self,
        op: &OperationDescriptor,
        catalog: &Catalog,
    ) -> SafetyClassification {
        if self.overlay.is_denied(&op.service, &op.name) {
            return SafetyClassification::Excluded;
        }

        let lower = op.name.to_lowercase();
        if MUTATING_PREFIXES.iter().any(|p| lower.starts_with(p)) {
            return SafetyClassification::Excluded;
        }
        if !READ_PREFIXES.iter().any(|p| lower.starts_with(p)) {
            // Outside the read-only action family altogether
            return SafetyClassification::Excluded;
        }

        if op.required_params.is_empty() {
            return SafetyClassification::SafeNoParams;
        }

        // Only single-identifier inputs are inferable; multi-parameter
        // operations have no deterministic producer.
        if op.required_params.len() == 1 {
            let identifier = &op.required_params[0];

            if let Some(entry) = self.overlay.followup(&op.service, &op.name) {
                if catalog.find(&op.service, &entry.producer).is_some() {
                    return SafetyClassification::SafeWithInferredParams {
                        producer: entry.producer.clone(),
                        identifier: entry.identifier.clone(),
                    };
                }
            }

            if let Some(producer) = infer_producer(op, identifier, catalog) {
                return SafetyClassification::SafeWithInferredParams {
                    producer,
                    identifier: identifier.clone(),
                };
            }
        }

        SafetyClassification::UnsafeRequiresUnknownParams
    }
}

impl Default for SafetyClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Find a parameterless list operation in the same service whose name
/// contains the identifier's resource stem.
///
/// "HostedZoneId" resolves against "ListHostedZones"; candidates are tried
/// in sorted order so the result is stable across loads.
fn infer_producer(
    op: &OperationDescriptor,
    identifier: &str,
    catalog: &Catalog,
) -> Option<String> {
    let stem = resource_stem(identifier)?;

    let mut candidates: Vec<&str> = catalog
        .service_operations(&op.service)
        .iter()
        .filter(|c| c.name != op.name && c.required_params.is_empty() && c.is_list_like())
        .filter(|c| c.name.to_lowercase().contains(&stem))
        .map(|c| c.name.as_str())
        .collect();
    candidates.sort_unstable();
    candidates.first().map(|s| s.to_string())
}

/// Strip the identifier suffix from a parameter name
///
/// "HostedZoneId" -> "hostedzone", "TrailName" -> "trail"
fn resource_stem(identifier: &str) -> Option<String> {
    for suffix in IDENTIFIER_SUFFIXES {
        if let Some(stem) = identifier.strip_suffix(suffix) {
            if !stem.is_empty() {
                return Some(stem.to_lowercase());
            }
        }
    }
    None
}
