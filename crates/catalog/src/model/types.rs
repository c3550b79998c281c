//! Capability model document type definitions
//!
//! These types represent the structure of the versioned capability model:
//! a JSON document describing every service, its operations, and their
//! input/output shapes, published alongside the provider SDK.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root capability model document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityDocument {
    /// Model format version
    pub version: u32,

    /// Provider identifier (e.g., "aws")
    #[serde(default)]
    pub provider: Option<String>,

    /// Service sections, kept untyped here so one malformed section can be
    /// skipped without failing the whole load
    #[serde(default)]
    pub services: HashMap<String, serde_json::Value>,
}

/// One service section of the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceModel {
    /// Operations keyed by their wire name (e.g., "DescribeInstances")
    #[serde(default)]
    pub operations: HashMap<String, OperationModel>,
}

/// One operation definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationModel {
    /// Input shape
    #[serde(default)]
    pub input: Option<InputShape>,

    /// Output shape
    #[serde(default)]
    pub output: Option<OutputShape>,
}

/// Input structure of an operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputShape {
    /// Member fields keyed by name
    #[serde(default)]
    pub members: HashMap<String, MemberShape>,

    /// Names of members that must be supplied
    #[serde(default)]
    pub required: Vec<String>,
}

/// A single input member
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberShape {
    /// Wire type name (e.g., "string", "list")
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
}

/// Output structure of an operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputShape {
    /// Continuation token member, if the operation paginates
    #[serde(default)]
    pub pagination_token: Option<String>,

    /// Member holding the principal list of results
    #[serde(default)]
    pub list_member: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_document_deserializes() {
        let doc: CapabilityDocument = serde_json::from_str(r#"{"version": 1}"#).unwrap();
        assert_eq!(doc.version, 1);
        assert!(doc.services.is_empty());
    }

    #[test]
    fn test_operation_defaults() {
        let op: OperationModel = serde_json::from_str("{}").unwrap();
        assert!(op.input.is_none());
        assert!(op.output.is_none());
    }
}
