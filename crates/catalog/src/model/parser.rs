//! Capability model file parser

use super::types::CapabilityDocument;
use crate::registry::Catalog;
use cloudsweep_common::{Result, SweepError};
use std::fs;
use std::path::Path;

/// Capability model parser
///
/// Reads and parses the versioned capability model JSON published with the
/// provider SDK, producing the immutable in-memory [`Catalog`].
pub struct CatalogParser {
    document: CapabilityDocument,
}

impl CatalogParser {
    /// Load a capability model from a file path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            SweepError::Catalog(format!(
                "Failed to read capability model {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_json(&content)
    }

    /// Parse a capability model from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let document: CapabilityDocument = serde_json::from_str(json)
            .map_err(|e| SweepError::Catalog(format!("Failed to parse capability model: {e}")))?;
        Ok(Self { document })
    }

    /// Convert the document into the immutable operation registry
    pub fn parse(&self) -> Result<Catalog> {
        super::converter::convert_document(&self.document)
    }

    /// Get a reference to the underlying document
    pub fn document(&self) -> &CapabilityDocument {
        &self.document
    }
}
