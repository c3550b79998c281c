//! Capability catalog for cloud service discovery
//!
//! This crate loads the versioned capability model into an immutable
//! in-memory registry of `OperationDescriptor`s and classifies every
//! operation's safety without touching the remote system.
//!
//! ## Classification policy
//!
//! - read-style prefix (List/Describe/Get/Head), zero required input →
//!   safe to call as-is
//! - one required identifier with a resolvable producing list operation →
//!   safe with inferred parameters
//! - required input with no resolvable producer → never scheduled
//! - mutating verb or denylisted operation → excluded

mod classifier;
mod model;
mod overlay;
mod registry;

pub use classifier::{SafetyClassification, SafetyClassifier};
pub use model::{CapabilityDocument, CatalogParser};
pub use overlay::{FollowupEntry, RegistryOverlay};
pub use registry::{Catalog, OperationDescriptor};

use cloudsweep_common::Result;
use std::path::Path;

/// Load a capability model file into a catalog
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Catalog> {
    CatalogParser::from_file(path)?.parse()
}
