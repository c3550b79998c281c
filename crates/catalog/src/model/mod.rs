//! Capability model parsing
//!
//! Reads the versioned JSON capability model published with the provider
//! SDK and converts it into the immutable operation registry.

mod converter;
mod parser;
mod types;

pub use parser::CatalogParser;
pub use types::{CapabilityDocument, InputShape, MemberShape, OperationModel, OutputShape};
