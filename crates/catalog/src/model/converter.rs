//! Converts a capability model document into the operation registry

use super::types::{CapabilityDocument, OperationModel, ServiceModel};
use crate::registry::{Catalog, OperationDescriptor};
use cloudsweep_common::Result;
use std::collections::BTreeMap;
use tracing::warn;

/// Convert a parsed document into an immutable [`Catalog`].
///
/// A service section that fails to deserialize is skipped and logged once;
/// it never fails the load for the remaining services.
pub fn convert_document(document: &CapabilityDocument) -> Result<Catalog> {
    let mut services: BTreeMap<String, Vec<OperationDescriptor>> = BTreeMap::new();

    for (service_name, section) in &document.services {
        let model: ServiceModel = match serde_json::from_value(section.clone()) {
            Ok(model) => model,
            Err(e) => {
                warn!(service = %service_name, error = %e, "skipping unparseable service section");
                continue;
            }
        };

        let mut descriptors: Vec<OperationDescriptor> = model
            .operations
            .iter()
            .map(|(op_name, op)| build_descriptor(service_name, op_name, op))
            .collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        services.insert(service_name.clone(), descriptors);
    }

    Ok(Catalog::new(
        document.version,
        document.provider.clone(),
        services,
    ))
}

fn build_descriptor(service: &str, name: &str, op: &OperationModel) -> OperationDescriptor {
    let (mut required, mut optional) = (Vec::new(), Vec::new());
    if let Some(input) = &op.input {
        for member in input.members.keys() {
            if input.required.iter().any(|r| r == member) {
                required.push(member.clone());
            } else {
                optional.push(member.clone());
            }
        }
    }
    required.sort();
    optional.sort();

    let output = op.output.as_ref();
    OperationDescriptor {
        service: service.to_string(),
        name: name.to_string(),
        required_params: required,
        optional_params: optional,
        paginated: output.is_some_and(|o| o.pagination_token.is_some()),
        list_member: output.and_then(|o| o.list_member.clone()),
    }
}
