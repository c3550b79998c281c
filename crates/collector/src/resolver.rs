//! Parameter inference from prior list results
//!
//! Follow-up describe/get calls take their identifiers from the most recent
//! successful result of the producing list operation in the same
//! (service, region). A producer that has not run, or returned zero items,
//! yields zero parameter sets; the follow-up is then a no-op, not an error.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Identifier lookup fallbacks, tried in order after the exact member name
const ID_FALLBACKS: &[&str] = &["Id", "ID", "id", "Arn", "ARN", "arn", "Name"];

/// Successful list-like payloads for one (service, region), keyed by
/// operation name. Region-scoped; dropped with the worker.
#[derive(Debug, Default)]
pub struct ListResultCache {
    items: HashMap<String, Vec<Value>>,
}

impl ListResultCache {
    /// Record the items of a successful list operation (last write wins)
    pub fn record(&mut self, operation: &str, items: Vec<Value>) {
        self.items.insert(operation.to_string(), items);
    }

    /// Items produced by an operation, if it ran successfully
    pub fn items(&self, operation: &str) -> Option<&[Value]> {
        self.items.get(operation).map(Vec::as_slice)
    }
}

/// Build one parameter set per produced item, capped at `max_followups`.
/// Items without an extractable identifier are passed over.
pub fn resolve_params(
    items: &[Value],
    identifier: &str,
    max_followups: usize,
) -> Vec<Map<String, Value>> {
    let mut params = Vec::new();
    for item in items {
        if params.len() >= max_followups {
            break;
        }
        if let Some(value) = extract_identifier(item, identifier) {
            let mut set = Map::new();
            set.insert(identifier.to_string(), Value::String(value));
            params.push(set);
        }
    }
    params
}

/// Flatten a stored payload into its individual items.
///
/// Handles both record shapes the executor writes: the paged wrapper
/// `{"pages": N, "data": [page, ...]}` and a bare single response. Within a
/// page, the declared list member is preferred; otherwise the first
/// array-valued member (by sorted key) is taken.
pub fn extract_items(data: &Value, list_member: Option<&str>) -> Vec<Value> {
    let mut items = Vec::new();
    match data {
        Value::Object(map) if map.contains_key("pages") && map.contains_key("data") => {
            if let Some(Value::Array(pages)) = map.get("data") {
                for page in pages {
                    collect_page_items(page, list_member, &mut items);
                }
            }
        }
        Value::Array(values) => items.extend(values.iter().cloned()),
        other => collect_page_items(other, list_member, &mut items),
    }
    items
}

fn collect_page_items(page: &Value, list_member: Option<&str>, items: &mut Vec<Value>) {
    let Value::Object(map) = page else {
        return;
    };
    if let Some(member) = list_member {
        if let Some(Value::Array(values)) = map.get(member) {
            items.extend(values.iter().cloned());
            return;
        }
    }
    // No declared member: fall back to the first array member, sorted for
    // determinism
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    for key in keys {
        if let Some(Value::Array(values)) = map.get(key) {
            items.extend(values.iter().cloned());
            return;
        }
    }
}

/// Pull the identifier out of one produced item
fn extract_identifier(item: &Value, field: &str) -> Option<String> {
    match item {
        // Some list operations return bare identifier strings
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => {
            if let Some(value) = scalar_string(map.get(field)) {
                return Some(value);
            }
            let with_id = format!("{field}Id");
            if let Some(value) = scalar_string(map.get(&with_id)) {
                return Some(value);
            }
            for fallback in ID_FALLBACKS {
                if let Some(value) = scalar_string(map.get(*fallback)) {
                    return Some(value);
                }
            }
            None
        }
        _ => None,
    }
}

fn scalar_string(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}
