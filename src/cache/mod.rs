// src/cache/mod.rs

mod memory;

#[cfg(test)]
mod tests;

pub use memory::ResponseCache;

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Deterministic cache key for an operation and its arguments.
///
/// Arguments are rendered as canonical JSON (object keys sorted) so that
/// logically identical requests always hash to the same key.
pub fn cache_key(operation: &str, args: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(operation.as_bytes());
    hasher.update([0u8]);
    hasher.update(canonical_json(args).as_bytes());
    format!("{:x}", hasher.finalize())
}

fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}:{}", Value::String(k.clone()), canonical_json(&map[k])))
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        other => other.to_string(),
    }
}
