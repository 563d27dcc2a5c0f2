//! Hash helpers: blake3 sobre JSON canónico.

use blake3::Hasher;
use conf_domain::ConfigMap;
use serde_json::Value;

use super::to_canonical_json;

/// Hashea un string y devuelve hex.
pub fn hash_str(input: &str) -> String {
    let mut h = Hasher::new();
    h.update(input.as_bytes());
    h.finalize().to_hex().to_string()
}

pub fn hash_value(value: &Value) -> String {
    hash_str(&to_canonical_json(value))
}

/// Huella estable de un `ConfigMap`, independiente del orden de inserción.
pub fn config_fingerprint(entries: &ConfigMap) -> String {
    let object: serde_json::Map<String, Value> = entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    hash_value(&Value::Object(object))
}
