use conf_core::hashing::{config_fingerprint, hash_value};
use conf_domain::ConfigMap;
use serde_json::json;

#[test]
fn hash_value_produces_hex_64() {
    let h = hash_value(&json!({"b": 2, "a": 1}));
    // blake3 hex length is 64
    assert_eq!(h.len(), 64);
    // mismo valor con otro orden de claves, mismo hash
    assert_eq!(h, hash_value(&json!({"a": 1, "b": 2})));
}

#[test]
fn fingerprint_tracks_values_not_insertion_order() {
    let mut a = ConfigMap::new();
    a.insert("proba_cutoff".into(), json!(0.5));
    a.insert("model".into(), json!("xgb"));
    let mut b = ConfigMap::new();
    b.insert("model".into(), json!("xgb"));
    b.insert("proba_cutoff".into(), json!(0.5));
    assert_eq!(config_fingerprint(&a), config_fingerprint(&b));

    b.insert("proba_cutoff".into(), json!(0.51));
    assert_ne!(config_fingerprint(&a), config_fingerprint(&b));
}
