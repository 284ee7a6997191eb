//! Canonical JSON and SHA-256 fingerprints.
//!
//! Every deterministic decision in the system (chaos, enrichment, runbooks,
//! idempotency fingerprints, projection checksums) is derived from these
//! helpers, so their output must never depend on map iteration order.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Returns the lowercase hex SHA-256 digest of `input`.
pub fn hash_string(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Rebuilds `value` with every object's keys sorted, recursively.
///
/// Array order is preserved.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Object(object) => {
            let mut keys: Vec<&String> = object.keys().collect();
            keys.sort();
            let mut sorted = Map::with_capacity(object.len());
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&object[key]));
            }
            Value::Object(sorted)
        }
        other => other.clone(),
    }
}

/// Serializes `value` to its canonical JSON text.
pub fn canonical_json(value: &Value) -> String {
    // `preserve_order` may be enabled elsewhere in the dependency graph.
    canonicalize(value).to_string()
}

/// Hashes the canonical JSON form of any serializable value.
pub fn hash_canonical<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    Ok(hash_string(&canonical_json(&value)))
}

/// Interprets the first eight hex digits of a digest as an unsigned 32-bit signal.
///
/// Digests shorter than eight digits or containing non-hex characters yield 0.
pub fn signal_from_hex(digest: &str) -> u32 {
    digest
        .get(..8)
        .and_then(|prefix| u32::from_str_radix(prefix, 16).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hash_string_matches_known_digest() {
        assert_eq!(
            hash_string("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn canonical_json_is_independent_of_key_order() {
        let a = json!({"b": 1, "a": {"y": [3, 2], "x": null}});
        let b = json!({"a": {"x": null, "y": [3, 2]}, "b": 1});
        assert_eq!(canonical_json(&a), canonical_json(&b));
        assert_eq!(canonical_json(&a), r#"{"a":{"x":null,"y":[3,2]},"b":1}"#);
    }

    #[test]
    fn canonical_json_preserves_array_order() {
        assert_ne!(canonical_json(&json!([1, 2])), canonical_json(&json!([2, 1])));
    }

    #[test]
    fn hash_canonical_equal_for_equivalent_values() {
        let a = hash_canonical(&json!({"k": "v", "n": 1})).unwrap();
        let b = hash_canonical(&json!({"n": 1, "k": "v"})).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn signal_reads_leading_hex_digits() {
        assert_eq!(signal_from_hex("0000000a"), 10);
        assert_eq!(signal_from_hex("ffffffffdeadbeef"), u32::MAX);
        assert_eq!(signal_from_hex("abc"), 0);
        assert_eq!(signal_from_hex("zzzzzzzz"), 0);
    }
}
