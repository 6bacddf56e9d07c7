//! Deterministic witness identifiers for violations.
//!
//! Two violations of the same contract, by the same plaintiff, over the same
//! evidence always carry the same witness ID, regardless of process, thread,
//! or cause chain. This makes violations comparable across runs and lets test
//! suites pin the exact failure they expect.
//!
//! Algorithm:
//! 1. Build the canonical key `{schema, contract, kind, plaintiff, evidence}`
//! 2. Serialize canonically: sorted object keys, no whitespace
//! 3. witnessId = "w1_" || base32hex_lower(SHA256(keyBytes))

use crate::contract::ContractKind;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

pub const WITNESS_SCHEMA: u64 = 1;
pub const WITNESS_PREFIX: &str = "w1_";

/// Compute the witness ID for one violation.
pub fn compute_witness_id(
    contract: &str,
    kind: ContractKind,
    plaintiff: &str,
    evidence: &Value,
) -> String {
    let key = witness_key(contract, kind, plaintiff, evidence);
    let mut canonical = String::new();
    write_canonical(&key, &mut canonical);
    let digest = Sha256::digest(canonical.as_bytes());
    format!("{WITNESS_PREFIX}{}", base32hex_lower(&digest))
}

fn witness_key(contract: &str, kind: ContractKind, plaintiff: &str, evidence: &Value) -> Value {
    let mut map = Map::new();
    map.insert("schema".into(), Value::from(WITNESS_SCHEMA));
    map.insert("contract".into(), Value::from(contract));
    map.insert("kind".into(), Value::from(kind.as_str()));
    map.insert("plaintiff".into(), Value::from(plaintiff));
    map.insert("evidence".into(), evidence.clone());
    Value::Object(map)
}

/// Canonical JSON: object keys sorted lexicographically at every depth, no
/// insignificant whitespace. Strings use serde_json's escaping.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        // Scalars already serialize canonically without whitespace.
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// RFC 4648 base32hex, lowercase, no padding. Alphabet: 0-9 a-v.
fn base32hex_lower(data: &[u8]) -> String {
    const ALPHABET: &[u8; 32] = b"0123456789abcdefghijklmnopqrstuv";

    let mut encoded = String::with_capacity(data.len() * 8 / 5 + 1);
    let mut buffer: u32 = 0;
    let mut pending_bits: u32 = 0;

    for &byte in data {
        buffer = (buffer << 8) | u32::from(byte);
        pending_bits += 8;
        while pending_bits >= 5 {
            pending_bits -= 5;
            encoded.push(ALPHABET[((buffer >> pending_bits) & 0x1f) as usize] as char);
        }
        buffer &= (1 << pending_bits) - 1;
    }

    if pending_bits > 0 {
        encoded.push(ALPHABET[((buffer << (5 - pending_bits)) & 0x1f) as usize] as char);
    }

    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn witness_id_is_deterministic() {
        let evidence = json!({"timeoutNanoseconds": 0});
        let first = compute_witness_id("x", ContractKind::Obligation, "p", &evidence);
        let second = compute_witness_id("x", ContractKind::Obligation, "p", &evidence);
        assert_eq!(first, second);
        assert!(first.starts_with(WITNESS_PREFIX));
    }

    #[test]
    fn witness_id_is_sensitive_to_every_key_field() {
        let evidence = json!([1, 2]);
        let base = compute_witness_id("x", ContractKind::Obligation, "p", &evidence);
        assert_ne!(
            base,
            compute_witness_id("y", ContractKind::Obligation, "p", &evidence)
        );
        assert_ne!(
            base,
            compute_witness_id("x", ContractKind::Guarantee, "p", &evidence)
        );
        assert_ne!(
            base,
            compute_witness_id("x", ContractKind::Obligation, "q", &evidence)
        );
        assert_ne!(
            base,
            compute_witness_id("x", ContractKind::Obligation, "p", &json!([2, 1]))
        );
    }

    #[test]
    fn canonical_form_sorts_nested_keys() {
        let mut out = String::new();
        write_canonical(&json!({"b": {"z": 1, "a": [true, null]}, "a": "s"}), &mut out);
        assert_eq!(out, r#"{"a":"s","b":{"a":[true,null],"z":1}}"#);
    }

    #[test]
    fn base32hex_of_known_bytes() {
        // RFC 4648 test vectors, lowercased, padding stripped.
        assert_eq!(base32hex_lower(b""), "");
        assert_eq!(base32hex_lower(b"f"), "co");
        assert_eq!(base32hex_lower(b"fo"), "cpng");
        assert_eq!(base32hex_lower(b"foo"), "cpnmu");
        assert_eq!(base32hex_lower(b"foobar"), "cpnmuoj1e8");
    }

    #[test]
    fn sha256_digest_encodes_to_52_symbols() {
        let id = compute_witness_id("x", ContractKind::Guarantee, "p", &Value::Null);
        assert_eq!(id.len(), WITNESS_PREFIX.len() + 52);
        assert!(
            id[WITNESS_PREFIX.len()..]
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='v').contains(&c))
        );
    }
}
