//! HMAC-SHA256 confirmation over archive metadata.
//!
//! The MAC input is the canonical serialization of `meta`: compact JSON with
//! object keys sorted at every level. Sorting is done here rather than
//! relying on serde_json's map ordering, which changes with the
//! `preserve_order` feature.

use hmac::digest::{Key, KeyInit};
use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::keys::ArchiveAuthKey;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 output size in bytes.
pub const CONFIRMATION_SIZE: usize = 32;

/// SHA-256 block size; HMAC zero-pads shorter keys to this length.
const HMAC_BLOCK_SIZE: usize = 64;

/// Canonical byte form of a metadata value.
pub fn canonical_json(meta: &Value) -> Vec<u8> {
    // `Display` on a `Value` writes compact JSON.
    canonicalize(meta).to_string().into_bytes()
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key.clone(), canonicalize(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

fn keyed_mac(key: &ArchiveAuthKey, meta: &Value) -> HmacSha256 {
    // A 32-byte key padded to the block size gives the same MAC, and the
    // block-sized constructor has no error path.
    let mut padded = Zeroizing::new([0u8; HMAC_BLOCK_SIZE]);
    padded[..key.as_bytes().len()].copy_from_slice(key.as_bytes());

    let mut mac = <HmacSha256 as KeyInit>::new(Key::<HmacSha256>::from_slice(padded.as_slice()));
    mac.update(&canonical_json(meta));
    mac
}

/// Compute the confirmation tag for `meta`.
pub fn sign_meta(key: &ArchiveAuthKey, meta: &Value) -> [u8; CONFIRMATION_SIZE] {
    keyed_mac(key, meta).finalize().into_bytes().into()
}

/// Check a confirmation tag in constant time.
pub fn verify_meta(key: &ArchiveAuthKey, meta: &Value, confirmation: &[u8]) -> bool {
    keyed_mac(key, meta).verify_slice(confirmation).is_ok()
}
