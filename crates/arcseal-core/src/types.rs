//! Wire types for the archive JSON side-block.
//!
//! ```json
//! {
//!   "version": 1,
//!   "encConfig": {
//!     "wrappedSecrets": "<base64>",
//!     "wrappedArchiveKeyMaterial": "<base64>",
//!     "salt": "<base64>",
//!     "nonce": "<base64>",
//!     "confirmation": "<base64>"
//!   },
//!   "meta": { }
//! }
//! ```
//!
//! Byte fields are carried as standard base64 strings. Decoding them is the
//! job of the crypto layer, which owns the meaning of each field.

use serde::{Deserialize, Serialize};

use crate::error::ArcsealResult;

/// Highest block schema version this build can read and the one it writes.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Encryption parameters of one archive. No field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncConfig {
    /// Secrets record sealed under the recovery-code-derived key
    pub wrapped_secrets: String,
    /// Archive key material wrapped under the backup public key
    pub wrapped_archive_key_material: String,
    /// Salt for the recovery-code KDF
    pub salt: String,
    /// AEAD nonce used to seal `wrapped_secrets`
    pub nonce: String,
    /// HMAC over the canonical serialization of `meta`
    pub confirmation: String,
}

/// The JSON side-block stored next to an encrypted archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveJsonBlock {
    pub version: u32,
    #[serde(rename = "encConfig")]
    pub enc_config: EncConfig,
    pub meta: serde_json::Value,
}

impl ArchiveJsonBlock {
    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> ArcsealResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(data: &[u8]) -> ArcsealResult<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}
