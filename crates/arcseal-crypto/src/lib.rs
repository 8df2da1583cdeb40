//! arcseal-crypto: chunked, truncation-resistant encryption for backup archives
//!
//! Key hierarchy:
//! ```text
//! Recovery code (24-word BIP-39)
//!   └── Argon2id(salt) → backup root
//!         ├── BackupEncKey  → seals { RSA private key, OS key-store secret }
//!         └── BackupAuthKey ─┐
//! ArchiveKeyMaterial (256-bit random per archive, RSA-OAEP wrapped)
//!   └── HKDF-SHA256(salt = BackupAuthKey)
//!         ├── ArchiveEncKey  → chunk AEAD: ChaCha20-Poly1305, nonce = [flag|0 0 0|counter BE]
//!         └── ArchiveAuthKey → HMAC-SHA256 over canonical `meta`
//! ```
//!
//! Chunks are encrypted in order with a counter nonce. The last chunk is
//! sealed with a finalize flag inside the nonce, so a truncated stream cannot
//! pass itself off as complete.

pub mod chunk;
pub mod confirm;
pub mod decryptor;
mod encoding;
pub mod encryptor;
pub mod error;
pub mod kdf;
pub mod keys;
pub mod nonce;
pub mod recovery;
pub mod secrets;
pub mod session;
pub mod wrap;

pub use arcseal_core::types::{ArchiveJsonBlock, EncConfig, CURRENT_SCHEMA_VERSION};
pub use decryptor::ArchiveDecryptor;
pub use encryptor::ArchiveEncryptor;
pub use error::{ArchiveError, ArchiveResult};
pub use kdf::{KdfParams, KeyDerivation, StandardKeyDerivation};
pub use keys::{ArchiveKeyMaterial, ArchiveKeys, BackupAuthKey, BackupEncKey, BackupKeys};
pub use nonce::NonceCounter;
pub use recovery::{generate_recovery_code, validate_recovery_code, BackupCredentials};
pub use session::SessionState;
pub use wrap::{generate_key_pair, ArchivePrivateKey, ArchivePublicKey};

/// Size of every symmetric key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of a ChaCha20-Poly1305 nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of a Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;

/// Same as [`TAG_SIZE`], under its protocol name.
pub const TAG_LENGTH_BYTES: usize = TAG_SIZE;

/// Size of the recovery-code KDF salt
pub const SALT_SIZE: usize = 16;

/// Plaintext size of every chunk but the last (4 MiB)
pub const CHUNK_MAX_BYTES_SIZE: usize = 4 * 1024 * 1024;

/// Upper bound on total plaintext per archive (256 GiB)
pub const ARCHIVE_MAX_BYTES_SIZE: u64 = 256 * 1024 * 1024 * 1024;
