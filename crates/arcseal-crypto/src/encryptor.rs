//! Writing side of an archive session.
//!
//! ```text
//! initialize(public_key, backup_auth_key)   random material, RSA-wrap, derive keys
//!   encrypt(chunk, false) ×N                  full-size chunks, counter 0..N-1
//!   encrypt(chunk, true)                      last chunk, may be short, sets the flag
//! confirm(meta, ...)                          signed JSON side-block
//! ```

use std::sync::Arc;

use arcseal_core::types::{ArchiveJsonBlock, EncConfig, CURRENT_SCHEMA_VERSION};
use serde_json::Value;

use crate::chunk;
use crate::confirm::sign_meta;
use crate::encoding::base64_encode;
use crate::error::{ArchiveError, ArchiveResult};
use crate::kdf::KeyDerivation;
use crate::keys::{generate_archive_key_material, ArchiveAuthKey, ArchiveEncKey, BackupAuthKey};
use crate::nonce::NonceCounter;
use crate::recovery::BackupCredentials;
use crate::session::SessionState;
use crate::wrap::{wrap_key_material, ArchivePublicKey};
use crate::CHUNK_MAX_BYTES_SIZE;

/// Encrypts one archive. Only obtainable through [`ArchiveEncryptor::initialize`].
///
/// All chunk operations take `&mut self`; the nonce counter cannot be shared
/// between concurrent callers.
#[derive(Debug)]
pub struct ArchiveEncryptor {
    public_key: ArchivePublicKey,
    auth_key: ArchiveAuthKey,
    wrapped_archive_key_material: Vec<u8>,
    enc_key: ArchiveEncKey,
    nonce: NonceCounter,
}

impl ArchiveEncryptor {
    /// Start a session: generate and wrap fresh archive key material and derive
    /// the chunk and metadata keys from it.
    ///
    /// RSA and HKDF run on the blocking pool.
    pub async fn initialize(
        public_key: ArchivePublicKey,
        backup_auth_key: BackupAuthKey,
        kdf: Arc<dyn KeyDerivation>,
    ) -> ArchiveResult<Self> {
        tokio::task::spawn_blocking(move || Self::build(public_key, &backup_auth_key, kdf.as_ref()))
            .await?
    }

    /// [`initialize`](Self::initialize) with the inputs taken from provisioned
    /// credentials.
    pub async fn for_credentials(
        credentials: &BackupCredentials,
        kdf: Arc<dyn KeyDerivation>,
    ) -> ArchiveResult<Self> {
        Self::initialize(
            credentials.public_key().clone(),
            credentials.backup_auth_key().clone(),
            kdf,
        )
        .await
    }

    fn build(
        public_key: ArchivePublicKey,
        backup_auth_key: &BackupAuthKey,
        kdf: &dyn KeyDerivation,
    ) -> ArchiveResult<Self> {
        let material = generate_archive_key_material();

        let wrapped_archive_key_material = wrap_key_material(&public_key, &material)
            .map_err(|e| ArchiveError::KeyDerivationFailed(e.to_string()))?;

        let keys = kdf
            .derive_encryption_keys(&material, backup_auth_key)
            .map_err(|e| match e {
                ArchiveError::KeyDerivationFailed(_) => e,
                other => ArchiveError::KeyDerivationFailed(other.to_string()),
            })?;

        tracing::debug!("archive encryptor initialized");

        Ok(Self {
            public_key,
            auth_key: keys.auth,
            wrapped_archive_key_material,
            enc_key: keys.enc,
            nonce: NonceCounter::new(),
        })
    }

    /// Encrypt the next chunk.
    ///
    /// Every chunk except the last must be exactly `CHUNK_MAX_BYTES_SIZE`
    /// bytes. Returns ciphertext followed by the 16-byte tag.
    pub fn encrypt(&mut self, plaintext: &[u8], is_last_chunk: bool) -> ArchiveResult<Vec<u8>> {
        if self.nonce.is_finalized() {
            return Err(ArchiveError::SessionFinalized);
        }
        if plaintext.len() > CHUNK_MAX_BYTES_SIZE {
            return Err(ArchiveError::ChunkTooLarge {
                len: plaintext.len(),
                max: CHUNK_MAX_BYTES_SIZE,
            });
        }
        if plaintext.len() != CHUNK_MAX_BYTES_SIZE && !is_last_chunk {
            return Err(ArchiveError::ShortChunkNotLast {
                len: plaintext.len(),
                expected: CHUNK_MAX_BYTES_SIZE,
            });
        }

        // Set before sealing: a failed final chunk still ends the session.
        if is_last_chunk {
            self.nonce.set_finalize_flag()?;
        }

        let ciphertext = chunk::seal(self.enc_key.as_bytes(), &self.nonce.aead_nonce(), plaintext)
            .map_err(|e| {
                tracing::warn!(chunk = self.nonce.counter(), "{e}");
                ArchiveError::EncryptionFailed
            })?;

        self.nonce.increment_one()?;

        tracing::trace!(
            chunk = self.nonce.counter() - 1,
            len = plaintext.len(),
            last = is_last_chunk,
            "encrypted chunk"
        );
        Ok(ciphertext)
    }

    /// Produce the signed JSON side-block for this archive.
    ///
    /// Does not touch session state and may be called more than once.
    pub fn confirm(
        &self,
        meta: Value,
        wrapped_secrets: &[u8],
        salt: &[u8],
        nonce_for_secrets: &[u8],
    ) -> ArchiveJsonBlock {
        let confirmation = sign_meta(&self.auth_key, &meta);

        ArchiveJsonBlock {
            version: CURRENT_SCHEMA_VERSION,
            enc_config: EncConfig {
                wrapped_secrets: base64_encode(wrapped_secrets),
                wrapped_archive_key_material: base64_encode(&self.wrapped_archive_key_material),
                salt: base64_encode(salt),
                nonce: base64_encode(nonce_for_secrets),
                confirmation: base64_encode(&confirmation),
            },
            meta,
        }
    }

    /// [`confirm`](Self::confirm) with the secrets fields taken from
    /// provisioned credentials.
    pub fn confirm_with(&self, meta: Value, credentials: &BackupCredentials) -> ArchiveJsonBlock {
        self.confirm(
            meta,
            credentials.wrapped_secrets(),
            credentials.salt(),
            credentials.secrets_nonce(),
        )
    }

    pub fn is_finalized(&self) -> bool {
        self.nonce.is_finalized()
    }

    /// Number of chunks successfully encrypted so far.
    pub fn chunks_processed(&self) -> u64 {
        self.nonce.counter()
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_nonce(&self.nonce)
    }

    pub fn public_key(&self) -> &ArchivePublicKey {
        &self.public_key
    }
}
