//! Reading side of an archive session.
//!
//! Initialization verifies the whole key chain before any chunk is touched:
//! recovery code → secrets record → private key → archive key material →
//! metadata HMAC. After that, chunks are decrypted strictly in order.
//!
//! A chunk that fails authentication poisons the session: key material and
//! the nonce are dropped (and zeroized) and every later call fails with
//! `SessionPoisoned`.

use std::sync::Arc;

use arcseal_core::types::{ArchiveJsonBlock, CURRENT_SCHEMA_VERSION};
use secrecy::SecretString;

use crate::chunk;
use crate::confirm::verify_meta;
use crate::encoding::base64_decode;
use crate::error::{ArchiveError, ArchiveResult};
use crate::kdf::KeyDerivation;
use crate::keys::ArchiveEncKey;
use crate::nonce::NonceCounter;
use crate::secrets::BackupSecrets;
use crate::session::SessionState;
use crate::wrap::unwrap_key_material;
use crate::{CHUNK_MAX_BYTES_SIZE, NONCE_SIZE, TAG_SIZE};

/// Decrypts one archive. Only obtainable through [`ArchiveDecryptor::initialize`].
#[derive(Debug)]
pub struct ArchiveDecryptor {
    session: Session,
}

#[derive(Debug)]
enum Session {
    Live(LiveSession),
    Poisoned,
}

#[derive(Debug)]
struct LiveSession {
    enc_key: ArchiveEncKey,
    os_key_store_secret: SecretString,
    nonce: NonceCounter,
}

impl ArchiveDecryptor {
    /// Unlock an archive from its JSON side-block and the user's recovery code.
    ///
    /// Fails with `Unauthenticated` for a wrong recovery code and with
    /// `BackupCorrupted` if anything authenticated by it does not check out.
    pub async fn initialize(
        recovery_code: SecretString,
        block: &ArchiveJsonBlock,
        kdf: Arc<dyn KeyDerivation>,
    ) -> ArchiveResult<Self> {
        if block.version > CURRENT_SCHEMA_VERSION {
            return Err(ArchiveError::UnsupportedVersion {
                found: block.version,
                supported: CURRENT_SCHEMA_VERSION,
            });
        }

        let block = block.clone();
        tokio::task::spawn_blocking(move || Self::build(&recovery_code, &block, kdf.as_ref()))
            .await?
    }

    fn build(
        recovery_code: &SecretString,
        block: &ArchiveJsonBlock,
        kdf: &dyn KeyDerivation,
    ) -> ArchiveResult<Self> {
        let enc = &block.enc_config;
        let salt = base64_decode("salt", &enc.salt)?;
        let secrets_nonce: [u8; NONCE_SIZE] = base64_decode("nonce", &enc.nonce)?
            .try_into()
            .map_err(|v: Vec<u8>| {
                ArchiveError::MalformedBlock(format!(
                    "nonce: expected {NONCE_SIZE} bytes, got {}",
                    v.len()
                ))
            })?;
        let wrapped_secrets = base64_decode("wrappedSecrets", &enc.wrapped_secrets)?;
        let wrapped_material =
            base64_decode("wrappedArchiveKeyMaterial", &enc.wrapped_archive_key_material)?;
        let confirmation = base64_decode("confirmation", &enc.confirmation)?;

        let backup_keys = kdf.derive_backup_keys(recovery_code, &salt)?;

        let secrets = BackupSecrets::open(&backup_keys.enc, &secrets_nonce, &wrapped_secrets)
            .inspect_err(|e| {
                if matches!(e, ArchiveError::Unauthenticated) {
                    tracing::warn!("recovery code rejected by backup secrets");
                }
            })?;

        let material = unwrap_key_material(&secrets.private_key, &wrapped_material).map_err(|e| {
            tracing::warn!("{e}");
            ArchiveError::BackupCorrupted
        })?;

        let archive_keys = kdf.derive_encryption_keys(&material, &backup_keys.auth)?;

        if !verify_meta(&archive_keys.auth, &block.meta, &confirmation) {
            // Every key derived so far is dropped (and zeroized) on return.
            tracing::warn!("archive metadata confirmation mismatch");
            return Err(ArchiveError::BackupCorrupted);
        }

        // The auth key and private key are not needed past this point.
        let BackupSecrets {
            private_key,
            os_key_store_secret,
        } = secrets;
        drop(private_key);

        tracing::debug!("archive decryptor initialized");

        Ok(Self {
            session: Session::Live(LiveSession {
                enc_key: archive_keys.enc,
                os_key_store_secret,
                nonce: NonceCounter::new(),
            }),
        })
    }

    /// Decrypt the next chunk.
    ///
    /// Every chunk except the last must be exactly `CHUNK_MAX_BYTES_SIZE +
    /// TAG_SIZE` bytes. An authentication failure poisons the session.
    pub fn decrypt(&mut self, ciphertext: &[u8], is_last_chunk: bool) -> ArchiveResult<Vec<u8>> {
        let live = self.live_mut()?;

        if live.nonce.is_finalized() {
            return Err(ArchiveError::SessionFinalized);
        }
        let full = CHUNK_MAX_BYTES_SIZE + TAG_SIZE;
        if ciphertext.len() > full {
            return Err(ArchiveError::ChunkTooLarge {
                len: ciphertext.len(),
                max: full,
            });
        }
        if ciphertext.len() != full && !is_last_chunk {
            return Err(ArchiveError::ShortChunkNotLast {
                len: ciphertext.len(),
                expected: full,
            });
        }

        if is_last_chunk {
            live.nonce.set_finalize_flag()?;
        }

        let chunk_index = live.nonce.counter();
        let opened = chunk::open(live.enc_key.as_bytes(), &live.nonce.aead_nonce(), ciphertext);
        let plaintext = match opened {
            Ok(plaintext) => plaintext,
            Err(e) => {
                tracing::warn!(chunk = chunk_index, last = is_last_chunk, "{e}; poisoning session");
                self.poison();
                return Err(ArchiveError::ChunkCorrupted);
            }
        };

        live.nonce.increment_one()?;

        tracing::trace!(
            chunk = chunk_index,
            len = plaintext.len(),
            last = is_last_chunk,
            "decrypted chunk"
        );
        Ok(plaintext)
    }

    /// The OS key-store secret carried in the backup secrets.
    ///
    /// Withheld until the final chunk has been authenticated.
    pub fn os_key_store_secret(&self) -> ArchiveResult<&SecretString> {
        let live = self.live()?;
        if !live.nonce.is_finalized() {
            return Err(ArchiveError::NotFinalized);
        }
        Ok(&live.os_key_store_secret)
    }

    /// Whether the final chunk has been accepted. Fails once poisoned.
    pub fn is_finalized(&self) -> ArchiveResult<bool> {
        Ok(self.live()?.nonce.is_finalized())
    }

    /// Number of chunks successfully decrypted so far. Fails once poisoned.
    pub fn chunks_processed(&self) -> ArchiveResult<u64> {
        Ok(self.live()?.nonce.counter())
    }

    pub fn state(&self) -> SessionState {
        match &self.session {
            Session::Live(live) => SessionState::from_nonce(&live.nonce),
            Session::Poisoned => SessionState::Poisoned,
        }
    }

    fn live(&self) -> ArchiveResult<&LiveSession> {
        match &self.session {
            Session::Live(live) => Ok(live),
            Session::Poisoned => Err(ArchiveError::SessionPoisoned),
        }
    }

    fn live_mut(&mut self) -> ArchiveResult<&mut LiveSession> {
        match &mut self.session {
            Session::Live(live) => Ok(live),
            Session::Poisoned => Err(ArchiveError::SessionPoisoned),
        }
    }

    fn poison(&mut self) {
        self.session = Session::Poisoned;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryptor::ArchiveEncryptor;
    use crate::kdf::test_kdf::FailingKdf;
    use crate::kdf::{KdfParams, StandardKeyDerivation};
    use crate::recovery::BackupCredentials;
    use crate::wrap::test_keys::shared_key_pair;
    use crate::wrap::ArchivePrivateKey;
    use secrecy::ExposeSecret;

    const RECOVERY_CODE: &str = "unit test recovery code";

    fn kdf() -> Arc<dyn KeyDerivation> {
        Arc::new(StandardKeyDerivation::new(KdfParams {
            mem_cost_kib: 1024,
            time_cost: 1,
            parallelism: 1,
        }))
    }

    fn credentials(kdf: &dyn KeyDerivation) -> BackupCredentials {
        let (public, private) = shared_key_pair();
        let private =
            ArchivePrivateKey::from_pkcs8_pem(private.to_pkcs8_pem().unwrap().expose_secret())
                .unwrap();
        BackupCredentials::from_key_pair(
            &SecretString::from(RECOVERY_CODE),
            SecretString::from("os-secret"),
            kdf,
            public.clone(),
            private,
        )
        .unwrap()
    }

    /// Encrypt `chunks` (the last one marked final) and return the block and
    /// ciphertexts.
    async fn sealed_archive(chunks: &[Vec<u8>]) -> (ArchiveJsonBlock, Vec<Vec<u8>>) {
        let kdf = kdf();
        let creds = credentials(kdf.as_ref());
        let mut enc = ArchiveEncryptor::for_credentials(&creds, kdf).await.unwrap();

        let mut out = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            out.push(enc.encrypt(chunk, i + 1 == chunks.len()).unwrap());
        }
        let block = enc.confirm_with(serde_json::json!({ "label": "unit" }), &creds);
        (block, out)
    }

    async fn open(block: &ArchiveJsonBlock) -> ArchiveResult<ArchiveDecryptor> {
        ArchiveDecryptor::initialize(SecretString::from(RECOVERY_CODE), block, kdf()).await
    }

    #[tokio::test]
    async fn test_roundtrip_and_secret_release() {
        let chunks = vec![vec![1u8; CHUNK_MAX_BYTES_SIZE], b"tail".to_vec()];
        let (block, ciphertexts) = sealed_archive(&chunks).await;
        let mut dec = open(&block).await.unwrap();

        assert_eq!(dec.state(), SessionState::Fresh);
        assert!(matches!(dec.os_key_store_secret(), Err(ArchiveError::NotFinalized)));

        assert_eq!(dec.decrypt(&ciphertexts[0], false).unwrap(), chunks[0]);
        assert_eq!(dec.state(), SessionState::Active);
        assert!(matches!(dec.os_key_store_secret(), Err(ArchiveError::NotFinalized)));

        assert_eq!(dec.decrypt(&ciphertexts[1], true).unwrap(), chunks[1]);
        assert_eq!(dec.state(), SessionState::Finalized);
        assert_eq!(dec.os_key_store_secret().unwrap().expose_secret(), "os-secret");
        assert_eq!(dec.chunks_processed().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_decrypt_after_finalize() {
        let (block, ciphertexts) = sealed_archive(&[b"only".to_vec()]).await;
        let mut dec = open(&block).await.unwrap();
        dec.decrypt(&ciphertexts[0], true).unwrap();

        let result = dec.decrypt(&ciphertexts[0], true);
        assert!(matches!(result, Err(ArchiveError::SessionFinalized)));
    }

    #[tokio::test]
    async fn test_size_policy() {
        let (block, _) = sealed_archive(&[b"x".to_vec()]).await;
        let mut dec = open(&block).await.unwrap();

        let too_big = vec![0u8; CHUNK_MAX_BYTES_SIZE + TAG_SIZE + 1];
        for last in [false, true] {
            assert!(matches!(
                dec.decrypt(&too_big, last),
                Err(ArchiveError::ChunkTooLarge { .. })
            ));
        }
        assert!(matches!(
            dec.decrypt(&[0u8; 64], false),
            Err(ArchiveError::ShortChunkNotLast { len: 64, .. })
        ));
        assert_eq!(dec.state(), SessionState::Fresh, "size errors must not poison");
    }

    #[tokio::test]
    async fn test_corrupted_chunk_poisons() {
        let (block, mut ciphertexts) = sealed_archive(&[b"payload".to_vec()]).await;
        let mut dec = open(&block).await.unwrap();
        ciphertexts[0][0] ^= 0x80;

        assert!(matches!(
            dec.decrypt(&ciphertexts[0], true),
            Err(ArchiveError::ChunkCorrupted)
        ));
        assert_eq!(dec.state(), SessionState::Poisoned);
        assert!(matches!(dec.is_finalized(), Err(ArchiveError::SessionPoisoned)));
        assert!(matches!(dec.chunks_processed(), Err(ArchiveError::SessionPoisoned)));
        assert!(matches!(
            dec.os_key_store_secret(),
            Err(ArchiveError::SessionPoisoned)
        ));

        ciphertexts[0][0] ^= 0x80;
        assert!(
            matches!(
                dec.decrypt(&ciphertexts[0], true),
                Err(ArchiveError::SessionPoisoned)
            ),
            "a poisoned session must stay poisoned even for valid input"
        );
    }

    #[tokio::test]
    async fn test_unsupported_version() {
        let (mut block, _) = sealed_archive(&[b"x".to_vec()]).await;
        block.version = CURRENT_SCHEMA_VERSION + 1;

        let result = open(&block).await;
        assert!(matches!(
            result,
            Err(ArchiveError::UnsupportedVersion { found, supported })
                if found == CURRENT_SCHEMA_VERSION + 1 && supported == CURRENT_SCHEMA_VERSION
        ));
    }

    #[tokio::test]
    async fn test_wrong_nonce_length_is_malformed() {
        let (mut block, _) = sealed_archive(&[b"x".to_vec()]).await;
        block.enc_config.nonce = crate::encoding::base64_encode(&[0u8; 8]);

        assert!(matches!(open(&block).await, Err(ArchiveError::MalformedBlock(_))));
    }

    #[tokio::test]
    async fn test_backup_key_derivation_failure_passes_through() {
        let (block, _) = sealed_archive(&[b"x".to_vec()]).await;

        let result = ArchiveDecryptor::initialize(
            SecretString::from(RECOVERY_CODE),
            &block,
            Arc::new(FailingKdf(|| ArchiveError::KeyDerivationFailed("argon2".into()))),
        )
        .await;
        assert!(matches!(result, Err(ArchiveError::KeyDerivationFailed(msg)) if msg == "argon2"));
    }
}
