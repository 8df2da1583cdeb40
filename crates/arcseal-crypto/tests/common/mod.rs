//! Shared fixtures for the archive integration tests.

#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use arcseal_crypto::{
    generate_key_pair, ArchiveDecryptor, ArchiveEncryptor, ArchiveJsonBlock, ArchivePrivateKey,
    ArchivePublicKey, ArchiveResult, BackupCredentials, KdfParams, KeyDerivation,
    StandardKeyDerivation,
};
use secrecy::{ExposeSecret, SecretString};

pub const RECOVERY_CODE: &str =
    "abandon ability able about above absent absorb abstract absurd abuse access accident";
pub const OS_SECRET: &str = "os-keystore-secret-for-tests";

/// Argon2id params light enough for tests.
pub fn fast_kdf() -> Arc<dyn KeyDerivation> {
    Arc::new(StandardKeyDerivation::new(KdfParams {
        mem_cost_kib: 1024,
        time_cost: 1,
        parallelism: 1,
    }))
}

fn shared_key_pair() -> &'static (ArchivePublicKey, ArchivePrivateKey) {
    static PAIR: OnceLock<(ArchivePublicKey, ArchivePrivateKey)> = OnceLock::new();
    PAIR.get_or_init(|| generate_key_pair(2048).expect("RSA key generation"))
}

/// Credentials sealed under [`RECOVERY_CODE`], reusing one RSA key pair.
pub fn credentials(kdf: &dyn KeyDerivation) -> BackupCredentials {
    let (public, private) = shared_key_pair();
    let pem = private.to_pkcs8_pem().expect("export private key");
    let private = ArchivePrivateKey::from_pkcs8_pem(pem.expose_secret()).expect("import");
    BackupCredentials::from_key_pair(
        &SecretString::from(RECOVERY_CODE),
        SecretString::from(OS_SECRET),
        kdf,
        public.clone(),
        private,
    )
    .expect("provision credentials")
}

/// Deterministic, non-repeating test data.
pub fn make_data(size: usize, seed: u8) -> Vec<u8> {
    (0..size)
        .map(|i| (i.wrapping_mul(31) ^ (i >> 5)) as u8 ^ seed)
        .collect()
}

pub struct SealedArchive {
    pub block: ArchiveJsonBlock,
    pub ciphertexts: Vec<Vec<u8>>,
}

/// Encrypt `chunks` in order, marking the last one, and confirm `meta`.
pub async fn seal_archive(chunks: &[Vec<u8>], meta: serde_json::Value) -> SealedArchive {
    let kdf = fast_kdf();
    let creds = credentials(kdf.as_ref());
    let mut enc = ArchiveEncryptor::for_credentials(&creds, kdf)
        .await
        .expect("encryptor init");

    let ciphertexts = chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| enc.encrypt(chunk, i + 1 == chunks.len()).expect("encrypt"))
        .collect();

    let block = enc.confirm_with(meta, &creds);
    SealedArchive { block, ciphertexts }
}

pub async fn open_archive(block: &ArchiveJsonBlock) -> ArchiveResult<ArchiveDecryptor> {
    open_archive_with_code(block, RECOVERY_CODE).await
}

pub async fn open_archive_with_code(
    block: &ArchiveJsonBlock,
    code: &str,
) -> ArchiveResult<ArchiveDecryptor> {
    ArchiveDecryptor::initialize(SecretString::from(code.to_string()), block, fast_kdf()).await
}
