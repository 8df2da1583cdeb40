//! Key derivation: recovery code → backup keys, archive material → archive keys

use argon2::{Algorithm, Argon2, Params, Version};
use arcseal_core::config::CryptoConfig;
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroize;

use crate::error::{ArchiveError, ArchiveResult};
use crate::keys::{
    derive_archive_keys, derive_backup_keys_from_root, ArchiveKeyMaterial, ArchiveKeys,
    BackupAuthKey, BackupKeys,
};
use crate::KEY_SIZE;

/// Argon2id parameters for KDF
#[derive(Debug, Clone)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub mem_cost_kib: u32,
    /// Time cost / iterations (default: 3)
    pub time_cost: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            mem_cost_kib: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl From<&CryptoConfig> for KdfParams {
    fn from(config: &CryptoConfig) -> Self {
        Self {
            mem_cost_kib: config.argon2_mem_cost_kib,
            time_cost: config.argon2_time_cost,
            parallelism: config.argon2_parallelism,
        }
    }
}

/// The two derivation steps the archive sessions depend on.
///
/// Sessions only see this trait, so tests and alternative deployments can
/// swap in their own hierarchy.
pub trait KeyDerivation: Send + Sync {
    /// Derive `(backupAuthKey, backupEncKey)` from the recovery code and salt.
    fn derive_backup_keys(
        &self,
        recovery_code: &SecretString,
        salt: &[u8],
    ) -> ArchiveResult<BackupKeys>;

    /// Derive `(archiveEncKey, archiveAuthKey)` from archive key material.
    fn derive_encryption_keys(
        &self,
        material: &ArchiveKeyMaterial,
        backup_auth_key: &BackupAuthKey,
    ) -> ArchiveResult<ArchiveKeys>;
}

/// Argon2id for the recovery code, HKDF-SHA256 for everything below it.
#[derive(Debug, Clone, Default)]
pub struct StandardKeyDerivation {
    params: KdfParams,
}

impl StandardKeyDerivation {
    pub fn new(params: KdfParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &KdfParams {
        &self.params
    }
}

impl KeyDerivation for StandardKeyDerivation {
    fn derive_backup_keys(
        &self,
        recovery_code: &SecretString,
        salt: &[u8],
    ) -> ArchiveResult<BackupKeys> {
        let mut root = derive_backup_root(recovery_code, salt, &self.params)?;
        let keys = derive_backup_keys_from_root(&root);
        root.zeroize();
        keys
    }

    fn derive_encryption_keys(
        &self,
        material: &ArchiveKeyMaterial,
        backup_auth_key: &BackupAuthKey,
    ) -> ArchiveResult<ArchiveKeys> {
        derive_archive_keys(material, backup_auth_key)
    }
}

/// Derive the 256-bit backup root from a recovery code and salt using Argon2id.
///
/// The salt is stored in the archive block and need not be secret. Argon2
/// rejects salts shorter than 8 bytes.
pub fn derive_backup_root(
    recovery_code: &SecretString,
    salt: &[u8],
    params: &KdfParams,
) -> ArchiveResult<[u8; KEY_SIZE]> {
    let argon2_params = Params::new(
        params.mem_cost_kib,
        params.time_cost,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| ArchiveError::KeyDerivationFailed(format!("invalid Argon2id params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = [0u8; KEY_SIZE];
    argon2
        .hash_password_into(recovery_code.expose_secret().as_bytes(), salt, &mut key)
        .map_err(|e| ArchiveError::KeyDerivationFailed(format!("Argon2id KDF failed: {e}")))?;

    Ok(key)
}
