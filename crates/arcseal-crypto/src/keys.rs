//! Key types and the HKDF step of the key hierarchy.
//!
//! ```text
//! recovery code + salt ──Argon2id──▶ backup root
//!   ├── HKDF(info="arcseal-backup-auth-v1") ▶ BackupAuthKey
//!   └── HKDF(info="arcseal-backup-enc-v1")  ▶ BackupEncKey   (seals the secrets record)
//!
//! ArchiveKeyMaterial (random, per archive) + BackupAuthKey
//!   ├── HKDF(info="arcseal-archive-enc-v1")  ▶ ArchiveEncKey  (chunk AEAD only)
//!   └── HKDF(info="arcseal-archive-auth-v1") ▶ ArchiveAuthKey (meta HMAC only)
//! ```

use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::{ArchiveError, ArchiveResult};
use crate::KEY_SIZE;

const BACKUP_AUTH_INFO: &[u8] = b"arcseal-backup-auth-v1";
const BACKUP_ENC_INFO: &[u8] = b"arcseal-backup-enc-v1";
const ARCHIVE_ENC_INFO: &[u8] = b"arcseal-archive-enc-v1";
const ARCHIVE_AUTH_INFO: &[u8] = b"arcseal-archive-auth-v1";

/// Declares a 256-bit key newtype that is zeroized on drop and redacted in
/// `Debug` output.
macro_rules! secret_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        pub struct $name {
            bytes: [u8; KEY_SIZE],
        }

        impl $name {
            pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
                Self { bytes }
            }

            pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
                &self.bytes
            }
        }

        impl Drop for $name {
            fn drop(&mut self) {
                self.bytes.zeroize();
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("bytes", &"[REDACTED]")
                    .finish()
            }
        }
    };
}

secret_key!(
    /// Random per-archive secret. Only its RSA-wrapped form leaves the session.
    ArchiveKeyMaterial
);
secret_key!(
    /// Derived from the recovery code; salts the archive key derivation.
    BackupAuthKey
);
secret_key!(
    /// Derived from the recovery code; seals the backup secrets record.
    BackupEncKey
);
secret_key!(
    /// Chunk AEAD key.
    ArchiveEncKey
);
secret_key!(
    /// Metadata HMAC key.
    ArchiveAuthKey
);

impl Clone for BackupAuthKey {
    fn clone(&self) -> Self {
        Self::from_bytes(self.bytes)
    }
}

/// Keys unlocked by the recovery code.
#[derive(Debug)]
pub struct BackupKeys {
    pub auth: BackupAuthKey,
    pub enc: BackupEncKey,
}

/// Keys bound to one archive.
#[derive(Debug)]
pub struct ArchiveKeys {
    pub enc: ArchiveEncKey,
    pub auth: ArchiveAuthKey,
}

/// Generate fresh random archive key material.
pub fn generate_archive_key_material() -> ArchiveKeyMaterial {
    let mut bytes = [0u8; KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut bytes);
    ArchiveKeyMaterial::from_bytes(bytes)
}

/// Split the Argon2id output into the two backup keys.
pub fn derive_backup_keys_from_root(root: &[u8; KEY_SIZE]) -> ArchiveResult<BackupKeys> {
    let hkdf = Hkdf::<Sha256>::new(None, root);
    Ok(BackupKeys {
        auth: BackupAuthKey::from_bytes(hkdf_expand(&hkdf, BACKUP_AUTH_INFO)?),
        enc: BackupEncKey::from_bytes(hkdf_expand(&hkdf, BACKUP_ENC_INFO)?),
    })
}

/// Derive the archive encryption and authentication keys.
///
/// The backup auth key is the HKDF salt, so an archive's keys depend on both
/// the random material and the recovery code it was provisioned under.
pub fn derive_archive_keys(
    material: &ArchiveKeyMaterial,
    backup_auth_key: &BackupAuthKey,
) -> ArchiveResult<ArchiveKeys> {
    let hkdf = Hkdf::<Sha256>::new(Some(backup_auth_key.as_bytes()), material.as_bytes());
    Ok(ArchiveKeys {
        enc: ArchiveEncKey::from_bytes(hkdf_expand(&hkdf, ARCHIVE_ENC_INFO)?),
        auth: ArchiveAuthKey::from_bytes(hkdf_expand(&hkdf, ARCHIVE_AUTH_INFO)?),
    })
}

fn hkdf_expand(hkdf: &Hkdf<Sha256>, info: &[u8]) -> ArchiveResult<[u8; KEY_SIZE]> {
    let mut okm = [0u8; KEY_SIZE];
    hkdf.expand(info, &mut okm)
        .map_err(|e| ArchiveError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;
    Ok(okm)
}
