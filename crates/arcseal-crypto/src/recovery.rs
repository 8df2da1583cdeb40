//! Recovery codes and backup credential provisioning
//!
//! When backups are enabled, a 24-word BIP-39 recovery code is generated and
//! shown to the user once. Provisioning then creates the RSA key pair that
//! wraps every archive key, and seals the private half (plus the OS key-store
//! secret) under a key derived from the recovery code. Only the recovery
//! code can unseal it again.

use arcseal_core::config::CryptoConfig;
use bip39::Mnemonic;
use rand::RngCore;
use secrecy::SecretString;

use crate::kdf::KeyDerivation;
use crate::keys::BackupAuthKey;
use crate::secrets::BackupSecrets;
use crate::wrap::{generate_key_pair, ArchivePrivateKey, ArchivePublicKey};
use crate::{NONCE_SIZE, SALT_SIZE};

/// Generate a new 24-word BIP-39 recovery code.
pub fn generate_recovery_code() -> anyhow::Result<SecretString> {
    // 24 words = 256 bits of entropy
    let mut entropy = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut entropy);

    let mnemonic = Mnemonic::from_entropy(&entropy)
        .map_err(|e| anyhow::anyhow!("BIP-39 mnemonic generation failed: {e}"))?;

    Ok(SecretString::from(mnemonic.to_string()))
}

/// Check that `words` is a well-formed BIP-39 mnemonic.
pub fn validate_recovery_code(words: &str) -> anyhow::Result<()> {
    let _mnemonic: Mnemonic = words
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid recovery code: {e}"))?;
    Ok(())
}

/// Everything an encryptor needs, produced once per backup configuration.
#[derive(Debug)]
pub struct BackupCredentials {
    public_key: ArchivePublicKey,
    backup_auth_key: BackupAuthKey,
    wrapped_secrets: Vec<u8>,
    salt: [u8; SALT_SIZE],
    secrets_nonce: [u8; NONCE_SIZE],
}

impl BackupCredentials {
    /// Generate a key pair of `rsa_bits` and seal it under `recovery_code`.
    pub fn provision(
        recovery_code: &SecretString,
        os_key_store_secret: SecretString,
        kdf: &dyn KeyDerivation,
        rsa_bits: usize,
    ) -> anyhow::Result<Self> {
        let (public_key, private_key) = generate_key_pair(rsa_bits)?;
        Self::from_key_pair(recovery_code, os_key_store_secret, kdf, public_key, private_key)
    }

    /// [`provision`](Self::provision) with the modulus size taken from config.
    pub fn provision_with_config(
        recovery_code: &SecretString,
        os_key_store_secret: SecretString,
        kdf: &dyn KeyDerivation,
        config: &CryptoConfig,
    ) -> anyhow::Result<Self> {
        Self::provision(recovery_code, os_key_store_secret, kdf, config.rsa_key_bits)
    }

    /// Seal an existing key pair under `recovery_code` with a fresh salt.
    pub fn from_key_pair(
        recovery_code: &SecretString,
        os_key_store_secret: SecretString,
        kdf: &dyn KeyDerivation,
        public_key: ArchivePublicKey,
        private_key: ArchivePrivateKey,
    ) -> anyhow::Result<Self> {
        let mut salt = [0u8; SALT_SIZE];
        rand::thread_rng().fill_bytes(&mut salt);

        let backup_keys = kdf
            .derive_backup_keys(recovery_code, &salt)
            .map_err(|e| anyhow::anyhow!("deriving backup keys: {e}"))?;

        let secrets = BackupSecrets {
            private_key,
            os_key_store_secret,
        };
        let sealed = secrets.seal(&backup_keys.enc)?;

        tracing::debug!("provisioned backup credentials");

        Ok(Self {
            public_key,
            backup_auth_key: backup_keys.auth,
            wrapped_secrets: sealed.wrapped,
            salt,
            secrets_nonce: sealed.nonce,
        })
    }

    pub fn public_key(&self) -> &ArchivePublicKey {
        &self.public_key
    }

    pub fn backup_auth_key(&self) -> &BackupAuthKey {
        &self.backup_auth_key
    }

    pub fn wrapped_secrets(&self) -> &[u8] {
        &self.wrapped_secrets
    }

    pub fn salt(&self) -> &[u8; SALT_SIZE] {
        &self.salt
    }

    pub fn secrets_nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.secrets_nonce
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::{KdfParams, StandardKeyDerivation};
    use crate::wrap::test_keys::shared_key_pair;
    use secrecy::ExposeSecret;

    fn fast_kdf() -> StandardKeyDerivation {
        StandardKeyDerivation::new(KdfParams {
            mem_cost_kib: 1024,
            time_cost: 1,
            parallelism: 1,
        })
    }

    fn copy_private(private: &ArchivePrivateKey) -> ArchivePrivateKey {
        ArchivePrivateKey::from_pkcs8_pem(private.to_pkcs8_pem().unwrap().expose_secret()).unwrap()
    }

    #[test]
    fn test_generate_recovery_code() {
        let code = generate_recovery_code().unwrap();

        let word_count = code.expose_secret().split_whitespace().count();
        assert_eq!(word_count, 24, "recovery code must have 24 words");
        validate_recovery_code(code.expose_secret()).unwrap();
    }

    #[test]
    fn test_different_codes() {
        let a = generate_recovery_code().unwrap();
        let b = generate_recovery_code().unwrap();
        assert_ne!(a.expose_secret(), b.expose_secret());
    }

    #[test]
    fn test_invalid_recovery_code() {
        assert!(validate_recovery_code("not a valid mnemonic at all").is_err());
    }

    #[test]
    fn test_credentials_unseal_with_recovery_code() {
        let (public, private) = shared_key_pair();
        let code = SecretString::from("correct horse battery staple");
        let kdf = fast_kdf();

        let creds = BackupCredentials::from_key_pair(
            &code,
            SecretString::from("os-secret"),
            &kdf,
            public.clone(),
            copy_private(private),
        )
        .unwrap();

        let keys = kdf.derive_backup_keys(&code, creds.salt()).unwrap();
        assert_eq!(keys.auth.as_bytes(), creds.backup_auth_key().as_bytes());

        let secrets =
            BackupSecrets::open(&keys.enc, creds.secrets_nonce(), creds.wrapped_secrets()).unwrap();
        assert_eq!(secrets.os_key_store_secret.expose_secret(), "os-secret");
        assert_eq!(&secrets.private_key.public_key(), creds.public_key());
    }

    #[test]
    fn test_credentials_use_fresh_salt() {
        let (public, private) = shared_key_pair();
        let code = SecretString::from("code");
        let kdf = fast_kdf();

        let a = BackupCredentials::from_key_pair(
            &code,
            SecretString::from("s"),
            &kdf,
            public.clone(),
            copy_private(private),
        )
        .unwrap();
        let b = BackupCredentials::from_key_pair(
            &code,
            SecretString::from("s"),
            &kdf,
            public.clone(),
            copy_private(private),
        )
        .unwrap();

        assert_ne!(a.salt(), b.salt());
        assert_ne!(a.backup_auth_key().as_bytes(), b.backup_auth_key().as_bytes());
    }

    #[test]
    fn test_provision_uses_configured_modulus() {
        let config = CryptoConfig {
            rsa_key_bits: 2048,
            ..CryptoConfig::default()
        };
        let creds = BackupCredentials::provision_with_config(
            &SecretString::from("code"),
            SecretString::from("s"),
            &fast_kdf(),
            &config,
        )
        .unwrap();

        // OAEP output is exactly one modulus long.
        let material = crate::keys::generate_archive_key_material();
        let wrapped = crate::wrap::wrap_key_material(creds.public_key(), &material).unwrap();
        assert_eq!(wrapped.len(), 2048 / 8);
    }
}
