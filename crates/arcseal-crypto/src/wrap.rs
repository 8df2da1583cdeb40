//! RSA-OAEP (SHA-256) wrapping of archive key material.
//!
//! The private key travels inside the sealed secrets record as PKCS#8 PEM;
//! the public key is handed to the encryptor directly.

use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use secrecy::SecretString;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::keys::ArchiveKeyMaterial;
use crate::KEY_SIZE;

/// Public half of the backup wrapping key pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePublicKey(RsaPublicKey);

/// Private half of the backup wrapping key pair. Zeroized on drop by `rsa`.
pub struct ArchivePrivateKey(RsaPrivateKey);

impl std::fmt::Debug for ArchivePrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ArchivePrivateKey")
            .field(&"[REDACTED]")
            .finish()
    }
}

impl ArchivePublicKey {
    pub fn from_pem(pem: &str) -> anyhow::Result<Self> {
        RsaPublicKey::from_public_key_pem(pem)
            .map(Self)
            .map_err(|e| anyhow::anyhow!("public key import: {e}"))
    }

    pub fn to_pem(&self) -> anyhow::Result<String> {
        self.0
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| anyhow::anyhow!("public key export: {e}"))
    }
}

impl ArchivePrivateKey {
    /// Import a PKCS#8 PEM private key.
    pub fn from_pkcs8_pem(pem: &str) -> anyhow::Result<Self> {
        RsaPrivateKey::from_pkcs8_pem(pem)
            .map(Self)
            .map_err(|e| anyhow::anyhow!("private key import: {e}"))
    }

    /// Export as PKCS#8 PEM.
    pub fn to_pkcs8_pem(&self) -> anyhow::Result<SecretString> {
        let pem = self
            .0
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| anyhow::anyhow!("private key export: {e}"))?;
        Ok(SecretString::from(pem.to_string()))
    }

    pub fn public_key(&self) -> ArchivePublicKey {
        ArchivePublicKey(self.0.to_public_key())
    }
}

/// Generate a new RSA key pair for wrapping archive keys.
pub fn generate_key_pair(bits: usize) -> anyhow::Result<(ArchivePublicKey, ArchivePrivateKey)> {
    let private = RsaPrivateKey::new(&mut rand::thread_rng(), bits)
        .map_err(|e| anyhow::anyhow!("RSA key generation ({bits} bits): {e}"))?;
    let private = ArchivePrivateKey(private);
    Ok((private.public_key(), private))
}

/// Wrap archive key material under the public key.
pub fn wrap_key_material(
    public_key: &ArchivePublicKey,
    material: &ArchiveKeyMaterial,
) -> anyhow::Result<Vec<u8>> {
    public_key
        .0
        .encrypt(
            &mut rand::thread_rng(),
            Oaep::new::<Sha256>(),
            material.as_bytes(),
        )
        .map_err(|e| anyhow::anyhow!("key wrapping failed: {e}"))
}

/// Unwrap archive key material with the private key.
pub fn unwrap_key_material(
    private_key: &ArchivePrivateKey,
    wrapped: &[u8],
) -> anyhow::Result<ArchiveKeyMaterial> {
    let mut plaintext = private_key
        .0
        .decrypt(Oaep::new::<Sha256>(), wrapped)
        .map_err(|_| anyhow::anyhow!("key unwrapping failed: wrong key or corrupted data"))?;

    if plaintext.len() != KEY_SIZE {
        let len = plaintext.len();
        plaintext.zeroize();
        anyhow::bail!("unwrapped key has wrong size: {len} bytes (expected {KEY_SIZE})");
    }

    let mut bytes = [0u8; KEY_SIZE];
    bytes.copy_from_slice(&plaintext);
    plaintext.zeroize();

    Ok(ArchiveKeyMaterial::from_bytes(bytes))
}
