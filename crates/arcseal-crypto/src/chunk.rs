//! ChaCha20-Poly1305 with caller-managed nonces
//!
//! Output format: `[N bytes: ciphertext][16 bytes: Poly1305 tag]`. The nonce
//! is not stored with the ciphertext; both sides derive it from their own
//! counter state, so reordered or relabelled chunks fail to authenticate.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};

use crate::{KEY_SIZE, NONCE_SIZE, TAG_SIZE};

/// Encrypt `plaintext` under `key` and `nonce`, appending the tag.
///
/// The caller must never reuse a `(key, nonce)` pair.
pub fn seal(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
) -> anyhow::Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(key.into());
    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| anyhow::anyhow!("chunk encryption failed: {e}"))
}

/// Decrypt and authenticate `ciphertext` (ciphertext followed by tag).
pub fn open(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
) -> anyhow::Result<Vec<u8>> {
    if ciphertext.len() < TAG_SIZE {
        anyhow::bail!(
            "ciphertext too short: {} bytes (minimum {TAG_SIZE})",
            ciphertext.len()
        );
    }

    let cipher = ChaCha20Poly1305::new(key.into());
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| anyhow::anyhow!("chunk decryption failed: invalid key, nonce, or corrupted data"))
}
