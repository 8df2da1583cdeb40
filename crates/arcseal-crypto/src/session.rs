/// Lifecycle of an encryptor or decryptor session.
///
/// `Fresh → Active → Finalized`, plus `Poisoned` on the decryptor after an
/// authentication failure. Nothing leaves `Poisoned`; `Finalized` only
/// admits read-only queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No chunk processed yet.
    Fresh,
    /// At least one non-final chunk processed.
    Active,
    /// The last chunk has been accepted (or attempted, on the encryptor).
    Finalized,
    /// Key material discarded after a failed authentication.
    Poisoned,
}

impl SessionState {
    pub(crate) fn from_nonce(nonce: &crate::nonce::NonceCounter) -> Self {
        if nonce.is_finalized() {
            Self::Finalized
        } else if nonce.counter() == 0 {
            Self::Fresh
        } else {
            Self::Active
        }
    }
}
