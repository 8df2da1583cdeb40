//! Error taxonomy for archive sessions.
//!
//! Variants never carry key material or plaintext. `Unauthenticated` (wrong
//! recovery code) is kept apart from `BackupCorrupted` / `ChunkCorrupted`
//! (tampering) so callers can prompt again in the first case and give up in
//! the others.

use thiserror::Error;

pub type ArchiveResult<T> = Result<T, ArchiveError>;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("finalize flag is already set")]
    AlreadyFinalized,

    #[error("session is finalized, no further chunks accepted")]
    SessionFinalized,

    #[error("session was poisoned by an earlier authentication failure")]
    SessionPoisoned,

    #[error("chunk too large: {len} bytes (maximum {max})")]
    ChunkTooLarge { len: usize, max: usize },

    #[error("only the last chunk may be short: got {len} bytes, expected {expected}")]
    ShortChunkNotLast { len: usize, expected: usize },

    #[error("archive size limit exceeded")]
    ArchiveSizeExceeded,

    #[error("chunk encryption failed")]
    EncryptionFailed,

    #[error("chunk failed authentication")]
    ChunkCorrupted,

    #[error("recovery code did not authenticate the backup secrets")]
    Unauthenticated,

    #[error("backup metadata failed verification")]
    BackupCorrupted,

    #[error("unsupported archive block version {found} (supported up to {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("secret is withheld until the archive has been fully decrypted")]
    NotFinalized,

    #[error("malformed archive block: {0}")]
    MalformedBlock(String),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
