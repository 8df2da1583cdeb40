//! Counter nonce with an embedded finalize flag.
//!
//! Buffer layout (16 bytes):
//! ```text
//! [0..4)   reserved, always zero, never transmitted
//! [4]      finalize flag (0 or 1)
//! [5..8)   reserved IV bytes, always zero
//! [8..16)  chunk counter, u64 big-endian
//! ```
//!
//! Bytes `[4..16)` are the 96-bit AEAD nonce. Because the flag lives outside
//! the counter, the nonce of a final chunk never equals the nonce a non-final
//! chunk would get at the same counter value. Relabelling the last chunk of a
//! truncated stream as final therefore fails authentication.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{ArchiveError, ArchiveResult};
use crate::{ARCHIVE_MAX_BYTES_SIZE, CHUNK_MAX_BYTES_SIZE, NONCE_SIZE};

const BUFFER_LEN: usize = 16;
const FLAG_INDEX: usize = 4;
const AEAD_NONCE_START: usize = BUFFER_LEN - NONCE_SIZE;
const COUNTER_START: usize = 8;

/// Per-session nonce state. Deliberately neither `Clone` nor `Copy`: the
/// owning session is the only place that may advance it.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct NonceCounter {
    buf: [u8; BUFFER_LEN],
}

impl NonceCounter {
    /// A zeroed counter: flag clear, counter 0.
    pub fn new() -> Self {
        Self {
            buf: [0u8; BUFFER_LEN],
        }
    }

    /// Set the finalize flag. Fails if it is already set.
    pub fn set_finalize_flag(&mut self) -> ArchiveResult<()> {
        if self.is_finalized() {
            return Err(ArchiveError::AlreadyFinalized);
        }
        self.buf[FLAG_INDEX] = 1;
        Ok(())
    }

    pub fn is_finalized(&self) -> bool {
        self.buf[FLAG_INDEX] == 1
    }

    /// Current chunk counter.
    pub fn counter(&self) -> u64 {
        let mut be = [0u8; 8];
        be.copy_from_slice(&self.buf[COUNTER_START..]);
        u64::from_be_bytes(be)
    }

    /// Advance the counter by `by`.
    ///
    /// The size limit is checked against the new value before anything is
    /// written, so a failed increment leaves the counter untouched.
    pub fn increment(&mut self, by: u64) -> ArchiveResult<()> {
        let next = self
            .counter()
            .checked_add(by)
            .ok_or(ArchiveError::ArchiveSizeExceeded)?;

        let covered = u128::from(next) * CHUNK_MAX_BYTES_SIZE as u128;
        if covered > u128::from(ARCHIVE_MAX_BYTES_SIZE) {
            return Err(ArchiveError::ArchiveSizeExceeded);
        }

        self.buf[COUNTER_START..].copy_from_slice(&next.to_be_bytes());
        Ok(())
    }

    /// Advance the counter by one chunk.
    pub fn increment_one(&mut self) -> ArchiveResult<()> {
        self.increment(1)
    }

    /// The 96-bit nonce handed to the AEAD primitive.
    pub fn aead_nonce(&self) -> [u8; NONCE_SIZE] {
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&self.buf[AEAD_NONCE_START..]);
        nonce
    }
}

impl Default for NonceCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NonceCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceCounter")
            .field("finalized", &self.is_finalized())
            .field("counter", &self.counter())
            .finish()
    }
}
