//! Standard base64 for the byte fields of the archive block.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{ArchiveError, ArchiveResult};

pub(crate) fn base64_encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode one named block field.
pub(crate) fn base64_decode(field: &str, s: &str) -> ArchiveResult<Vec<u8>> {
    STANDARD
        .decode(s)
        .map_err(|e| ArchiveError::MalformedBlock(format!("{field}: base64 decode: {e}")))
}
