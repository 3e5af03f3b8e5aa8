//! File signature (magic bytes) detection.

use crate::error::FormatError;

/// The 8-byte hdfobj magic signature.
///
/// Same shape as the HDF5 signature (non-ASCII lead byte, CR-LF, ^Z, LF) so
/// text-mode transfers are detected, but with its own tag.
pub const SIGNATURE: [u8; 8] = [0x89, b'H', b'O', b'B', b'\r', b'\n', 0x1A, b'\n'];

/// Search for the signature at valid offsets.
///
/// The signature can appear at offset 0 or at a power of two starting at
/// 512, which leaves room for a user block in front of the container.
///
/// Returns the byte offset where the signature was found.
pub fn find_signature(data: &[u8]) -> Result<usize, FormatError> {
    if data.len() >= 8 && data[..8] == SIGNATURE {
        return Ok(0);
    }

    let mut offset = 512;
    while offset + 8 <= data.len() {
        if data[offset..offset + 8] == SIGNATURE {
            return Ok(offset);
        }
        offset *= 2;
    }

    Err(FormatError::SignatureNotFound)
}
