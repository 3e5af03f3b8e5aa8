//! Metadata checksums.
//!
//! Superblocks and object headers end in a CRC-32C of every byte before the
//! checksum field.

use crate::error::FormatError;

/// Compute the metadata checksum of a byte slice.
pub fn checksum(data: &[u8]) -> u32 {
    crc32c::crc32c(data)
}

/// Verify `data` against a stored checksum.
pub fn verify(data: &[u8], stored: u32) -> Result<(), FormatError> {
    let computed = checksum(data);
    if computed != stored {
        return Err(FormatError::ChecksumMismatch {
            expected: stored,
            computed,
        });
    }
    Ok(())
}
