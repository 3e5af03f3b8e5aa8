//! Superblock encoding.
//!
//! Layout (32 bytes, immediately at the signature):
//!
//! ```text
//! signature [8] | version u8 | reserved [3] | root address u64
//! | eof address u64 | checksum u32
//! ```
//!
//! Addresses are relative to the signature offset (the base address), so a
//! user block in front of the container does not shift them.

use crate::checksum;
use crate::error::FormatError;
use crate::signature::SIGNATURE;
use crate::{ensure_len, read_u32, read_u64};

/// Current superblock version.
pub const SUPERBLOCK_VERSION: u8 = 0;

/// Encoded size of the superblock including the signature.
pub const SUPERBLOCK_SIZE: usize = 32;

/// Parsed superblock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superblock {
    pub version: u8,
    /// Root group object header address.
    pub root_group_address: u64,
    /// End-of-file address.
    pub eof_address: u64,
}

impl Superblock {
    /// Parse a superblock from `data` starting at `signature_offset`.
    pub fn parse(data: &[u8], signature_offset: usize) -> Result<Superblock, FormatError> {
        ensure_len(data, signature_offset, SUPERBLOCK_SIZE)?;
        let d = &data[signature_offset..signature_offset + SUPERBLOCK_SIZE];

        if d[..8] != SIGNATURE {
            return Err(FormatError::SignatureNotFound);
        }
        let version = d[8];
        if version != SUPERBLOCK_VERSION {
            return Err(FormatError::UnsupportedVersion(version));
        }

        let stored = read_u32(d, 28)?;
        checksum::verify(&d[..28], stored)?;

        Ok(Superblock {
            version,
            root_group_address: read_u64(d, 12)?,
            eof_address: read_u64(d, 20)?,
        })
    }

    /// Serialize the superblock, signature included.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(SUPERBLOCK_SIZE);
        buf.extend_from_slice(&SIGNATURE);
        buf.push(self.version);
        buf.extend_from_slice(&[0u8; 3]);
        buf.extend_from_slice(&self.root_group_address.to_le_bytes());
        buf.extend_from_slice(&self.eof_address.to_le_bytes());
        let checksum = checksum::checksum(&buf);
        buf.extend_from_slice(&checksum.to_le_bytes());
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Superblock {
        Superblock {
            version: SUPERBLOCK_VERSION,
            root_group_address: 0x200,
            eof_address: 0x400,
        }
    }

    #[test]
    fn round_trip() {
        let bytes = sample().serialize();
        assert_eq!(bytes.len(), SUPERBLOCK_SIZE);
        assert_eq!(Superblock::parse(&bytes, 0).unwrap(), sample());
    }

    #[test]
    fn after_user_block() {
        let mut data = vec![0u8; 512];
        data.extend_from_slice(&sample().serialize());
        assert_eq!(Superblock::parse(&data, 512).unwrap(), sample());
    }

    #[test]
    fn unsupported_version() {
        let mut bytes = sample().serialize();
        bytes[8] = 7;
        assert_eq!(
            Superblock::parse(&bytes, 0),
            Err(FormatError::UnsupportedVersion(7))
        );
    }

    #[test]
    fn checksum_detects_corruption() {
        let mut bytes = sample().serialize();
        bytes[13] ^= 0x01;
        assert!(matches!(
            Superblock::parse(&bytes, 0),
            Err(FormatError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn truncated() {
        let bytes = sample().serialize();
        assert!(matches!(
            Superblock::parse(&bytes[..20], 0),
            Err(FormatError::UnexpectedEof { .. })
        ));
    }
}
