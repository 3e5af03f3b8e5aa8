//! Error types for container format parsing.

use thiserror::Error;

use crate::message_type::MessageType;

/// Errors that can occur when parsing or validating container structures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The magic signature was not found at any valid offset.
    #[error("container signature not found at any valid offset")]
    SignatureNotFound,
    /// The superblock version is not supported.
    #[error("unsupported superblock version: {0}")]
    UnsupportedVersion(u8),
    /// Unexpected end of data.
    #[error("unexpected EOF: need {expected} bytes, have {available}")]
    UnexpectedEof {
        /// Number of bytes expected.
        expected: usize,
        /// Number of bytes actually available.
        available: usize,
    },
    /// Object header at the given address does not start with `OHDR`.
    #[error("invalid object header signature at {0:#x}")]
    InvalidObjectHeaderSignature(u64),
    /// Invalid object header version.
    #[error("invalid object header version: {0}")]
    InvalidObjectHeaderVersion(u8),
    /// Object kind byte is neither group nor dataset.
    #[error("invalid object kind: {0}")]
    InvalidObjectKind(u8),
    /// CRC-32C checksum mismatch.
    #[error("checksum mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// The checksum stored in the file.
        expected: u32,
        /// The checksum we computed.
        computed: u32,
    },
    /// Datatype class other than fixed-point or floating-point.
    #[error("invalid datatype class: {0}")]
    InvalidDatatypeClass(u8),
    /// Datatype class is known but its size or layout is not.
    #[error("unsupported datatype: {0}")]
    UnsupportedDatatype(String),
    /// Invalid dataspace message version.
    #[error("invalid dataspace version: {0}")]
    InvalidDataspaceVersion(u8),
    /// Invalid dataspace type byte.
    #[error("invalid dataspace type: {0}")]
    InvalidDataspaceType(u8),
    /// Invalid version byte in a link, layout or attribute message.
    #[error("invalid {message:?} message version: {version}")]
    InvalidMessageVersion {
        /// Message the version belongs to.
        message: MessageType,
        /// The version byte found.
        version: u8,
    },
    /// A required header message was not found.
    #[error("missing required message: {0:?}")]
    MissingMessage(MessageType),
    /// Unknown message type that is marked as must-understand.
    #[error("unsupported message type {0:#06x} marked as must-understand")]
    UnsupportedMessage(u16),
    /// An address points outside the file.
    #[error("address {address:#x} lies outside the file (eof {eof:#x})")]
    AddressOutOfBounds {
        /// The offending address.
        address: u64,
        /// End-of-file address.
        eof: u64,
    },
    /// Raw data block length disagrees with dataspace × datatype size.
    #[error("raw data size mismatch: expected {expected} bytes, got {actual}")]
    DataSizeMismatch {
        /// Bytes implied by the dataspace and datatype.
        expected: u64,
        /// Bytes actually stored.
        actual: u64,
    },
    /// A link or attribute name is not valid UTF-8.
    #[error("invalid name encoding")]
    InvalidName,
    /// An extent whose element or byte count cannot be addressed.
    #[error("extent {0:?} is too large to address")]
    ExtentTooLarge(Vec<u64>),
    /// A dataspace has more dimensions than [`MAX_RANK`](crate::dataspace::MAX_RANK).
    #[error("dataspace rank {0} exceeds the maximum of 32")]
    RankTooLarge(usize),
    /// A group links back to one of its own ancestors.
    #[error("link cycle through object header at {0:#x}")]
    LinkCycle(u64),
}
