//! Container format for hdfobj files.
//!
//! A file is a signature and superblock followed by object headers and
//! contiguous raw data blocks. Header messages reuse the HDF5 message ids
//! and the HDF5 datatype/dataspace encodings, so the layout reads like a
//! trimmed-down HDF5 file.
//!
//! [`image::FileImage`] is the in-memory object tree that is parsed from and
//! serialized back to those bytes.

pub mod attribute;
pub mod checksum;
pub mod data_layout;
pub mod dataspace;
pub mod datatype;
pub mod error;
pub mod image;
pub mod link_message;
pub mod message_type;
pub mod object_header;
pub mod signature;
pub mod superblock;

pub use error::FormatError;
pub use image::{FileImage, Node, NodeData, NodeId, Reclaimed};

use byteorder::{ByteOrder, LittleEndian};

pub(crate) fn ensure_len(data: &[u8], offset: usize, needed: usize) -> Result<(), FormatError> {
    if offset + needed > data.len() {
        Err(FormatError::UnexpectedEof {
            expected: offset + needed,
            available: data.len(),
        })
    } else {
        Ok(())
    }
}

pub(crate) fn read_u16(data: &[u8], pos: usize) -> Result<u16, FormatError> {
    ensure_len(data, pos, 2)?;
    Ok(LittleEndian::read_u16(&data[pos..pos + 2]))
}

pub(crate) fn read_u32(data: &[u8], pos: usize) -> Result<u32, FormatError> {
    ensure_len(data, pos, 4)?;
    Ok(LittleEndian::read_u32(&data[pos..pos + 4]))
}

pub(crate) fn read_u64(data: &[u8], pos: usize) -> Result<u64, FormatError> {
    ensure_len(data, pos, 8)?;
    Ok(LittleEndian::read_u64(&data[pos..pos + 8]))
}
