//! Attribute message encoding (message type 0x000C).
//!
//! Attributes carry their value inline in the object header: name,
//! datatype, dataspace and raw element bytes, in the order HDF5 uses for
//! version 3 attribute messages.

use crate::dataspace::Dataspace;
use crate::datatype::Datatype;
use crate::error::FormatError;
use crate::message_type::MessageType;
use crate::{ensure_len, read_u16};

const ATTRIBUTE_VERSION: u8 = 3;
const CHARSET_UTF8: u8 = 1;

/// A named, typed, shaped value attached to a group or dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMessage {
    pub name: String,
    pub datatype: Datatype,
    pub dataspace: Dataspace,
    /// Raw element bytes in `datatype`'s byte order.
    pub data: Vec<u8>,
}

impl AttributeMessage {
    /// New attribute whose value is all zero bytes.
    pub fn zeroed(name: &str, datatype: Datatype, dataspace: Dataspace) -> Result<Self, FormatError> {
        let data = dataspace.zeroed_data(datatype.size())?;
        Ok(Self {
            name: name.to_string(),
            datatype,
            dataspace,
            data,
        })
    }

    pub fn parse(data: &[u8]) -> Result<Self, FormatError> {
        ensure_len(data, 0, 9)?;
        if data[0] != ATTRIBUTE_VERSION {
            return Err(FormatError::InvalidMessageVersion {
                message: MessageType::Attribute,
                version: data[0],
            });
        }
        let name_size = read_u16(data, 2)? as usize;
        let datatype_size = read_u16(data, 4)? as usize;
        let dataspace_size = read_u16(data, 6)? as usize;
        let mut pos = 9;

        ensure_len(data, pos, name_size)?;
        // Name is stored NUL-terminated; the size includes the terminator.
        let raw_name = &data[pos..pos + name_size];
        let raw_name = raw_name.strip_suffix(&[0]).unwrap_or(raw_name);
        let name = std::str::from_utf8(raw_name)
            .map_err(|_| FormatError::InvalidName)?
            .to_string();
        pos += name_size;

        ensure_len(data, pos, datatype_size)?;
        let (datatype, _) = Datatype::parse(&data[pos..pos + datatype_size])?;
        pos += datatype_size;

        ensure_len(data, pos, dataspace_size)?;
        let dataspace = Dataspace::parse(&data[pos..pos + dataspace_size])?;
        pos += dataspace_size;

        let expected = dataspace.data_size(datatype.size())? as u64;
        let actual = (data.len() - pos) as u64;
        if expected != actual {
            return Err(FormatError::DataSizeMismatch { expected, actual });
        }

        Ok(Self {
            name,
            datatype,
            dataspace,
            data: data[pos..].to_vec(),
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let dt = self.datatype.serialize();
        let ds = self.dataspace.serialize();
        let name_size = self.name.len() + 1;

        let mut buf = Vec::with_capacity(9 + name_size + dt.len() + ds.len() + self.data.len());
        buf.push(ATTRIBUTE_VERSION);
        buf.push(0); // flags
        buf.extend_from_slice(&(name_size as u16).to_le_bytes());
        buf.extend_from_slice(&(dt.len() as u16).to_le_bytes());
        buf.extend_from_slice(&(ds.len() as u16).to_le_bytes());
        buf.push(CHARSET_UTF8);
        buf.extend_from_slice(self.name.as_bytes());
        buf.push(0);
        buf.extend_from_slice(&dt);
        buf.extend_from_slice(&ds);
        buf.extend_from_slice(&self.data);
        buf
    }
}
