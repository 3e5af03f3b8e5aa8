//! Link message encoding (message type 0x0006).
//!
//! Every member of a group is one hard link: a name and the address of the
//! member's object header.

use crate::error::FormatError;
use crate::message_type::MessageType;
use crate::{ensure_len, read_u16, read_u64};

const LINK_VERSION: u8 = 1;

/// A hard link from a group to a child object header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMessage {
    /// Link name within the parent group.
    pub name: String,
    /// Address of the target object header, relative to the base address.
    pub address: u64,
}

impl LinkMessage {
    pub fn parse(data: &[u8]) -> Result<Self, FormatError> {
        ensure_len(data, 0, 3)?;
        if data[0] != LINK_VERSION {
            return Err(FormatError::InvalidMessageVersion {
                message: MessageType::Link,
                version: data[0],
            });
        }
        let name_len = read_u16(data, 1)? as usize;
        ensure_len(data, 3, name_len)?;
        let name = std::str::from_utf8(&data[3..3 + name_len])
            .map_err(|_| FormatError::InvalidName)?
            .to_string();
        let address = read_u64(data, 3 + name_len)?;
        Ok(Self { name, address })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(11 + self.name.len());
        buf.push(LINK_VERSION);
        buf.extend_from_slice(&(self.name.len() as u16).to_le_bytes());
        buf.extend_from_slice(self.name.as_bytes());
        buf.extend_from_slice(&self.address.to_le_bytes());
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let link = LinkMessage {
            name: "test-group".into(),
            address: 0x1234,
        };
        assert_eq!(LinkMessage::parse(&link.serialize()).unwrap(), link);
    }

    #[test]
    fn utf8_name() {
        let link = LinkMessage {
            name: "température".into(),
            address: 64,
        };
        assert_eq!(LinkMessage::parse(&link.serialize()).unwrap(), link);
    }

    #[test]
    fn invalid_utf8() {
        let mut bytes = LinkMessage {
            name: "ab".into(),
            address: 0,
        }
        .serialize();
        bytes[3] = 0xFF;
        assert_eq!(LinkMessage::parse(&bytes), Err(FormatError::InvalidName));
    }

    #[test]
    fn truncated_address() {
        let bytes = LinkMessage {
            name: "x".into(),
            address: 8,
        }
        .serialize();
        assert!(matches!(
            LinkMessage::parse(&bytes[..6]),
            Err(FormatError::UnexpectedEof { .. })
        ));
    }
}
