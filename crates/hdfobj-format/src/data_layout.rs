//! Data layout message encoding (message type 0x0008).
//!
//! Only contiguous storage exists: one raw data block per dataset.

use crate::error::FormatError;
use crate::message_type::MessageType;
use crate::{ensure_len, read_u64};

const LAYOUT_VERSION: u8 = 3;
const LAYOUT_CLASS_CONTIGUOUS: u8 = 1;

/// Location of a dataset's contiguous raw data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataLayout {
    /// Address of the first byte, relative to the base address.
    pub address: u64,
    /// Size of the block in bytes.
    pub size: u64,
}

impl DataLayout {
    pub fn parse(data: &[u8]) -> Result<Self, FormatError> {
        ensure_len(data, 0, 18)?;
        if data[0] != LAYOUT_VERSION {
            return Err(FormatError::InvalidMessageVersion {
                message: MessageType::DataLayout,
                version: data[0],
            });
        }
        if data[1] != LAYOUT_CLASS_CONTIGUOUS {
            return Err(FormatError::UnsupportedMessage(MessageType::DataLayout.to_u16()));
        }
        Ok(Self {
            address: read_u64(data, 2)?,
            size: read_u64(data, 10)?,
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(18);
        buf.push(LAYOUT_VERSION);
        buf.push(LAYOUT_CLASS_CONTIGUOUS);
        buf.extend_from_slice(&self.address.to_le_bytes());
        buf.extend_from_slice(&self.size.to_le_bytes());
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let layout = DataLayout {
            address: 4096,
            size: 240,
        };
        let bytes = layout.serialize();
        assert_eq!(bytes.len(), 18);
        assert_eq!(DataLayout::parse(&bytes).unwrap(), layout);
    }

    #[test]
    fn chunked_class_rejected() {
        let mut bytes = DataLayout { address: 0, size: 0 }.serialize();
        bytes[1] = 2;
        assert_eq!(
            DataLayout::parse(&bytes),
            Err(FormatError::UnsupportedMessage(0x0008))
        );
    }
}
