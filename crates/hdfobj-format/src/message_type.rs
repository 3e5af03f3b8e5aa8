//! Object header message type identifiers.
//!
//! The numeric ids are the HDF5 ones for the messages this format uses.

/// Recognized header message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Nil,
    Dataspace,
    Datatype,
    Link,
    DataLayout,
    Attribute,
    /// Unknown message type with its raw type ID.
    Unknown(u16),
}

impl MessageType {
    /// Convert a raw u16 type ID to a `MessageType`.
    pub fn from_u16(val: u16) -> MessageType {
        match val {
            0x0000 => MessageType::Nil,
            0x0001 => MessageType::Dataspace,
            0x0003 => MessageType::Datatype,
            0x0006 => MessageType::Link,
            0x0008 => MessageType::DataLayout,
            0x000C => MessageType::Attribute,
            other => MessageType::Unknown(other),
        }
    }

    /// Convert back to the raw u16 type ID.
    pub fn to_u16(self) -> u16 {
        match self {
            MessageType::Nil => 0x0000,
            MessageType::Dataspace => 0x0001,
            MessageType::Datatype => 0x0003,
            MessageType::Link => 0x0006,
            MessageType::DataLayout => 0x0008,
            MessageType::Attribute => 0x000C,
            MessageType::Unknown(v) => v,
        }
    }
}
