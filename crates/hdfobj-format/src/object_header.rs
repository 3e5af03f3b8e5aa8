//! Object header encoding.
//!
//! Layout:
//!
//! ```text
//! "OHDR" | version u8 | kind u8 | message count u16
//! { type u16 | flags u8 | size u32 | payload }*
//! checksum u32  (CRC-32C of everything above)
//! ```

use crate::checksum;
use crate::error::FormatError;
use crate::message_type::MessageType;
use crate::{ensure_len, read_u16, read_u32};

/// OHDR signature for object headers.
const OHDR_SIGNATURE: [u8; 4] = [b'O', b'H', b'D', b'R'];

const OHDR_VERSION: u8 = 1;

/// Message flag: a reader that does not know the message type must fail.
pub const MSG_FLAG_MUST_UNDERSTAND: u8 = 0x08;

/// Whether an object header describes a group or a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Group,
    Dataset,
}

/// A single header message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMessage {
    pub msg_type: MessageType,
    pub flags: u8,
    /// Raw message data bytes.
    pub data: Vec<u8>,
}

/// Parsed or under-construction object header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHeader {
    pub kind: ObjectKind,
    /// All non-NIL messages in storage order.
    pub messages: Vec<HeaderMessage>,
}

impl ObjectHeader {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            messages: Vec::new(),
        }
    }

    /// Add a message with default flags (0).
    pub fn add_message(&mut self, msg_type: MessageType, data: Vec<u8>) {
        self.messages.push(HeaderMessage {
            msg_type,
            flags: 0,
            data,
        });
    }

    /// First message of the given type.
    pub fn find(&self, msg_type: MessageType) -> Option<&HeaderMessage> {
        self.messages.iter().find(|m| m.msg_type == msg_type)
    }

    /// First message of the given type, or `MissingMessage`.
    pub fn require(&self, msg_type: MessageType) -> Result<&HeaderMessage, FormatError> {
        self.find(msg_type)
            .ok_or(FormatError::MissingMessage(msg_type))
    }

    /// All messages of the given type.
    pub fn messages_of(&self, msg_type: MessageType) -> impl Iterator<Item = &HeaderMessage> {
        self.messages.iter().filter(move |m| m.msg_type == msg_type)
    }

    /// Parse an object header starting at `offset` in `data`.
    ///
    /// `address` is only used for diagnostics.
    pub fn parse(data: &[u8], offset: usize, address: u64) -> Result<Self, FormatError> {
        ensure_len(data, offset, 8)?;
        let d = &data[offset..];
        if d[..4] != OHDR_SIGNATURE {
            return Err(FormatError::InvalidObjectHeaderSignature(address));
        }
        if d[4] != OHDR_VERSION {
            return Err(FormatError::InvalidObjectHeaderVersion(d[4]));
        }
        let kind = match d[5] {
            0 => ObjectKind::Group,
            1 => ObjectKind::Dataset,
            other => return Err(FormatError::InvalidObjectKind(other)),
        };
        let count = read_u16(d, 6)? as usize;

        let mut pos = 8;
        let mut messages = Vec::with_capacity(count);
        for _ in 0..count {
            ensure_len(d, pos, 7)?;
            let msg_type = MessageType::from_u16(read_u16(d, pos)?);
            let flags = d[pos + 2];
            let size = read_u32(d, pos + 3)? as usize;
            pos += 7;
            ensure_len(d, pos, size)?;
            let payload = &d[pos..pos + size];
            pos += size;

            match msg_type {
                MessageType::Nil => {}
                MessageType::Unknown(id) if flags & MSG_FLAG_MUST_UNDERSTAND != 0 => {
                    return Err(FormatError::UnsupportedMessage(id));
                }
                _ => messages.push(HeaderMessage {
                    msg_type,
                    flags,
                    data: payload.to_vec(),
                }),
            }
        }

        let stored = read_u32(d, pos)?;
        checksum::verify(&d[..pos], stored)?;

        Ok(Self { kind, messages })
    }

    /// Serialize the complete header (OHDR + messages + checksum).
    pub fn serialize(&self) -> Vec<u8> {
        let msg_bytes: usize = self.messages.iter().map(|m| 7 + m.data.len()).sum();
        let mut buf = Vec::with_capacity(8 + msg_bytes + 4);

        buf.extend_from_slice(&OHDR_SIGNATURE);
        buf.push(OHDR_VERSION);
        buf.push(match self.kind {
            ObjectKind::Group => 0,
            ObjectKind::Dataset => 1,
        });
        buf.extend_from_slice(&(self.messages.len() as u16).to_le_bytes());

        for msg in &self.messages {
            buf.extend_from_slice(&msg.msg_type.to_u16().to_le_bytes());
            buf.push(msg.flags);
            buf.extend_from_slice(&(msg.data.len() as u32).to_le_bytes());
            buf.extend_from_slice(&msg.data);
        }

        let checksum = checksum::checksum(&buf);
        buf.extend_from_slice(&checksum.to_le_bytes());
        buf
    }
}
