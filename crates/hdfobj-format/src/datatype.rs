//! Datatype message encoding (message type 0x0003).
//!
//! Only the two numeric HDF5 classes are representable: fixed-point
//! (class 0) and IEEE floating-point (class 1). The byte layout follows the
//! HDF5 datatype message: a class/version byte, a 24-bit class bit field,
//! a 4-byte element size, then the class properties.

use std::fmt;

use crate::error::FormatError;
use crate::{ensure_len, read_u16, read_u32};

const CLASS_FIXED_POINT: u8 = 0;
const CLASS_FLOATING_POINT: u8 = 1;
const DATATYPE_VERSION: u8 = 1;

/// Byte order of numeric data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatatypeByteOrder {
    LittleEndian,
    BigEndian,
}

impl DatatypeByteOrder {
    /// The byte order of the running host.
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            DatatypeByteOrder::BigEndian
        } else {
            DatatypeByteOrder::LittleEndian
        }
    }
}

/// A stored element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Datatype {
    /// Class 0: two's-complement or unsigned integer of 1, 2, 4 or 8 bytes.
    FixedPoint {
        size: u32,
        byte_order: DatatypeByteOrder,
        signed: bool,
    },
    /// Class 1: IEEE 754 binary32 or binary64.
    FloatingPoint {
        size: u32,
        byte_order: DatatypeByteOrder,
    },
}

/// IEEE layout parameters: (exponent location, exponent size, mantissa size, bias).
fn ieee_params(size: u32) -> Option<(u8, u8, u8, u32)> {
    match size {
        4 => Some((23, 8, 23, 127)),
        8 => Some((52, 11, 52, 1023)),
        _ => None,
    }
}

impl Datatype {
    /// Little-endian integer of `size` bytes.
    pub const fn integer(size: u32, signed: bool) -> Self {
        Datatype::FixedPoint {
            size,
            byte_order: DatatypeByteOrder::LittleEndian,
            signed,
        }
    }

    /// Little-endian IEEE float of `size` bytes.
    pub const fn float(size: u32) -> Self {
        Datatype::FloatingPoint {
            size,
            byte_order: DatatypeByteOrder::LittleEndian,
        }
    }

    /// Return the size in bytes of one element of this type.
    pub fn size(&self) -> u32 {
        match self {
            Datatype::FixedPoint { size, .. } | Datatype::FloatingPoint { size, .. } => *size,
        }
    }

    /// Byte order of stored elements.
    pub fn byte_order(&self) -> DatatypeByteOrder {
        match self {
            Datatype::FixedPoint { byte_order, .. }
            | Datatype::FloatingPoint { byte_order, .. } => *byte_order,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Datatype::FloatingPoint { .. })
    }

    /// Same type with a different byte order.
    pub fn with_byte_order(self, order: DatatypeByteOrder) -> Self {
        match self {
            Datatype::FixedPoint { size, signed, .. } => Datatype::FixedPoint {
                size,
                byte_order: order,
                signed,
            },
            Datatype::FloatingPoint { size, .. } => Datatype::FloatingPoint {
                size,
                byte_order: order,
            },
        }
    }

    /// Parse a datatype message from raw bytes.
    ///
    /// Returns `(Datatype, bytes_consumed)` so callers embedding a datatype
    /// inside another message can continue after it.
    pub fn parse(data: &[u8]) -> Result<(Datatype, usize), FormatError> {
        ensure_len(data, 0, 8)?;

        let class_id = data[0] & 0x0F;
        let bf0 = data[1];
        let size = read_u32(data, 4)?;
        let byte_order = if bf0 & 0x01 == 0 {
            DatatypeByteOrder::LittleEndian
        } else {
            DatatypeByteOrder::BigEndian
        };

        match class_id {
            CLASS_FIXED_POINT => {
                let bit_offset = read_u16(data, 8)?;
                let bit_precision = read_u16(data, 10)?;
                if !matches!(size, 1 | 2 | 4 | 8)
                    || bit_offset != 0
                    || u32::from(bit_precision) != size * 8
                {
                    return Err(FormatError::UnsupportedDatatype(format!(
                        "fixed-point size {size}, offset {bit_offset}, precision {bit_precision}"
                    )));
                }
                let signed = (bf0 >> 3) & 0x01 == 1;
                Ok((
                    Datatype::FixedPoint {
                        size,
                        byte_order,
                        signed,
                    },
                    12,
                ))
            }
            CLASS_FLOATING_POINT => {
                ensure_len(data, 8, 12)?;
                if (bf0 >> 6) & 0x01 == 1 {
                    return Err(FormatError::UnsupportedDatatype(
                        "VAX floating-point byte order".into(),
                    ));
                }
                let (exp_loc, exp_size, mant_size, bias) = ieee_params(size).ok_or_else(|| {
                    FormatError::UnsupportedDatatype(format!("floating-point size {size}"))
                })?;
                let stored = (data[12], data[13], data[15], read_u32(data, 16)?);
                if stored != (exp_loc, exp_size, mant_size, bias) {
                    return Err(FormatError::UnsupportedDatatype(format!(
                        "non-IEEE floating-point layout for size {size}"
                    )));
                }
                Ok((Datatype::FloatingPoint { size, byte_order }, 20))
            }
            other => Err(FormatError::InvalidDatatypeClass(other)),
        }
    }

    /// Serialize datatype to message bytes.
    pub fn serialize(&self) -> Vec<u8> {
        match *self {
            Datatype::FixedPoint {
                size,
                byte_order,
                signed,
            } => {
                let mut bf0 = 0u8;
                if byte_order == DatatypeByteOrder::BigEndian {
                    bf0 |= 0x01;
                }
                if signed {
                    bf0 |= 0x08;
                }
                let mut buf = build_header(CLASS_FIXED_POINT, [bf0, 0, 0], size);
                buf.extend_from_slice(&0u16.to_le_bytes());
                buf.extend_from_slice(&((size * 8) as u16).to_le_bytes());
                buf
            }
            Datatype::FloatingPoint { size, byte_order } => {
                // Mantissa normalization: implied MSB (bits 4-5 = 2).
                let mut bf0 = 0x20u8;
                if byte_order == DatatypeByteOrder::BigEndian {
                    bf0 |= 0x01;
                }
                let sign_location = (size * 8 - 1) as u8;
                let (exp_loc, exp_size, mant_size, bias) =
                    ieee_params(size).unwrap_or((0, 0, 0, 0));
                let mut buf = build_header(CLASS_FLOATING_POINT, [bf0, sign_location, 0], size);
                buf.extend_from_slice(&0u16.to_le_bytes());
                buf.extend_from_slice(&((size * 8) as u16).to_le_bytes());
                buf.push(exp_loc);
                buf.push(exp_size);
                buf.push(0);
                buf.push(mant_size);
                buf.extend_from_slice(&bias.to_le_bytes());
                buf
            }
        }
    }
}

fn build_header(class: u8, bf: [u8; 3], size: u32) -> Vec<u8> {
    let mut buf = vec![0u8; 8];
    buf[0] = (class & 0x0F) | (DATATYPE_VERSION << 4);
    buf[1] = bf[0];
    buf[2] = bf[1];
    buf[3] = bf[2];
    buf[4..8].copy_from_slice(&size.to_le_bytes());
    buf
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datatype::FixedPoint { size, signed, .. } => {
                write!(f, "{}{}", if *signed { "i" } else { "u" }, size * 8)?
            }
            Datatype::FloatingPoint { size, .. } => write!(f, "f{}", size * 8)?,
        }
        if self.byte_order() == DatatypeByteOrder::BigEndian {
            write!(f, "be")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_point_round_trip() {
        for size in [1, 2, 4, 8] {
            for signed in [true, false] {
                let dt = Datatype::integer(size, signed);
                let bytes = dt.serialize();
                assert_eq!(bytes.len(), 12);
                let (parsed, consumed) = Datatype::parse(&bytes).unwrap();
                assert_eq!(parsed, dt);
                assert_eq!(consumed, 12);
            }
        }
    }

    #[test]
    fn float_round_trip() {
        for size in [4, 8] {
            let dt = Datatype::float(size);
            let bytes = dt.serialize();
            let (parsed, consumed) = Datatype::parse(&bytes).unwrap();
            assert_eq!(parsed, dt);
            assert_eq!(consumed, 20);
        }
    }

    #[test]
    fn big_endian_flag_preserved() {
        let dt = Datatype::float(8).with_byte_order(DatatypeByteOrder::BigEndian);
        let (parsed, _) = Datatype::parse(&dt.serialize()).unwrap();
        assert_eq!(parsed.byte_order(), DatatypeByteOrder::BigEndian);
        assert_eq!(parsed.to_string(), "f64be");
    }

    #[test]
    fn f32_header_layout() {
        let bytes = Datatype::float(4).serialize();
        assert_eq!(bytes[0], 0x11); // class 1, version 1
        assert_eq!(bytes[2], 31); // sign bit location
        assert_eq!(&bytes[4..8], &4u32.to_le_bytes());
    }

    #[test]
    fn odd_integer_size_rejected() {
        let mut bytes = Datatype::integer(4, true).serialize();
        bytes[4..8].copy_from_slice(&3u32.to_le_bytes());
        bytes[10..12].copy_from_slice(&24u16.to_le_bytes());
        assert!(matches!(
            Datatype::parse(&bytes),
            Err(FormatError::UnsupportedDatatype(_))
        ));
    }

    #[test]
    fn half_float_rejected() {
        let mut bytes = Datatype::float(4).serialize();
        bytes[4..8].copy_from_slice(&2u32.to_le_bytes());
        assert!(matches!(
            Datatype::parse(&bytes),
            Err(FormatError::UnsupportedDatatype(_))
        ));
    }

    #[test]
    fn string_class_rejected() {
        let mut bytes = Datatype::integer(4, true).serialize();
        bytes[0] = 0x13;
        assert_eq!(
            Datatype::parse(&bytes),
            Err(FormatError::InvalidDatatypeClass(3))
        );
    }

    #[test]
    fn truncated() {
        assert!(matches!(
            Datatype::parse(&[0x10, 0, 0]),
            Err(FormatError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn display() {
        assert_eq!(Datatype::integer(4, true).to_string(), "i32");
        assert_eq!(Datatype::integer(1, false).to_string(), "u8");
        assert_eq!(Datatype::float(8).to_string(), "f64");
    }
}
