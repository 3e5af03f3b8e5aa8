//! Element conversion between memory and stored datatypes.
//!
//! Integers convert to integers only when the value fits. Integers and
//! floats convert to floats, narrowing by rounding. Floats convert to
//! integers only when the value is integral and in range. A finite value
//! that would become infinite in a narrower float overflows.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use hdfobj_format::datatype::{Datatype, DatatypeByteOrder};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Scalar {
    Int(i64),
    UInt(u64),
    Float(f64),
}

fn decode_with<B: ByteOrder>(bytes: &[u8], dt: Datatype) -> Scalar {
    match dt {
        Datatype::FixedPoint { size, signed: true, .. } => {
            Scalar::Int(B::read_int(bytes, size as usize))
        }
        Datatype::FixedPoint { size, signed: false, .. } => {
            Scalar::UInt(B::read_uint(bytes, size as usize))
        }
        Datatype::FloatingPoint { size: 4, .. } => Scalar::Float(f64::from(B::read_f32(bytes))),
        Datatype::FloatingPoint { .. } => Scalar::Float(B::read_f64(bytes)),
    }
}

fn decode(bytes: &[u8], dt: Datatype) -> Scalar {
    match dt.byte_order() {
        DatatypeByteOrder::LittleEndian => decode_with::<LittleEndian>(bytes, dt),
        DatatypeByteOrder::BigEndian => decode_with::<BigEndian>(bytes, dt),
    }
}

fn int_bounds(size: u32, signed: bool) -> (i128, i128) {
    let bits = size * 8;
    if signed {
        (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
    } else {
        (0, (1i128 << bits) - 1)
    }
}

/// Integer value of a scalar, or `None` if it is not an integer.
fn integral(value: Scalar) -> Option<i128> {
    match value {
        Scalar::Int(v) => Some(i128::from(v)),
        Scalar::UInt(v) => Some(i128::from(v)),
        // 2^64 bounds every representable fixed-point value.
        Scalar::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 18_446_744_073_709_551_616.0 => {
            Some(f as i128)
        }
        Scalar::Float(_) => None,
    }
}

fn encode_with<B: ByteOrder>(value: Scalar, dt: Datatype, out: &mut [u8]) -> bool {
    match dt {
        Datatype::FixedPoint { size, signed, .. } => {
            let (min, max) = int_bounds(size, signed);
            let Some(v) = integral(value) else {
                return false;
            };
            if v < min || v > max {
                return false;
            }
            if signed {
                B::write_int(out, v as i64, size as usize);
            } else {
                B::write_uint(out, v as u64, size as usize);
            }
            true
        }
        Datatype::FloatingPoint { size, .. } => {
            let f = match value {
                Scalar::Int(v) => v as f64,
                Scalar::UInt(v) => v as f64,
                Scalar::Float(f) => f,
            };
            if size == 4 {
                let narrowed = f as f32;
                if f.is_finite() && narrowed.is_infinite() {
                    return false;
                }
                B::write_f32(out, narrowed);
            } else {
                B::write_f64(out, f);
            }
            true
        }
    }
}

fn encode(value: Scalar, dt: Datatype, out: &mut [u8]) -> bool {
    match dt.byte_order() {
        DatatypeByteOrder::LittleEndian => encode_with::<LittleEndian>(value, dt, out),
        DatatypeByteOrder::BigEndian => encode_with::<BigEndian>(value, dt, out),
    }
}

/// Convert a packed buffer of `from` elements into `to` elements.
///
/// `src.len()` must be a multiple of `from.size()`. Nothing is returned on
/// failure, so callers never observe a partly converted buffer.
pub fn convert(src: &[u8], from: Datatype, to: Datatype) -> Result<Vec<u8>, EngineError> {
    if from == to {
        return Ok(src.to_vec());
    }
    let in_size = from.size() as usize;
    let out_size = to.size() as usize;
    let count = src.len() / in_size;
    let mut out = vec![0u8; count * out_size];
    for (input, output) in src.chunks_exact(in_size).zip(out.chunks_exact_mut(out_size)) {
        if !encode(decode(input, from), to, output) {
            return Err(EngineError::ConversionOverflow { from, to });
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn i32_le() -> Datatype {
        Datatype::integer(4, true)
    }

    #[test]
    fn identity_is_a_copy() {
        let src = [1u8, 2, 3, 4];
        assert_eq!(convert(&src, i32_le(), i32_le()).unwrap(), src.to_vec());
    }

    #[test]
    fn widen_signed() {
        let src: Vec<u8> = [-5i16, 300].iter().flat_map(|v| v.to_le_bytes()).collect();
        let out = convert(&src, Datatype::integer(2, true), Datatype::integer(8, true)).unwrap();
        assert_eq!(&out[..8], &(-5i64).to_le_bytes());
        assert_eq!(&out[8..], &300i64.to_le_bytes());
    }

    #[test]
    fn narrowing_out_of_range_fails() {
        let src = 300i32.to_le_bytes();
        assert!(matches!(
            convert(&src, i32_le(), Datatype::integer(1, false)),
            Err(EngineError::ConversionOverflow { .. })
        ));
    }

    #[test]
    fn negative_to_unsigned_fails() {
        let src = (-1i32).to_le_bytes();
        assert!(convert(&src, i32_le(), Datatype::integer(4, false)).is_err());
    }

    #[test]
    fn u64_max_to_i64_fails() {
        let src = u64::MAX.to_le_bytes();
        assert!(convert(&src, Datatype::integer(8, false), Datatype::integer(8, true)).is_err());
    }

    #[test]
    fn int_to_float() {
        let src = 7i32.to_le_bytes();
        let out = convert(&src, i32_le(), Datatype::float(8)).unwrap();
        assert_eq!(out, 7.0f64.to_le_bytes().to_vec());
    }

    #[test]
    fn integral_float_to_int() {
        let src = (-3.0f64).to_le_bytes();
        let out = convert(&src, Datatype::float(8), i32_le()).unwrap();
        assert_eq!(out, (-3i32).to_le_bytes().to_vec());
    }

    #[test]
    fn fractional_float_to_int_fails() {
        let src = 2.5f32.to_le_bytes();
        assert!(convert(&src, Datatype::float(4), i32_le()).is_err());
    }

    #[test]
    fn nan_to_int_fails() {
        let src = f64::NAN.to_le_bytes();
        assert!(convert(&src, Datatype::float(8), Datatype::integer(8, true)).is_err());
    }

    #[test]
    fn f64_to_f32_rounds() {
        let src = 0.1f64.to_le_bytes();
        let out = convert(&src, Datatype::float(8), Datatype::float(4)).unwrap();
        assert_eq!(out, 0.1f32.to_le_bytes().to_vec());
    }

    #[test]
    fn f64_to_f32_overflow_fails() {
        let src = 1e300f64.to_le_bytes();
        assert!(convert(&src, Datatype::float(8), Datatype::float(4)).is_err());
    }

    #[test]
    fn infinity_survives_narrowing() {
        let src = f64::INFINITY.to_le_bytes();
        let out = convert(&src, Datatype::float(8), Datatype::float(4)).unwrap();
        assert_eq!(out, f32::INFINITY.to_le_bytes().to_vec());
    }

    #[test]
    fn byte_order_swap() {
        let src = 0x0102_0304i32.to_le_bytes();
        let be = i32_le().with_byte_order(DatatypeByteOrder::BigEndian);
        let out = convert(&src, i32_le(), be).unwrap();
        assert_eq!(out, vec![1, 2, 3, 4]);
        assert_eq!(convert(&out, be, i32_le()).unwrap(), src.to_vec());
    }
}
