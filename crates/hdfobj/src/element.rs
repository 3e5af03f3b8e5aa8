//! Elemental kinds and the primitive types that map onto them.

use std::fmt;

use hdfobj_format::datatype::{Datatype, DatatypeByteOrder};

use crate::error::{Error, Result};

/// A primitive storage kind: fixed-width integer or IEEE float.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl ElementKind {
    /// Size of one element in bytes.
    pub const fn size(self) -> usize {
        match self {
            ElementKind::I8 | ElementKind::U8 => 1,
            ElementKind::I16 | ElementKind::U16 => 2,
            ElementKind::I32 | ElementKind::U32 | ElementKind::F32 => 4,
            ElementKind::I64 | ElementKind::U64 | ElementKind::F64 => 8,
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self, ElementKind::F32 | ElementKind::F64)
    }

    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            ElementKind::I8 | ElementKind::I16 | ElementKind::I32 | ElementKind::I64
        )
    }

    /// Every kind, narrowest first; integers come before a float of the
    /// same size.
    pub const ALL: [ElementKind; 10] = [
        ElementKind::I8,
        ElementKind::U8,
        ElementKind::I16,
        ElementKind::U16,
        ElementKind::I32,
        ElementKind::U32,
        ElementKind::F32,
        ElementKind::I64,
        ElementKind::U64,
        ElementKind::F64,
    ];

    /// Whether every value of `other` is exactly representable in `self`.
    pub const fn holds(self, other: ElementKind) -> bool {
        match (self.is_float(), other.is_float()) {
            (true, true) => self.size() >= other.size(),
            // f32 holds 24-bit integers exactly, f64 53-bit ones.
            (true, false) => other.size() * 2 <= self.size(),
            (false, true) => false,
            (false, false) => match (self.is_signed(), other.is_signed()) {
                (true, false) => self.size() > other.size(),
                (false, true) => false,
                _ => self.size() >= other.size(),
            },
        }
    }

    /// Datatype of this kind in host byte order.
    pub fn datatype(self) -> Datatype {
        let dt = if self.is_float() {
            Datatype::float(self.size() as u32)
        } else {
            Datatype::integer(self.size() as u32, self.is_signed())
        };
        dt.with_byte_order(DatatypeByteOrder::native())
    }

    /// Kind of a stored datatype, whatever its byte order.
    pub fn from_datatype(dt: Datatype) -> Result<Self> {
        let kind = match dt {
            Datatype::FixedPoint { size, signed, .. } => match (size, signed) {
                (1, true) => ElementKind::I8,
                (2, true) => ElementKind::I16,
                (4, true) => ElementKind::I32,
                (8, true) => ElementKind::I64,
                (1, false) => ElementKind::U8,
                (2, false) => ElementKind::U16,
                (4, false) => ElementKind::U32,
                (8, false) => ElementKind::U64,
                _ => return Err(Error::UnsupportedElementType(dt.to_string())),
            },
            Datatype::FloatingPoint { size: 4, .. } => ElementKind::F32,
            Datatype::FloatingPoint { size: 8, .. } => ElementKind::F64,
            Datatype::FloatingPoint { .. } => {
                return Err(Error::UnsupportedElementType(dt.to_string()))
            }
        };
        Ok(kind)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementKind::I8 => "i8",
            ElementKind::I16 => "i16",
            ElementKind::I32 => "i32",
            ElementKind::I64 => "i64",
            ElementKind::U8 => "u8",
            ElementKind::U16 => "u16",
            ElementKind::U32 => "u32",
            ElementKind::U64 => "u64",
            ElementKind::F32 => "f32",
            ElementKind::F64 => "f64",
        };
        f.write_str(name)
    }
}

/// One field value on its way between a record and storage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl Value {
    /// Exact integer value, if there is one.
    fn as_integer(self) -> Option<i128> {
        match self {
            Value::Int(v) => Some(i128::from(v)),
            Value::UInt(v) => Some(i128::from(v)),
            Value::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 18_446_744_073_709_551_616.0 => {
                Some(f as i128)
            }
            Value::Float(_) => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Value::Int(v) => v as f64,
            Value::UInt(v) => v as f64,
            Value::Float(f) => f,
        }
    }

    fn out_of_range(self, kind: ElementKind) -> Error {
        Error::ValueOutOfRange {
            kind,
            value: self.to_string(),
        }
    }

    /// Append this value as one element of `kind`, host byte order.
    pub(crate) fn encode(self, kind: ElementKind, out: &mut Vec<u8>) -> Result<()> {
        macro_rules! put {
            ($t:ty) => {
                out.extend_from_slice(&<$t as Element>::from_value(self)?.to_ne_bytes())
            };
        }
        match kind {
            ElementKind::I8 => put!(i8),
            ElementKind::I16 => put!(i16),
            ElementKind::I32 => put!(i32),
            ElementKind::I64 => put!(i64),
            ElementKind::U8 => put!(u8),
            ElementKind::U16 => put!(u16),
            ElementKind::U32 => put!(u32),
            ElementKind::U64 => put!(u64),
            ElementKind::F32 => put!(f32),
            ElementKind::F64 => put!(f64),
        }
        Ok(())
    }

    /// Read one element of `kind` in host byte order; `bytes` is exactly
    /// `kind.size()` long.
    pub(crate) fn decode(kind: ElementKind, bytes: &[u8]) -> Value {
        macro_rules! get {
            ($t:ty) => {{
                let mut raw = [0u8; std::mem::size_of::<$t>()];
                raw.copy_from_slice(bytes);
                <$t>::from_ne_bytes(raw).into_value()
            }};
        }
        match kind {
            ElementKind::I8 => get!(i8),
            ElementKind::I16 => get!(i16),
            ElementKind::I32 => get!(i32),
            ElementKind::I64 => get!(i64),
            ElementKind::U8 => get!(u8),
            ElementKind::U16 => get!(u16),
            ElementKind::U32 => get!(u32),
            ElementKind::U64 => get!(u64),
            ElementKind::F32 => get!(f32),
            ElementKind::F64 => get!(f64),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
        }
    }
}

mod private {
    pub trait Sealed {}
}

/// A primitive numeric type with a storage kind.
///
/// Implemented for `i8`..`i64`, `u8`..`u64`, `f32` and `f64`; sealed.
pub trait Element: Copy + private::Sealed + 'static {
    const KIND: ElementKind;

    fn into_value(self) -> Value;

    /// Checked conversion back from a value: integers must fit, floats
    /// going to integers must be integral.
    fn from_value(value: Value) -> Result<Self>;
}

macro_rules! impl_int_element {
    ($($t:ty => $kind:ident, $variant:ident, $wide:ty;)*) => {
        $(
            impl private::Sealed for $t {}

            impl Element for $t {
                const KIND: ElementKind = ElementKind::$kind;

                fn into_value(self) -> Value {
                    Value::$variant(self as $wide)
                }

                fn from_value(value: Value) -> Result<Self> {
                    value
                        .as_integer()
                        .and_then(|v| <$t>::try_from(v).ok())
                        .ok_or_else(|| value.out_of_range(Self::KIND))
                }
            }
        )*
    };
}

impl_int_element! {
    i8 => I8, Int, i64;
    i16 => I16, Int, i64;
    i32 => I32, Int, i64;
    i64 => I64, Int, i64;
    u8 => U8, UInt, u64;
    u16 => U16, UInt, u64;
    u32 => U32, UInt, u64;
    u64 => U64, UInt, u64;
}

impl private::Sealed for f32 {}

impl Element for f32 {
    const KIND: ElementKind = ElementKind::F32;

    fn into_value(self) -> Value {
        Value::Float(f64::from(self))
    }

    fn from_value(value: Value) -> Result<Self> {
        let wide = value.as_f64();
        let narrowed = wide as f32;
        if wide.is_finite() && narrowed.is_infinite() {
            return Err(value.out_of_range(Self::KIND));
        }
        Ok(narrowed)
    }
}

impl private::Sealed for f64 {}

impl Element for f64 {
    const KIND: ElementKind = ElementKind::F64;

    fn into_value(self) -> Value {
        Value::Float(self)
    }

    fn from_value(value: Value) -> Result<Self> {
        Ok(value.as_f64())
    }
}
