//! Type descriptors: how an in-memory record maps to storage elements.
//!
//! A record is either one atomic element or a flattened aggregate of K
//! atomic fields. An aggregate is stored as K consecutive elements of a
//! single storage kind; when the fields' kinds differ, the storage kind is
//! the narrowest kind that holds every field kind exactly.

use std::sync::Arc;

use crate::element::{Element, ElementKind, Value};
use crate::error::{Error, Result};

/// One field of a flattened aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: ElementKind,
    /// Byte offset of the field inside one in-memory record.
    pub offset: usize,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: ElementKind, offset: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            offset,
        }
    }
}

/// Storage layout of one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    /// One record is one element of this kind.
    Atomic(ElementKind),
    /// One record is `fields.len()` consecutive elements of `storage`.
    FlattenedAggregate {
        storage: ElementKind,
        fields: Arc<[FieldDescriptor]>,
        /// Size of one in-memory record in bytes.
        record_size: usize,
    },
}

impl TypeDescriptor {
    /// Build an aggregate descriptor from its fields in declaration order.
    ///
    /// Fails with `UnsupportedElementType` when there are no fields or when
    /// no single kind represents every field kind exactly.
    pub fn aggregate(fields: Vec<FieldDescriptor>, record_size: usize) -> Result<Self> {
        let kinds: Vec<_> = fields.iter().map(|f| f.kind).collect();
        if kinds.is_empty() {
            return Err(Error::UnsupportedElementType(
                "aggregate record with no fields".into(),
            ));
        }
        let storage = common_kind(&kinds).ok_or_else(|| {
            let listed: Vec<_> = kinds.iter().map(ToString::to_string).collect();
            Error::UnsupportedElementType(format!(
                "no storage kind holds all of {} exactly",
                listed.join(", ")
            ))
        })?;
        Ok(TypeDescriptor::FlattenedAggregate {
            storage,
            fields: fields.into(),
            record_size,
        })
    }

    /// Number of storage elements per record (K).
    pub fn arity(&self) -> usize {
        match self {
            TypeDescriptor::Atomic(_) => 1,
            TypeDescriptor::FlattenedAggregate { fields, .. } => fields.len(),
        }
    }

    /// Kind every element of this record is stored as.
    pub fn storage_kind(&self) -> ElementKind {
        match self {
            TypeDescriptor::Atomic(kind) => *kind,
            TypeDescriptor::FlattenedAggregate { storage, .. } => *storage,
        }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        match self {
            TypeDescriptor::Atomic(_) => &[],
            TypeDescriptor::FlattenedAggregate { fields, .. } => fields,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, TypeDescriptor::FlattenedAggregate { .. })
    }

    /// Size of one in-memory record in bytes.
    pub fn record_size(&self) -> usize {
        match self {
            TypeDescriptor::Atomic(kind) => kind.size(),
            TypeDescriptor::FlattenedAggregate { record_size, .. } => *record_size,
        }
    }
}

/// Narrowest kind that represents every value of every kind in `kinds`
/// exactly, or `None` when no kind does.
///
/// The whole set is considered at once: `(u16, i8, f32)` stores as `f32`
/// even though `u16` and `i8` alone would need `i32`. Between an integer
/// and a float of the same size the integer wins.
pub fn common_kind(kinds: &[ElementKind]) -> Option<ElementKind> {
    if kinds.is_empty() {
        return None;
    }
    ElementKind::ALL
        .into_iter()
        .find(|candidate| kinds.iter().all(|&kind| candidate.holds(kind)))
}

/// A type that can be written to and read from datasets and attributes.
///
/// Implemented for the primitive numeric types (atomic), for pairs of
/// primitives and fixed-size arrays of one primitive (flattened
/// aggregates), and by `#[derive(Record)]` for structs of primitives.
pub trait Record: Sized {
    /// Storage layout of this type.
    fn descriptor() -> Result<TypeDescriptor>;

    /// Append one value per field, in field order.
    fn flatten(&self, out: &mut Vec<Value>);

    /// Rebuild a record from exactly `arity` values.
    fn unflatten(values: &[Value]) -> Result<Self>;
}

fn expect_arity(values: &[Value], arity: usize) -> Result<()> {
    if values.len() != arity {
        return Err(Error::ShapeMismatch {
            expected: arity as u64,
            actual: values.len() as u64,
        });
    }
    Ok(())
}

macro_rules! impl_atomic_record {
    ($($t:ty),*) => {
        $(
            impl Record for $t {
                fn descriptor() -> Result<TypeDescriptor> {
                    Ok(TypeDescriptor::Atomic(<$t as Element>::KIND))
                }

                fn flatten(&self, out: &mut Vec<Value>) {
                    out.push(self.into_value());
                }

                fn unflatten(values: &[Value]) -> Result<Self> {
                    expect_arity(values, 1)?;
                    <$t as Element>::from_value(values[0])
                }
            }
        )*
    };
}

impl_atomic_record!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl<A: Element, B: Element> Record for (A, B) {
    fn descriptor() -> Result<TypeDescriptor> {
        TypeDescriptor::aggregate(
            vec![
                FieldDescriptor::new("first", A::KIND, std::mem::offset_of!((A, B), 0)),
                FieldDescriptor::new("second", B::KIND, std::mem::offset_of!((A, B), 1)),
            ],
            std::mem::size_of::<(A, B)>(),
        )
    }

    fn flatten(&self, out: &mut Vec<Value>) {
        out.push(self.0.into_value());
        out.push(self.1.into_value());
    }

    fn unflatten(values: &[Value]) -> Result<Self> {
        expect_arity(values, 2)?;
        Ok((A::from_value(values[0])?, B::from_value(values[1])?))
    }
}

impl<T: Element, const N: usize> Record for [T; N] {
    fn descriptor() -> Result<TypeDescriptor> {
        let fields = (0..N)
            .map(|i| FieldDescriptor::new(i.to_string(), T::KIND, i * T::KIND.size()))
            .collect();
        TypeDescriptor::aggregate(fields, std::mem::size_of::<[T; N]>())
    }

    fn flatten(&self, out: &mut Vec<Value>) {
        out.extend(self.iter().map(|v| v.into_value()));
    }

    fn unflatten(values: &[Value]) -> Result<Self> {
        expect_arity(values, N)?;
        let items = values
            .iter()
            .map(|v| T::from_value(*v))
            .collect::<Result<Vec<T>>>()?;
        items.try_into().map_err(|items: Vec<T>| Error::ShapeMismatch {
            expected: N as u64,
            actual: items.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ElementKind::I8, ElementKind::I32, Some(ElementKind::I32))]
    #[case(ElementKind::U8, ElementKind::U64, Some(ElementKind::U64))]
    #[case(ElementKind::U8, ElementKind::I16, Some(ElementKind::I16))]
    #[case(ElementKind::U8, ElementKind::I8, Some(ElementKind::I16))]
    #[case(ElementKind::U16, ElementKind::I8, Some(ElementKind::I32))]
    #[case(ElementKind::U32, ElementKind::I64, Some(ElementKind::I64))]
    #[case(ElementKind::U64, ElementKind::I8, None)]
    #[case(ElementKind::F32, ElementKind::F64, Some(ElementKind::F64))]
    #[case(ElementKind::I32, ElementKind::F32, Some(ElementKind::F64))]
    #[case(ElementKind::U16, ElementKind::F32, Some(ElementKind::F32))]
    #[case(ElementKind::I64, ElementKind::F64, None)]
    #[case(ElementKind::I64, ElementKind::F32, None)]
    fn common_storage_kind(
        #[case] a: ElementKind,
        #[case] b: ElementKind,
        #[case] expected: Option<ElementKind>,
    ) {
        assert_eq!(common_kind(&[a, b]), expected);
        assert_eq!(common_kind(&[b, a]), expected);
    }

    #[rstest]
    #[case(&[ElementKind::U16, ElementKind::I8, ElementKind::F32], Some(ElementKind::F32))]
    #[case(&[ElementKind::U16, ElementKind::I8], Some(ElementKind::I32))]
    #[case(&[ElementKind::U8, ElementKind::I8, ElementKind::I16], Some(ElementKind::I16))]
    #[case(&[ElementKind::I8, ElementKind::F32, ElementKind::U32], Some(ElementKind::F64))]
    #[case(&[ElementKind::F64], Some(ElementKind::F64))]
    #[case(&[], None)]
    fn common_kind_considers_the_whole_set(
        #[case] kinds: &[ElementKind],
        #[case] expected: Option<ElementKind>,
    ) {
        assert_eq!(common_kind(kinds), expected);
        let mut reversed = kinds.to_vec();
        reversed.reverse();
        assert_eq!(common_kind(&reversed), expected);
    }

    #[test]
    fn primitives_are_atomic() {
        assert_eq!(i32::descriptor().unwrap(), TypeDescriptor::Atomic(ElementKind::I32));
        let d = f64::descriptor().unwrap();
        assert_eq!(d.arity(), 1);
        assert_eq!(d.record_size(), 8);
        assert!(!d.is_aggregate());
        assert!(d.fields().is_empty());
    }

    #[test]
    fn pair_keeps_field_kinds() {
        let d = <(i32, f32)>::descriptor().unwrap();
        assert_eq!(d.arity(), 2);
        assert_eq!(d.storage_kind(), ElementKind::F64);
        let kinds: Vec<_> = d.fields().iter().map(|f| f.kind).collect();
        assert_eq!(kinds, vec![ElementKind::I32, ElementKind::F32]);
        assert_eq!(d.record_size(), 8);
        let offsets: Vec<_> = d.fields().iter().map(|f| f.offset).collect();
        assert!(offsets.contains(&0) && offsets.contains(&4));
    }

    #[test]
    fn same_kind_pair_stores_as_that_kind() {
        let d = <(u16, u16)>::descriptor().unwrap();
        assert_eq!(d.storage_kind(), ElementKind::U16);
    }

    #[test]
    fn pair_without_exact_common_kind_is_unsupported() {
        assert!(matches!(
            <(i64, f32)>::descriptor(),
            Err(Error::UnsupportedElementType(_))
        ));
    }

    #[test]
    fn arrays_flatten() {
        let d = <[f32; 3]>::descriptor().unwrap();
        assert_eq!(d.arity(), 3);
        assert_eq!(d.storage_kind(), ElementKind::F32);
        assert_eq!(d.fields()[2].offset, 8);

        let mut values = Vec::new();
        [1.0f32, 2.0, 3.0].flatten(&mut values);
        assert_eq!(values.len(), 3);
        assert_eq!(<[f32; 3]>::unflatten(&values).unwrap(), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn empty_array_is_unsupported() {
        assert!(matches!(
            <[u8; 0]>::descriptor(),
            Err(Error::UnsupportedElementType(_))
        ));
    }

    #[test]
    fn unflatten_checks_arity() {
        assert!(matches!(
            <(i8, i8)>::unflatten(&[Value::Int(1)]),
            Err(Error::ShapeMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }
}
