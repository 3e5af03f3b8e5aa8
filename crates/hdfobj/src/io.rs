//! Packing records into element buffers and back.

use crate::descriptor::{Record, TypeDescriptor};
use crate::element::Value;
use crate::error::{Error, Result};

/// Flatten `records` into host-order elements of the descriptor's storage
/// kind.
pub(crate) fn encode_records<T: Record>(records: &[T], desc: &TypeDescriptor) -> Result<Vec<u8>> {
    let kind = desc.storage_kind();
    let mut values = Vec::with_capacity(records.len() * desc.arity());
    for record in records {
        record.flatten(&mut values);
    }
    let mut out = Vec::with_capacity(values.len() * kind.size());
    for value in values {
        value.encode(kind, &mut out)?;
    }
    Ok(out)
}

/// Rebuild records from host-order elements of the descriptor's storage
/// kind.
pub(crate) fn decode_records<T: Record>(bytes: &[u8], desc: &TypeDescriptor) -> Result<Vec<T>> {
    let kind = desc.storage_kind();
    let values: Vec<Value> = bytes
        .chunks_exact(kind.size())
        .map(|chunk| Value::decode(kind, chunk))
        .collect();
    values
        .chunks_exact(desc.arity())
        .map(T::unflatten)
        .collect()
}

/// Records held by `elements` atomic elements of a K-field record type.
pub(crate) fn records_in(elements: u64, desc: &TypeDescriptor) -> Result<u64> {
    let arity = desc.arity() as u64;
    if elements % arity != 0 {
        return Err(Error::ShapeMismatch {
            expected: elements
                .checked_next_multiple_of(arity)
                .unwrap_or(elements - elements % arity),
            actual: elements,
        });
    }
    Ok(elements / arity)
}

/// Check that `records` records fill exactly `elements` elements.
pub(crate) fn check_fill(records: usize, elements: u64, desc: &TypeDescriptor) -> Result<()> {
    let supplied = (records as u64).saturating_mul(desc.arity() as u64);
    if supplied != elements {
        return Err(Error::ShapeMismatch {
            expected: elements,
            actual: supplied,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_round_trip_through_common_kind() {
        let desc = <(i32, f32)>::descriptor().unwrap();
        let records = vec![(1, 0.5f32), (-7, 2.25)];
        let bytes = encode_records(&records, &desc).unwrap();
        assert_eq!(bytes.len(), 4 * 8);
        let back: Vec<(i32, f32)> = decode_records(&bytes, &desc).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn atomic_round_trip() {
        let desc = u16::descriptor().unwrap();
        let bytes = encode_records(&[1u16, 65535], &desc).unwrap();
        assert_eq!(decode_records::<u16>(&bytes, &desc).unwrap(), vec![1, 65535]);
    }

    #[test]
    fn record_counts() {
        let desc = <[f64; 3]>::descriptor().unwrap();
        assert_eq!(records_in(12, &desc).unwrap(), 4);
        assert!(matches!(
            records_in(10, &desc),
            Err(Error::ShapeMismatch {
                expected: 12,
                actual: 10
            })
        ));
        assert!(matches!(
            records_in(u64::MAX, &<[u8; 2]>::descriptor().unwrap()),
            Err(Error::ShapeMismatch {
                expected,
                actual: u64::MAX
            }) if expected == u64::MAX - 1
        ));
        assert!(check_fill(4, 12, &desc).is_ok());
        assert!(check_fill(3, 12, &desc).is_err());
    }
}
