//! Dataspace message encoding (message type 0x0001).

use crate::error::FormatError;
use crate::{ensure_len, read_u64};

const DATASPACE_VERSION: u8 = 2;

/// Largest number of dimensions a dataspace may have.
pub const MAX_RANK: usize = 32;

/// Type of dataspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataspaceType {
    /// Scalar (single element, rank 0).
    Scalar,
    /// Simple (N-dimensional array).
    Simple,
}

/// Extent of a dataset or attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataspace {
    /// The type of this dataspace.
    pub space_type: DataspaceType,
    /// Current dimension sizes; empty for scalar.
    pub dimensions: Vec<u64>,
}

impl Dataspace {
    /// Single-element, rank-0 dataspace.
    pub fn scalar() -> Self {
        Self {
            space_type: DataspaceType::Scalar,
            dimensions: Vec::new(),
        }
    }

    /// N-dimensional dataspace. An empty `dims` yields a scalar.
    pub fn simple(dims: &[u64]) -> Self {
        if dims.is_empty() {
            return Self::scalar();
        }
        Self {
            space_type: DataspaceType::Simple,
            dimensions: dims.to_vec(),
        }
    }

    /// Number of dimensions (0 for scalar).
    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }

    /// Total number of elements. Scalar = 1.
    ///
    /// Saturates at `u64::MAX`; [`checked_elements`](Self::checked_elements)
    /// reports an extent that large as an error instead.
    pub fn num_elements(&self) -> u64 {
        self.checked_elements().unwrap_or(u64::MAX)
    }

    /// Element count, failing on a rank above [`MAX_RANK`] or a count that
    /// does not fit in a `u64`.
    pub fn checked_elements(&self) -> Result<u64, FormatError> {
        if self.rank() > MAX_RANK {
            return Err(FormatError::RankTooLarge(self.rank()));
        }
        match self.space_type {
            DataspaceType::Scalar => Ok(1),
            DataspaceType::Simple => self
                .dimensions
                .iter()
                .try_fold(1u64, |acc, &dim| acc.checked_mul(dim))
                .ok_or_else(|| FormatError::ExtentTooLarge(self.dimensions.clone())),
        }
    }

    /// Bytes of raw data for elements of `element_size` bytes.
    pub fn data_size(&self, element_size: u32) -> Result<usize, FormatError> {
        self.checked_elements()?
            .checked_mul(u64::from(element_size))
            .and_then(|bytes| usize::try_from(bytes).ok())
            .ok_or_else(|| FormatError::ExtentTooLarge(self.dimensions.clone()))
    }

    /// A zero-filled raw data buffer for elements of `element_size` bytes.
    ///
    /// Fails instead of aborting when the buffer cannot be allocated.
    pub fn zeroed_data(&self, element_size: u32) -> Result<Vec<u8>, FormatError> {
        let len = self.data_size(element_size)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| FormatError::ExtentTooLarge(self.dimensions.clone()))?;
        data.resize(len, 0);
        Ok(data)
    }

    /// Parse a dataspace message from raw message bytes.
    pub fn parse(data: &[u8]) -> Result<Dataspace, FormatError> {
        ensure_len(data, 0, 4)?;

        let version = data[0];
        if version != DATASPACE_VERSION {
            return Err(FormatError::InvalidDataspaceVersion(version));
        }
        let rank = data[1] as usize;
        if rank > MAX_RANK {
            return Err(FormatError::RankTooLarge(rank));
        }
        let space_type = match data[3] {
            0 => DataspaceType::Scalar,
            1 => DataspaceType::Simple,
            other => return Err(FormatError::InvalidDataspaceType(other)),
        };
        if space_type == DataspaceType::Scalar && rank != 0 {
            return Err(FormatError::InvalidDataspaceType(0));
        }

        let mut dimensions = Vec::with_capacity(rank);
        for i in 0..rank {
            dimensions.push(read_u64(data, 4 + i * 8)?);
        }

        Ok(Dataspace {
            space_type,
            dimensions,
        })
    }

    /// Serialize dataspace to message bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + self.dimensions.len() * 8);
        buf.push(DATASPACE_VERSION);
        // At most MAX_RANK once `checked_elements` has accepted the extent.
        buf.push(self.dimensions.len() as u8);
        buf.push(0); // flags: no max dimensions
        buf.push(match self.space_type {
            DataspaceType::Scalar => 0,
            DataspaceType::Simple => 1,
        });
        for &dim in &self.dimensions {
            buf.extend_from_slice(&dim.to_le_bytes());
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_round_trip() {
        let ds = Dataspace::simple(&[20, 5]);
        let parsed = Dataspace::parse(&ds.serialize()).unwrap();
        assert_eq!(parsed, ds);
        assert_eq!(parsed.num_elements(), 100);
        assert_eq!(parsed.rank(), 2);
    }

    #[test]
    fn scalar_round_trip() {
        let ds = Dataspace::scalar();
        let bytes = ds.serialize();
        assert_eq!(bytes.len(), 4);
        let parsed = Dataspace::parse(&bytes).unwrap();
        assert_eq!(parsed.space_type, DataspaceType::Scalar);
        assert_eq!(parsed.num_elements(), 1);
    }

    #[test]
    fn empty_dims_is_scalar() {
        assert_eq!(Dataspace::simple(&[]), Dataspace::scalar());
    }

    #[test]
    fn zero_sized_axis() {
        let ds = Dataspace::simple(&[0, 3]);
        assert_eq!(Dataspace::parse(&ds.serialize()).unwrap().num_elements(), 0);
    }

    #[test]
    fn overflowing_extent_is_rejected() {
        let ds = Dataspace::simple(&[1 << 33, 1 << 33]);
        assert_eq!(ds.num_elements(), u64::MAX);
        assert_eq!(
            ds.checked_elements(),
            Err(FormatError::ExtentTooLarge(vec![1 << 33, 1 << 33]))
        );
        let ds = Dataspace::simple(&[1 << 61]);
        assert_eq!(ds.checked_elements(), Ok(1 << 61));
        assert!(matches!(ds.data_size(8), Err(FormatError::ExtentTooLarge(_))));
        assert!(matches!(ds.zeroed_data(8), Err(FormatError::ExtentTooLarge(_))));
        assert_eq!(Dataspace::simple(&[2, 3]).data_size(4), Ok(24));
    }

    #[test]
    fn rank_is_limited() {
        let ds = Dataspace::simple(&[1; MAX_RANK + 1]);
        assert_eq!(ds.checked_elements(), Err(FormatError::RankTooLarge(MAX_RANK + 1)));
        assert!(Dataspace::simple(&[1; MAX_RANK]).checked_elements().is_ok());

        let mut bytes = Dataspace::simple(&[1; MAX_RANK]).serialize();
        bytes[1] = MAX_RANK as u8 + 1;
        assert_eq!(
            Dataspace::parse(&bytes),
            Err(FormatError::RankTooLarge(MAX_RANK + 1))
        );
    }

    #[test]
    fn bad_version() {
        let mut bytes = Dataspace::simple(&[4]).serialize();
        bytes[0] = 1;
        assert_eq!(
            Dataspace::parse(&bytes),
            Err(FormatError::InvalidDataspaceVersion(1))
        );
    }

    #[test]
    fn bad_type() {
        let mut bytes = Dataspace::simple(&[4]).serialize();
        bytes[3] = 2;
        assert_eq!(
            Dataspace::parse(&bytes),
            Err(FormatError::InvalidDataspaceType(2))
        );
    }

    #[test]
    fn truncated_dims() {
        let bytes = Dataspace::simple(&[4, 4]).serialize();
        assert!(matches!(
            Dataspace::parse(&bytes[..10]),
            Err(FormatError::UnexpectedEof { .. })
        ));
    }
}
