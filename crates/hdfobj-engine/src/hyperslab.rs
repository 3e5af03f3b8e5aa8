//! Contiguous-run iteration over a rectangular selection.
//!
//! A selection `start`/`count` inside a row-major extent `dims` is a set of
//! runs along the fastest-varying axis. Gather and scatter walk those runs
//! and copy whole runs at a time.

use crate::error::EngineError;

/// A rectangular block of a row-major extent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hyperslab {
    pub start: Vec<u64>,
    pub count: Vec<u64>,
}

impl Hyperslab {
    /// Check that the block lies inside `dims`.
    pub fn validate(&self, dims: &[u64]) -> Result<(), EngineError> {
        let fits = self.start.len() == dims.len()
            && self.count.len() == dims.len()
            && self
                .start
                .iter()
                .zip(&self.count)
                .zip(dims)
                .all(|((&s, &c), &d)| s.checked_add(c).is_some_and(|end| end <= d));
        if fits {
            Ok(())
        } else {
            Err(EngineError::SelectionOutOfBounds {
                start: self.start.clone(),
                count: self.count.clone(),
                dims: dims.to_vec(),
            })
        }
    }

    /// Selected element count, saturating at `u64::MAX`.
    pub fn num_elements(&self) -> u64 {
        self.count.iter().fold(1, |acc, &c| acc.saturating_mul(c))
    }

    /// Call `f(offset, len)` for each contiguous run, in row-major order.
    ///
    /// Offsets and lengths are in elements. Assumes [`validate`](Self::validate)
    /// passed for `dims`.
    pub fn for_each_run(&self, dims: &[u64], mut f: impl FnMut(usize, usize)) {
        let rank = dims.len();
        if rank == 0 {
            f(0, 1);
            return;
        }
        if self.count.iter().any(|&c| c == 0) {
            return;
        }

        let mut strides = vec![1u64; rank];
        for d in (0..rank - 1).rev() {
            strides[d] = strides[d + 1] * dims[d + 1];
        }
        let run_len = self.count[rank - 1] as usize;

        // Odometer over the leading axes.
        let mut index = vec![0u64; rank - 1];
        loop {
            let offset: u64 = (0..rank)
                .map(|d| {
                    let i = if d < rank - 1 { index[d] } else { 0 };
                    (self.start[d] + i) * strides[d]
                })
                .sum();
            f(offset as usize, run_len);

            let mut d = rank - 1;
            loop {
                if d == 0 {
                    return;
                }
                d -= 1;
                index[d] += 1;
                if index[d] < self.count[d] {
                    break;
                }
                index[d] = 0;
            }
        }
    }

    /// Copy the selected elements out of `data` into a packed buffer.
    pub fn gather(&self, data: &[u8], dims: &[u64], elem_size: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.num_elements() as usize * elem_size);
        self.for_each_run(dims, |offset, len| {
            let start = offset * elem_size;
            out.extend_from_slice(&data[start..start + len * elem_size]);
        });
        out
    }

    /// Copy a packed buffer into the selected elements of `data`.
    pub fn scatter(&self, data: &mut [u8], dims: &[u64], elem_size: usize, packed: &[u8]) {
        let mut pos = 0;
        self.for_each_run(dims, |offset, len| {
            let start = offset * elem_size;
            let bytes = len * elem_size;
            data[start..start + bytes].copy_from_slice(&packed[pos..pos + bytes]);
            pos += bytes;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runs(slab: &Hyperslab, dims: &[u64]) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        slab.for_each_run(dims, |o, l| out.push((o, l)));
        out
    }

    #[test]
    fn one_dimensional() {
        let slab = Hyperslab {
            start: vec![2],
            count: vec![3],
        };
        assert_eq!(runs(&slab, &[10]), vec![(2, 3)]);
    }

    #[test]
    fn two_dimensional_rows() {
        let slab = Hyperslab {
            start: vec![1, 1],
            count: vec![2, 2],
        };
        assert_eq!(runs(&slab, &[4, 5]), vec![(6, 2), (11, 2)]);
    }

    #[test]
    fn three_dimensional_order() {
        let slab = Hyperslab {
            start: vec![0, 1, 0],
            count: vec![2, 2, 3],
        };
        // strides: [12, 3, 1]
        assert_eq!(
            runs(&slab, &[2, 4, 3]),
            vec![(3, 3), (6, 3), (15, 3), (18, 3)]
        );
    }

    #[test]
    fn empty_count_has_no_runs() {
        let slab = Hyperslab {
            start: vec![0, 0],
            count: vec![0, 3],
        };
        assert!(runs(&slab, &[2, 3]).is_empty());
    }

    #[test]
    fn scalar_is_one_run() {
        let slab = Hyperslab {
            start: vec![],
            count: vec![],
        };
        assert_eq!(runs(&slab, &[]), vec![(0, 1)]);
    }

    #[test]
    fn validate_bounds() {
        let dims = [4, 4];
        let ok = Hyperslab {
            start: vec![2, 0],
            count: vec![2, 4],
        };
        assert!(ok.validate(&dims).is_ok());
        let past_end = Hyperslab {
            start: vec![3, 0],
            count: vec![2, 4],
        };
        assert!(matches!(
            past_end.validate(&dims),
            Err(EngineError::SelectionOutOfBounds { .. })
        ));
        let wrong_rank = Hyperslab {
            start: vec![0],
            count: vec![1],
        };
        assert!(wrong_rank.validate(&dims).is_err());
    }

    #[test]
    fn gather_then_scatter() {
        let dims = [3u64, 3];
        let data: Vec<u8> = (0u8..9).collect();
        let slab = Hyperslab {
            start: vec![1, 1],
            count: vec![2, 2],
        };
        assert_eq!(slab.gather(&data, &dims, 1), vec![4, 5, 7, 8]);

        let mut target = vec![0u8; 9];
        slab.scatter(&mut target, &dims, 1, &[1, 2, 3, 4]);
        assert_eq!(target, vec![0, 0, 0, 0, 1, 2, 0, 3, 4]);
    }
}
