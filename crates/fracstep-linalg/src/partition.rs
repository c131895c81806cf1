//! Contiguous row ownership across ranks.
//!
//! Follows the usual distributed-vector rule: `n / ranks` rows each, with
//! the first `n % ranks` ranks taking one extra row. Sparse preallocation
//! splits each row's nonzeros into columns owned by the same rank
//! (diagonal block) and columns owned elsewhere (off-diagonal block).

use std::ops::Range;

use fracstep_core::ConfigError;

/// Ownership ranges of a vector or matrix dimension over `ranks` ranks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowPartition {
    starts: Vec<usize>,
}

impl RowPartition {
    /// Split `n` rows as evenly as possible over `ranks` ranks.
    pub fn even(n: usize, ranks: usize) -> Result<Self, ConfigError> {
        if ranks == 0 {
            return Err(ConfigError::invalid("ranks", "must be at least 1"));
        }
        let base = n / ranks;
        let extra = n % ranks;
        let mut starts = Vec::with_capacity(ranks + 1);
        let mut s = 0;
        starts.push(0);
        for r in 0..ranks {
            s += base + usize::from(r < extra);
            starts.push(s);
        }
        Ok(Self { starts })
    }

    /// Single-rank partition owning every row.
    pub fn single(n: usize) -> Self {
        Self {
            starts: vec![0, n],
        }
    }

    /// Number of ranks.
    pub fn num_ranks(&self) -> usize {
        self.starts.len() - 1
    }

    /// Total number of rows.
    pub fn len(&self) -> usize {
        self.starts[self.starts.len() - 1]
    }

    /// Whether there are no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows owned by `rank`.
    pub fn range(&self, rank: usize) -> Range<usize> {
        self.starts[rank]..self.starts[rank + 1]
    }

    /// Rank owning `row`.
    pub fn owner(&self, row: usize) -> usize {
        self.starts.partition_point(|&s| s <= row) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn uneven_split_front_loads() {
        let p = RowPartition::even(10, 3).unwrap();
        assert_eq!(p.range(0), 0..4);
        assert_eq!(p.range(1), 4..7);
        assert_eq!(p.range(2), 7..10);
        assert_eq!(p.owner(4), 1);
    }

    #[test]
    fn zero_ranks_rejected() {
        assert!(RowPartition::even(10, 0).is_err());
    }

    #[test]
    fn more_ranks_than_rows() {
        let p = RowPartition::even(2, 4).unwrap();
        assert_eq!(p.range(3), 2..2);
        assert_eq!(p.owner(1), 1);
    }

    proptest! {
        #[test]
        fn ranges_tile_rows(n in 0usize..500, ranks in 1usize..9) {
            let p = RowPartition::even(n, ranks).unwrap();
            prop_assert_eq!(p.len(), n);
            let sizes: Vec<usize> = (0..ranks).map(|r| p.range(r).len()).collect();
            let max = *sizes.iter().max().unwrap();
            let min = *sizes.iter().min().unwrap();
            prop_assert!(max - min <= 1);
            for row in 0..n {
                prop_assert!(p.range(p.owner(row)).contains(&row));
            }
        }
    }
}
