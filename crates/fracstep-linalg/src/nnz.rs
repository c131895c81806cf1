//! Per-row nonzero counts split by ownership block.
//!
//! For a rank owning rows `[rowStart, rowEnd)` the diagonal block holds
//! the columns owned by the same rank in the column layout; every other
//! column belongs to the off-diagonal block.

use crate::csr::CsrMatrix;
use crate::partition::RowPartition;

/// Diagonal-block and off-diagonal-block nonzero counts for each row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NnzCounts {
    /// Nonzeros whose column is owned by the row's rank.
    pub diag: Vec<usize>,
    /// Nonzeros whose column is owned by another rank.
    pub off: Vec<usize>,
}

impl NnzCounts {
    /// Zero counts for `nrows` rows.
    pub fn new(nrows: usize) -> Self {
        Self {
            diag: vec![0; nrows],
            off: vec![0; nrows],
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.diag.len()
    }

    /// Whether there are no rows.
    pub fn is_empty(&self) -> bool {
        self.diag.is_empty()
    }

    /// Record the (unique) columns of `row`.
    pub fn record(&mut self, row: usize, cols: &[usize], rows: &RowPartition, cols_layout: &RowPartition) {
        let owned = cols_layout.range(rows.owner(row));
        let d = cols.iter().filter(|c| owned.contains(c)).count();
        self.diag[row] = d;
        self.off[row] = cols.len() - d;
    }

    /// Total nonzeros of `row`.
    pub fn total(&self, row: usize) -> usize {
        self.diag[row] + self.off[row]
    }

    /// Totals for every row.
    pub fn totals(&self) -> Vec<usize> {
        self.diag.iter().zip(&self.off).map(|(d, o)| d + o).collect()
    }

    /// Sum of diagonal-block counts over the rows of `rank`.
    pub fn rank_diag(&self, rows: &RowPartition, rank: usize) -> usize {
        self.diag[rows.range(rank)].iter().sum()
    }

    /// Sum of off-diagonal-block counts over the rows of `rank`.
    pub fn rank_off(&self, rows: &RowPartition, rank: usize) -> usize {
        self.off[rows.range(rank)].iter().sum()
    }

    /// Counts of an assembled matrix under the given layouts.
    pub fn of_matrix(m: &CsrMatrix, rows: &RowPartition, cols_layout: &RowPartition) -> Self {
        let mut counts = Self::new(m.nrows());
        for i in 0..m.nrows() {
            counts.record(i, m.row(i).0, rows, cols_layout);
        }
        counts
    }

    /// Symbolic counts of the product `A · B`.
    pub fn of_product(
        a: &CsrMatrix,
        b: &CsrMatrix,
        rows: &RowPartition,
        cols_layout: &RowPartition,
    ) -> Self {
        let mut counts = Self::new(a.nrows());
        let mut marker = vec![usize::MAX; b.ncols()];
        let mut cols = Vec::new();
        for i in 0..a.nrows() {
            cols.clear();
            for &k in a.row(i).0 {
                for &j in b.row(k).0 {
                    if marker[j] != i {
                        marker[j] = i;
                        cols.push(j);
                    }
                }
            }
            counts.record(i, &cols, rows, cols_layout);
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csr::CsrBuilder;
    use proptest::prelude::*;

    #[test]
    fn split_by_owner() {
        let rows = RowPartition::even(4, 2).unwrap();
        let mut c = NnzCounts::new(4);
        c.record(1, &[0, 1, 2], &rows, &rows);
        c.record(2, &[1, 2, 3], &rows, &rows);
        assert_eq!((c.diag[1], c.off[1]), (2, 1));
        assert_eq!((c.diag[2], c.off[2]), (2, 1));
        assert_eq!(c.rank_diag(&rows, 0), 2);
        assert_eq!(c.rank_off(&rows, 1), 1);
    }

    fn tridiagonal(n: usize) -> CsrMatrix {
        let mut b = CsrBuilder::new(n, n);
        for i in 0..n {
            let mut e = vec![(i, 2.0)];
            if i > 0 {
                e.push((i - 1, -1.0));
            }
            if i + 1 < n {
                e.push((i + 1, -1.0));
            }
            b.push_row(i, &mut e).unwrap();
        }
        b.finish().unwrap()
    }

    proptest! {
        #[test]
        fn product_counts_match_product(n in 2usize..40, ranks in 1usize..5) {
            let a = tridiagonal(n);
            let p = RowPartition::even(n, ranks).unwrap();
            let counts = NnzCounts::of_product(&a, &a, &p, &p);
            let aa = a.matmul(&a, Some(&counts));
            prop_assert!(aa.is_ok());
            let aa = aa.unwrap();
            prop_assert_eq!(NnzCounts::of_matrix(&aa, &p, &p), counts);
        }
    }
}
