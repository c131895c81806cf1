//! Compressed sparse row matrices.
//!
//! Matrices are built row by row through [`CsrBuilder`]. A builder created
//! with [`CsrBuilder::with_preallocation`] checks every row against its
//! preallocated nonzero count and refuses both over- and under-filled rows,
//! so a counting pass that drifts from the assembly pass fails loudly
//! instead of silently reallocating.

use rayon::prelude::*;

use crate::error::AssemblyError;
use crate::nnz::NnzCounts;

/// Rows above which matrix-vector products switch to rayon.
const PARALLEL_ROWS: usize = 4096;

/// Sparse matrix in compressed sparse row form.
///
/// Column indices are sorted and unique within each row. Explicit zeros
/// are kept: the structure is decided by the stencil, not by the values.
#[derive(Clone, Debug, PartialEq)]
pub struct CsrMatrix {
    nrows: usize,
    ncols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Square identity matrix.
    pub fn identity(n: usize) -> Self {
        Self {
            nrows: n,
            ncols: n,
            row_ptr: (0..=n).collect(),
            col_idx: (0..n).collect(),
            values: vec![1.0; n],
        }
    }

    /// Number of rows.
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns.
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Row pointer array (`nrows + 1` entries).
    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    /// Column indices of all stored entries.
    pub fn col_indices(&self) -> &[usize] {
        &self.col_idx
    }

    /// Values of all stored entries.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Column indices and values of row `i`.
    pub fn row(&self, i: usize) -> (&[usize], &[f64]) {
        let r = self.row_ptr[i]..self.row_ptr[i + 1];
        (&self.col_idx[r.clone()], &self.values[r])
    }

    /// Number of stored entries in row `i`.
    pub fn row_nnz(&self, i: usize) -> usize {
        self.row_ptr[i + 1] - self.row_ptr[i]
    }

    /// Entry `(i, j)`, zero if not stored.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        let (cols, vals) = self.row(i);
        match cols.binary_search(&j) {
            Ok(k) => vals[k],
            Err(_) => 0.0,
        }
    }

    /// Diagonal entries (zero where not stored).
    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.nrows.min(self.ncols)).map(|i| self.get(i, i)).collect()
    }

    /// `y = A x`.
    ///
    /// # Panics
    ///
    /// Panics if the vector lengths do not match the matrix shape.
    pub fn mul_vec(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.ncols, "x length must equal column count");
        assert_eq!(y.len(), self.nrows, "y length must equal row count");
        if self.nrows >= PARALLEL_ROWS {
            y.par_iter_mut()
                .enumerate()
                .for_each(|(i, yi)| *yi = self.row_dot(i, x));
        } else {
            for (i, yi) in y.iter_mut().enumerate() {
                *yi = self.row_dot(i, x);
            }
        }
    }

    /// `y += alpha A x`.
    pub fn mul_vec_add(&self, alpha: f64, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.ncols, "x length must equal column count");
        assert_eq!(y.len(), self.nrows, "y length must equal row count");
        if self.nrows >= PARALLEL_ROWS {
            y.par_iter_mut()
                .enumerate()
                .for_each(|(i, yi)| *yi += alpha * self.row_dot(i, x));
        } else {
            for (i, yi) in y.iter_mut().enumerate() {
                *yi += alpha * self.row_dot(i, x);
            }
        }
    }

    fn row_dot(&self, i: usize, x: &[f64]) -> f64 {
        let (cols, vals) = self.row(i);
        cols.iter().zip(vals).map(|(&j, &v)| v * x[j]).sum()
    }

    /// Transpose.
    pub fn transpose(&self) -> CsrMatrix {
        let mut counts = vec![0usize; self.ncols];
        for &j in &self.col_idx {
            counts[j] += 1;
        }
        let mut row_ptr = Vec::with_capacity(self.ncols + 1);
        row_ptr.push(0);
        for c in &counts {
            let last = row_ptr[row_ptr.len() - 1];
            row_ptr.push(last + c);
        }
        let mut next = row_ptr.clone();
        let mut col_idx = vec![0usize; self.nnz()];
        let mut values = vec![0.0; self.nnz()];
        // Rows are visited in order, so each transposed row fills sorted.
        for i in 0..self.nrows {
            let (cols, vals) = self.row(i);
            for (&j, &v) in cols.iter().zip(vals) {
                let k = next[j];
                col_idx[k] = i;
                values[k] = v;
                next[j] += 1;
            }
        }
        CsrMatrix {
            nrows: self.ncols,
            ncols: self.nrows,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// `diag(d) · A`, keeping the structure.
    pub fn scale_rows(&self, d: &[f64]) -> Result<CsrMatrix, AssemblyError> {
        if d.len() != self.nrows {
            return Err(AssemblyError::DimensionMismatch {
                detail: format!("row scaling of length {} for {} rows", d.len(), self.nrows),
            });
        }
        let mut out = self.clone();
        for i in 0..self.nrows {
            for k in self.row_ptr[i]..self.row_ptr[i + 1] {
                out.values[k] *= d[i];
            }
        }
        Ok(out)
    }

    /// Sparse product `A · B` (Gustavson row-by-row).
    ///
    /// When `counts` is given the result is built with exact preallocation
    /// and must match it row for row.
    pub fn matmul(
        &self,
        other: &CsrMatrix,
        counts: Option<&NnzCounts>,
    ) -> Result<CsrMatrix, AssemblyError> {
        if self.ncols != other.nrows {
            return Err(AssemblyError::DimensionMismatch {
                detail: format!(
                    "product of {}x{} and {}x{}",
                    self.nrows, self.ncols, other.nrows, other.ncols
                ),
            });
        }
        let mut builder = match counts {
            Some(c) => CsrBuilder::with_preallocation(self.nrows, other.ncols, c),
            None => CsrBuilder::new(self.nrows, other.ncols),
        };
        let mut acc = vec![0.0; other.ncols];
        let mut marker = vec![usize::MAX; other.ncols];
        let mut touched: Vec<usize> = Vec::new();
        let mut entries: Vec<(usize, f64)> = Vec::new();
        for i in 0..self.nrows {
            touched.clear();
            let (acols, avals) = self.row(i);
            for (&k, &a) in acols.iter().zip(avals) {
                let (bcols, bvals) = other.row(k);
                for (&j, &b) in bcols.iter().zip(bvals) {
                    if marker[j] != i {
                        marker[j] = i;
                        acc[j] = 0.0;
                        touched.push(j);
                    }
                    acc[j] += a * b;
                }
            }
            entries.clear();
            entries.extend(touched.iter().map(|&j| (j, acc[j])));
            builder.push_row(i, &mut entries)?;
        }
        builder.finish()
    }

    /// Whether `|A - Aᵀ|` is below `tol` (relative to the largest entry).
    pub fn is_symmetric(&self, tol: f64) -> bool {
        if self.nrows != self.ncols {
            return false;
        }
        let scale = self.values.iter().fold(0.0f64, |m, v| m.max(v.abs())).max(1.0);
        let t = self.transpose();
        if t.col_idx != self.col_idx || t.row_ptr != self.row_ptr {
            return false;
        }
        self.values
            .iter()
            .zip(&t.values)
            .all(|(a, b)| (a - b).abs() <= tol * scale)
    }
}

/// Row-by-row builder for [`CsrMatrix`].
#[derive(Debug)]
pub struct CsrBuilder {
    nrows: usize,
    ncols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
    expected: Option<Vec<usize>>,
}

impl CsrBuilder {
    /// Builder without preallocation.
    pub fn new(nrows: usize, ncols: usize) -> Self {
        let mut row_ptr = Vec::with_capacity(nrows + 1);
        row_ptr.push(0);
        Self {
            nrows,
            ncols,
            row_ptr,
            col_idx: Vec::new(),
            values: Vec::new(),
            expected: None,
        }
    }

    /// Builder whose storage is sized exactly from `counts`.
    pub fn with_preallocation(nrows: usize, ncols: usize, counts: &NnzCounts) -> Self {
        let totals = counts.totals();
        let capacity = totals.iter().sum();
        let mut row_ptr = Vec::with_capacity(nrows + 1);
        row_ptr.push(0);
        Self {
            nrows,
            ncols,
            row_ptr,
            col_idx: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            expected: Some(totals),
        }
    }

    /// Append row `row`. Entries are sorted and duplicate columns summed.
    pub fn push_row(&mut self, row: usize, entries: &mut [(usize, f64)]) -> Result<(), AssemblyError> {
        let next = self.row_ptr.len() - 1;
        if row != next || row >= self.nrows {
            return Err(AssemblyError::RowOutOfOrder {
                expected: next,
                found: row,
            });
        }
        entries.sort_unstable_by_key(|&(j, _)| j);
        let start = self.col_idx.len();
        for &(j, v) in entries.iter() {
            if j >= self.ncols {
                return Err(AssemblyError::ColumnOutOfRange {
                    row,
                    col: j,
                    ncols: self.ncols,
                });
            }
            if self.col_idx.len() > start && self.col_idx[self.col_idx.len() - 1] == j {
                let last = self.values.len() - 1;
                self.values[last] += v;
            } else {
                self.col_idx.push(j);
                self.values.push(v);
            }
        }
        let actual = self.col_idx.len() - start;
        if let Some(expected) = &self.expected {
            let want = expected.get(row).copied().unwrap_or(0);
            if want != actual {
                return Err(AssemblyError::Preallocation {
                    row,
                    expected: want,
                    actual,
                });
            }
        }
        self.row_ptr.push(self.col_idx.len());
        Ok(())
    }

    /// Finish assembly; every row must have been pushed.
    pub fn finish(self) -> Result<CsrMatrix, AssemblyError> {
        let pushed = self.row_ptr.len() - 1;
        if pushed != self.nrows {
            return Err(AssemblyError::RowOutOfOrder {
                expected: pushed,
                found: self.nrows,
            });
        }
        Ok(CsrMatrix {
            nrows: self.nrows,
            ncols: self.ncols,
            row_ptr: self.row_ptr,
            col_idx: self.col_idx,
            values: self.values,
        })
    }
}
