//! PETSc binary format for vectors and matrices.
//!
//! All integers and reals are big-endian. A vector is
//! `[class id i32] [length i32] [values f64...]`; a matrix is
//! `[class id i32] [rows i32] [cols i32] [nnz i32] [row nnz i32...]
//! [column indices i32...] [values f64...]`. Files written here load with
//! `VecLoad` / `MatLoad` and the PETSc Python readers.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use fracstep_linalg::{CsrBuilder, CsrMatrix};

use crate::error::IoError;

/// Class id marking a vector.
pub const VEC_CLASS_ID: i32 = 1_211_214;

/// Class id marking a sparse matrix.
pub const MAT_CLASS_ID: i32 = 1_211_216;

// ── Primitive writers ───────────────────────────────────────────

fn write_i32_be(w: &mut dyn Write, v: i32) -> io::Result<()> {
    w.write_all(&v.to_be_bytes())
}

fn write_len(w: &mut dyn Write, n: usize) -> io::Result<()> {
    let v = i32::try_from(n).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("length {n} exceeds i32"))
    })?;
    write_i32_be(w, v)
}

fn write_f64_be(w: &mut dyn Write, v: f64) -> io::Result<()> {
    w.write_all(&v.to_be_bytes())
}

// ── Primitive readers ───────────────────────────────────────────

fn read_i32_be(r: &mut dyn Read) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_be_bytes(buf))
}

fn read_f64_be(r: &mut dyn Read) -> io::Result<f64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_be_bytes(buf))
}

fn read_len(r: &mut dyn Read, path: &Path, what: &str) -> Result<usize, IoError> {
    let v = read_i32_be(r).map_err(IoError::io(path))?;
    usize::try_from(v).map_err(|_| IoError::format(path, format!("negative {what} {v}")))
}

fn expect_class(r: &mut dyn Read, path: &Path, expected: i32) -> Result<(), IoError> {
    let id = read_i32_be(r).map_err(IoError::io(path))?;
    if id != expected {
        return Err(IoError::format(
            path,
            format!("class id {id}, expected {expected}"),
        ));
    }
    Ok(())
}

// ── Vectors ─────────────────────────────────────────────────────

/// Encode a vector.
pub fn write_vector(w: &mut dyn Write, values: &[f64]) -> io::Result<()> {
    write_i32_be(w, VEC_CLASS_ID)?;
    write_len(w, values.len())?;
    for &v in values {
        write_f64_be(w, v)?;
    }
    Ok(())
}

/// Decode a vector; `path` only labels errors.
pub fn read_vector(r: &mut dyn Read, path: &Path) -> Result<Vec<f64>, IoError> {
    expect_class(r, path, VEC_CLASS_ID)?;
    let n = read_len(r, path, "length")?;
    let mut values = Vec::with_capacity(n);
    for _ in 0..n {
        values.push(read_f64_be(r).map_err(IoError::io(path))?);
    }
    Ok(values)
}

/// Write a vector file.
pub fn write_vector_file(path: &Path, values: &[f64]) -> Result<(), IoError> {
    let file = File::create(path).map_err(IoError::io(path))?;
    let mut w = BufWriter::new(file);
    write_vector(&mut w, values).map_err(IoError::io(path))?;
    w.flush().map_err(IoError::io(path))
}

/// Read a vector file that must hold exactly `expected` entries.
pub fn read_vector_file(path: &Path, expected: usize) -> Result<Vec<f64>, IoError> {
    let file = File::open(path).map_err(IoError::io(path))?;
    let values = read_vector(&mut BufReader::new(file), path)?;
    if values.len() != expected {
        return Err(IoError::SizeMismatch {
            path: path.to_path_buf(),
            expected,
            found: values.len(),
        });
    }
    Ok(values)
}

// ── Matrices ────────────────────────────────────────────────────

/// Encode a sparse matrix.
pub fn write_matrix(w: &mut dyn Write, m: &CsrMatrix) -> io::Result<()> {
    write_i32_be(w, MAT_CLASS_ID)?;
    write_len(w, m.nrows())?;
    write_len(w, m.ncols())?;
    write_len(w, m.nnz())?;
    for i in 0..m.nrows() {
        write_len(w, m.row_nnz(i))?;
    }
    for &j in m.col_indices() {
        write_len(w, j)?;
    }
    for &v in m.values() {
        write_f64_be(w, v)?;
    }
    Ok(())
}

/// Decode a sparse matrix; `path` only labels errors.
pub fn read_matrix(r: &mut dyn Read, path: &Path) -> Result<CsrMatrix, IoError> {
    expect_class(r, path, MAT_CLASS_ID)?;
    let nrows = read_len(r, path, "row count")?;
    let ncols = read_len(r, path, "column count")?;
    let nnz = read_len(r, path, "nonzero count")?;
    let mut row_nnz = Vec::with_capacity(nrows);
    for _ in 0..nrows {
        row_nnz.push(read_len(r, path, "row length")?);
    }
    if row_nnz.iter().sum::<usize>() != nnz {
        return Err(IoError::format(path, "row lengths do not add up to nnz"));
    }
    let mut cols = Vec::with_capacity(nnz);
    for _ in 0..nnz {
        cols.push(read_len(r, path, "column index")?);
    }
    let mut values = Vec::with_capacity(nnz);
    for _ in 0..nnz {
        values.push(read_f64_be(r).map_err(IoError::io(path))?);
    }
    let mut builder = CsrBuilder::new(nrows, ncols);
    let mut start = 0;
    let mut row = Vec::new();
    for (i, &len) in row_nnz.iter().enumerate() {
        row.clear();
        let span = start..start + len;
        row.extend(cols[span.clone()].iter().copied().zip(values[span].iter().copied()));
        builder
            .push_row(i, &mut row)
            .map_err(|e| IoError::format(path, e.to_string()))?;
        start += len;
    }
    builder
        .finish()
        .map_err(|e| IoError::format(path, e.to_string()))
}

/// Write a matrix file.
pub fn write_matrix_file(path: &Path, m: &CsrMatrix) -> Result<(), IoError> {
    let file = File::create(path).map_err(IoError::io(path))?;
    let mut w = BufWriter::new(file);
    write_matrix(&mut w, m).map_err(IoError::io(path))?;
    w.flush().map_err(IoError::io(path))
}
