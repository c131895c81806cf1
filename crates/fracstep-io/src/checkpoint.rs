//! Solution checkpoints: one directory per saved time step.
//!
//! ```text
//! {root}/{step:07}/qx.dat, qy.dat[, qz.dat]   flux components
//!                 /phi.dat                    pressure
//!                 /fTilde.dat                 body forces (immersed runs)
//!                 /convection.dat             convection history
//!                 /ghosts.dat                 boundary ghost velocities
//! ```
//!
//! Every file is a PETSc binary vector. The two history files are optional
//! on read: without `convection.dat` a restart takes one first-order
//! convection step, without `ghosts.dat` the ghosts are rebuilt from the
//! restored fluxes.

use std::fs;
use std::path::{Path, PathBuf};

use fracstep_core::{Axis, FieldVector, TimeStep};
use tracing::{debug, warn};

use crate::error::IoError;
use crate::petsc::{read_vector_file, write_vector_file};

const PRESSURE_FILE: &str = "phi.dat";
const FORCE_FILE: &str = "fTilde.dat";
const CONVECTION_FILE: &str = "convection.dat";
const GHOST_FILE: &str = "ghosts.dat";

/// Directory holding the checkpoint of `step`.
pub fn checkpoint_dir(root: &Path, step: TimeStep) -> PathBuf {
    root.join(format!("{:07}", step.0))
}

fn flux_file(c: usize) -> String {
    format!("q{}.dat", Axis::ALL[c].name())
}

/// Time-history vectors saved next to the fields, so that a restart
/// continues exactly where the saving run was.
#[derive(Clone, Copy, Debug, Default)]
pub struct History<'a> {
    /// Convection term of the latest step.
    pub convection: Option<&'a [f64]>,
    /// Boundary ghost velocities, flattened face by face.
    pub ghosts: Option<&'a [f64]>,
}

/// History read back from a checkpoint; `None` where the file is absent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SavedHistory {
    /// Convection term of the saved step.
    pub convection: Option<Vec<f64>>,
    /// Boundary ghost velocities of the saved step.
    pub ghosts: Option<Vec<f64>>,
}

/// Write fluxes, pressure, forces and history for `step`.
///
/// `lambda` holds the pressure in its first component and, when present,
/// the body forces in the remaining ones. Returns the directory written.
pub fn write_checkpoint(
    root: &Path,
    step: TimeStep,
    q: &FieldVector,
    lambda: &FieldVector,
    history: History<'_>,
) -> Result<PathBuf, IoError> {
    let dir = checkpoint_dir(root, step);
    fs::create_dir_all(&dir).map_err(IoError::io(&dir))?;
    for c in 0..q.num_components() {
        write_vector_file(&dir.join(flux_file(c)), q.component(c))?;
    }
    write_vector_file(&dir.join(PRESSURE_FILE), lambda.component(0))?;
    if lambda.num_components() > 1 {
        let forces = &lambda.as_slice()[lambda.range(0).end..];
        write_vector_file(&dir.join(FORCE_FILE), forces)?;
    }
    if let Some(n) = history.convection {
        write_vector_file(&dir.join(CONVECTION_FILE), n)?;
    }
    if let Some(g) = history.ghosts.filter(|g| !g.is_empty()) {
        write_vector_file(&dir.join(GHOST_FILE), g)?;
    }
    debug!(step = step.0, dir = %dir.display(), "checkpoint written");
    Ok(dir)
}

/// Restore fluxes and pressure/forces of `step` in place, returning
/// whatever history the checkpoint has.
///
/// The lengths of `q` and `lambda` define the expected file sizes;
/// `num_ghosts` is the expected ghost count, zero when there are none.
pub fn read_checkpoint(
    root: &Path,
    step: TimeStep,
    q: &mut FieldVector,
    lambda: &mut FieldVector,
    num_ghosts: usize,
) -> Result<SavedHistory, IoError> {
    let dir = checkpoint_dir(root, step);
    if !dir.is_dir() {
        return Err(IoError::MissingCheckpoint { path: dir });
    }
    for c in 0..q.num_components() {
        let n = q.component(c).len();
        let values = read_vector_file(&dir.join(flux_file(c)), n)?;
        q.component_mut(c).copy_from_slice(&values);
    }
    let phi = read_vector_file(&dir.join(PRESSURE_FILE), lambda.component(0).len())?;
    lambda.component_mut(0).copy_from_slice(&phi);
    if lambda.num_components() > 1 {
        let start = lambda.range(0).end;
        let n = lambda.len() - start;
        let forces = read_vector_file(&dir.join(FORCE_FILE), n)?;
        lambda.as_mut_slice()[start..].copy_from_slice(&forces);
    }
    let path = dir.join(CONVECTION_FILE);
    let convection = if path.is_file() {
        Some(read_vector_file(&path, q.len())?)
    } else {
        warn!(
            step = step.0,
            "checkpoint has no convection history; the first step will be first order"
        );
        None
    };
    let path = dir.join(GHOST_FILE);
    let ghosts = if num_ghosts == 0 {
        None
    } else if path.is_file() {
        Some(read_vector_file(&path, num_ghosts)?)
    } else {
        warn!(
            step = step.0,
            "checkpoint has no boundary ghosts; rebuilding them from the fluxes"
        );
        None
    };
    debug!(step = step.0, dir = %dir.display(), "checkpoint read");
    Ok(SavedHistory { convection, ghosts })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> (FieldVector, FieldVector) {
        let mut q = FieldVector::zeros(&[6, 6]);
        for (i, v) in q.as_mut_slice().iter_mut().enumerate() {
            *v = i as f64 * 0.25;
        }
        let mut lambda = FieldVector::zeros(&[9, 3, 3]);
        for (i, v) in lambda.as_mut_slice().iter_mut().enumerate() {
            *v = -(i as f64);
        }
        (q, lambda)
    }

    #[test]
    fn directory_name_is_zero_padded() {
        let p = checkpoint_dir(Path::new("/run"), TimeStep(250));
        assert_eq!(p, Path::new("/run/0000250"));
    }

    #[test]
    fn checkpoint_round_trips_with_history() {
        let root = tempfile::tempdir().unwrap();
        let (q, lambda) = fields();
        let convection = vec![0.5; q.len()];
        let ghosts = vec![1.0, 0.75, -0.25, 0.0];
        let history = History {
            convection: Some(&convection),
            ghosts: Some(&ghosts),
        };
        let dir = write_checkpoint(root.path(), TimeStep(10), &q, &lambda, history).unwrap();
        assert!(dir.join("qx.dat").is_file());
        assert!(dir.join("qy.dat").is_file());
        assert!(dir.join("fTilde.dat").is_file());
        assert!(dir.join("ghosts.dat").is_file());

        let mut q2 = FieldVector::zeros(&[6, 6]);
        let mut l2 = FieldVector::zeros(&[9, 3, 3]);
        let back = read_checkpoint(root.path(), TimeStep(10), &mut q2, &mut l2, 4).unwrap();
        assert_eq!(q2, q);
        assert_eq!(l2, lambda);
        assert_eq!(back.convection, Some(convection));
        assert_eq!(back.ghosts, Some(ghosts));
    }

    #[test]
    fn missing_history_reads_as_none() {
        let root = tempfile::tempdir().unwrap();
        let (q, lambda) = fields();
        write_checkpoint(root.path(), TimeStep(3), &q, &lambda, History::default()).unwrap();
        let (mut q2, mut l2) = fields();
        let back = read_checkpoint(root.path(), TimeStep(3), &mut q2, &mut l2, 4).unwrap();
        assert_eq!(back, SavedHistory::default());
    }

    #[test]
    fn empty_ghosts_are_not_written() {
        let root = tempfile::tempdir().unwrap();
        let (q, lambda) = fields();
        let history = History {
            convection: None,
            ghosts: Some(&[]),
        };
        let dir = write_checkpoint(root.path(), TimeStep(2), &q, &lambda, history).unwrap();
        assert!(!dir.join("ghosts.dat").exists());
        let (mut q2, mut l2) = fields();
        let back = read_checkpoint(root.path(), TimeStep(2), &mut q2, &mut l2, 0).unwrap();
        assert!(back.ghosts.is_none());
    }

    #[test]
    fn missing_directory_is_reported() {
        let root = tempfile::tempdir().unwrap();
        let (mut q, mut lambda) = fields();
        let err = read_checkpoint(root.path(), TimeStep(7), &mut q, &mut lambda, 0).unwrap_err();
        assert!(matches!(err, IoError::MissingCheckpoint { .. }));
    }

    #[test]
    fn wrong_grid_size_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let (q, lambda) = fields();
        write_checkpoint(root.path(), TimeStep(1), &q, &lambda, History::default()).unwrap();
        let mut q2 = FieldVector::zeros(&[8, 8]);
        let mut l2 = FieldVector::zeros(&[9, 3, 3]);
        let err = read_checkpoint(root.path(), TimeStep(1), &mut q2, &mut l2, 0).unwrap_err();
        assert!(matches!(err, IoError::SizeMismatch { expected: 8, found: 6, .. }));
    }

    #[test]
    fn wrong_ghost_count_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let (q, lambda) = fields();
        let history = History {
            convection: None,
            ghosts: Some(&[0.0; 5]),
        };
        write_checkpoint(root.path(), TimeStep(4), &q, &lambda, history).unwrap();
        let (mut q2, mut l2) = fields();
        let err = read_checkpoint(root.path(), TimeStep(4), &mut q2, &mut l2, 6).unwrap_err();
        assert!(matches!(err, IoError::SizeMismatch { expected: 6, found: 5, .. }));
    }
}
