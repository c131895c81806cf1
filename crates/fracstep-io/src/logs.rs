//! Text outputs: the grid file and the per-step run logs.

use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use fracstep_core::TimeStep;
use fracstep_grid::CartesianMesh;

use crate::error::IoError;

/// Name of the grid file inside the simulation directory.
pub const GRID_FILE: &str = "grid.txt";
/// Name of the iteration-count log.
pub const ITERATION_LOG: &str = "iterationCounts.txt";
/// Name of the body-force log.
pub const FORCE_LOG: &str = "forces.txt";

/// Write `grid.txt`: the tab-separated cell counts, then every node
/// coordinate of each direction, one per line.
pub fn write_grid(dir: &Path, mesh: &CartesianMesh) -> Result<PathBuf, IoError> {
    let path = dir.join(GRID_FILE);
    let axes = mesh.dim().axes();
    let mut text = axes
        .iter()
        .map(|&a| mesh.cells(a).to_string())
        .collect::<Vec<_>>()
        .join("\t");
    text.push('\n');
    for &axis in axes {
        for x in mesh.nodes(axis) {
            let _ = writeln!(text, "{x}");
        }
    }
    std::fs::write(&path, text).map_err(IoError::io(&path))?;
    Ok(path)
}

/// Tab-separated log with one line per time step.
#[derive(Debug)]
struct StepLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl StepLog {
    fn open(path: PathBuf, fresh: bool) -> Result<Self, IoError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(!fresh)
            .truncate(fresh)
            .open(&path)
            .map_err(IoError::io(&path))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    fn write_line(&mut self, line: &str) -> Result<(), IoError> {
        writeln!(self.writer, "{line}").map_err(IoError::io(&self.path))
    }

    fn flush(&mut self) -> Result<(), IoError> {
        self.writer.flush().map_err(IoError::io(&self.path))
    }
}

/// `iterationCounts.txt`: `step, velocity iterations, Poisson iterations`.
#[derive(Debug)]
pub struct IterationLog {
    log: StepLog,
}

impl IterationLog {
    /// Open the log in `dir`; a fresh run truncates it, a restart appends.
    pub fn open(dir: &Path, fresh: bool) -> Result<Self, IoError> {
        Ok(Self {
            log: StepLog::open(dir.join(ITERATION_LOG), fresh)?,
        })
    }

    /// Record the iteration counts of `step`.
    pub fn record(&mut self, step: TimeStep, velocity: usize, poisson: usize) -> Result<(), IoError> {
        self.log.write_line(&format!("{step}\t{velocity}\t{poisson}"))
    }

    /// Flush buffered lines to disk.
    pub fn flush(&mut self) -> Result<(), IoError> {
        self.log.flush()
    }

    /// Location of the log.
    pub fn path(&self) -> &Path {
        &self.log.path
    }
}

/// `forces.txt`: `step, Fx, Fy[, Fz]` for immersed-boundary runs.
#[derive(Debug)]
pub struct ForceLog {
    log: StepLog,
}

impl ForceLog {
    /// Open the log in `dir`; a fresh run truncates it, a restart appends.
    pub fn open(dir: &Path, fresh: bool) -> Result<Self, IoError> {
        Ok(Self {
            log: StepLog::open(dir.join(FORCE_LOG), fresh)?,
        })
    }

    /// Record the total body force of `step`.
    pub fn record(&mut self, step: TimeStep, force: &[f64]) -> Result<(), IoError> {
        let mut line = step.to_string();
        for f in force {
            let _ = write!(line, "\t{f}");
        }
        self.log.write_line(&line)
    }

    /// Flush buffered lines to disk.
    pub fn flush(&mut self) -> Result<(), IoError> {
        self.log.flush()
    }

    /// Location of the log.
    pub fn path(&self) -> &Path {
        &self.log.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fracstep_core::Dim;

    #[test]
    fn grid_file_lists_counts_then_nodes() {
        let dir = tempfile::tempdir().unwrap();
        let mesh = CartesianMesh::uniform(Dim::Two, &[2, 4], &[1.0, 2.0]).unwrap();
        let path = write_grid(dir.path(), &mesh).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "2\t4");
        assert_eq!(lines.len(), 1 + 3 + 5);
        assert_eq!(lines[1], "0");
        assert_eq!(lines[3], "1");
        assert_eq!(lines[8], "2");
    }

    #[test]
    fn restart_appends_fresh_run_truncates() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut log = IterationLog::open(dir.path(), true).unwrap();
            log.record(TimeStep(1), 5, 12).unwrap();
            log.record(TimeStep(2), 4, 11).unwrap();
        }
        {
            let mut log = IterationLog::open(dir.path(), false).unwrap();
            log.record(TimeStep(3), 4, 10).unwrap();
            log.flush().unwrap();
        }
        let text = std::fs::read_to_string(dir.path().join(ITERATION_LOG)).unwrap();
        assert_eq!(text, "1\t5\t12\n2\t4\t11\n3\t4\t10\n");

        let log = IterationLog::open(dir.path(), true).unwrap();
        drop(log);
        let text = std::fs::read_to_string(dir.path().join(ITERATION_LOG)).unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn force_lines_are_tab_separated() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = ForceLog::open(dir.path(), true).unwrap();
        log.record(TimeStep(8), &[1.5, -0.25]).unwrap();
        log.flush().unwrap();
        let text = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(text, "8\t1.5\t-0.25\n");
    }
}
