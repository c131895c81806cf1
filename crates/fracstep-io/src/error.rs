//! Error types for field and log I/O.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors raised while reading or writing run files.
#[derive(Debug)]
pub enum IoError {
    /// An operating-system I/O error on `path`.
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// The file content does not follow the expected format.
    Format {
        /// Offending file.
        path: PathBuf,
        /// What was wrong.
        detail: String,
    },
    /// A vector file holds a different number of entries than the field.
    SizeMismatch {
        /// Offending file.
        path: PathBuf,
        /// Length of the field being restored.
        expected: usize,
        /// Length recorded in the file.
        found: usize,
    },
    /// The checkpoint directory for a restart does not exist.
    MissingCheckpoint {
        /// The directory that was looked for.
        path: PathBuf,
    },
}

impl IoError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::Format {
            path: path.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Format { path, detail } => write!(f, "{}: {detail}", path.display()),
            Self::SizeMismatch {
                path,
                expected,
                found,
            } => write!(
                f,
                "{}: holds {found} entries, the field has {expected}",
                path.display()
            ),
            Self::MissingCheckpoint { path } => {
                write!(f, "checkpoint directory {} does not exist", path.display())
            }
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
