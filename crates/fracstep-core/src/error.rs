//! Configuration error shared by every crate that reads user input.
//!
//! Configuration problems are fatal at initialization time and are always
//! reported with enough location context (file, line, face, key) to find
//! the offending entry.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// A malformed or inconsistent configuration.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// A value is structurally valid but violates a constraint.
    Invalid {
        /// Where the value came from (key path or object name).
        context: String,
        /// Description of the violated constraint.
        reason: String,
    },
    /// A boundary face names a condition kind that does not exist.
    UnknownBoundaryKind {
        /// Face and component, e.g. `xMinus/u`.
        location: String,
        /// The unrecognized kind as written.
        kind: String,
    },
    /// A configuration file could not be parsed.
    Parse {
        /// The file being parsed.
        path: PathBuf,
        /// One-based line number, when the parser knows it.
        line: Option<usize>,
        /// Parser message.
        message: String,
    },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::Invalid`].
    pub fn invalid(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            context: context.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid { context, reason } => write!(f, "invalid {context}: {reason}"),
            Self::UnknownBoundaryKind { location, kind } => {
                write!(f, "unknown boundary condition kind '{kind}' at {location}")
            }
            Self::Parse {
                path,
                line,
                message,
            } => {
                write!(f, "{}", path.display())?;
                if let Some(line) = line {
                    write!(f, ":{line}")?;
                }
                write!(f, ": {message}")
            }
        }
    }
}

impl Error for ConfigError {}
