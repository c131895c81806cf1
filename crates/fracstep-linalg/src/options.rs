//! Solver option files.
//!
//! Two line formats are understood:
//!
//! - prefixed flags, one or more per line: `-velocity_ksp_rtol 1e-8
//!   -velocity_pc_type none`. Only keys carrying the requested prefix are
//!   kept, with the prefix stripped. A flag without a value is `true`.
//! - `key=value`, one per line, optionally scoped as `scope:key=value`.
//!   The scope is dropped.
//!
//! In both formats `#` starts a comment and blank lines are skipped. A
//! missing file yields empty options (every backend falls back to its
//! defaults).

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use fracstep_core::ConfigError;
use indexmap::IndexMap;
use tracing::warn;

use crate::error::SolverError;

/// Key/value options for one solver, in file order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SolverOptions {
    source: String,
    entries: IndexMap<String, String>,
}

fn parse_error(path: &Path, line: usize, message: impl Into<String>) -> ConfigError {
    ConfigError::Parse {
        path: path.to_path_buf(),
        line: Some(line),
        message: message.into(),
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(i) => &line[..i],
        None => line,
    }
}

fn is_flag(token: &str) -> bool {
    token.starts_with('-') && token.len() > 1 && token.parse::<f64>().is_err()
}

fn read_optional(path: &Path) -> Result<Option<String>, ConfigError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigError::Parse {
            path: path.to_path_buf(),
            line: None,
            message: e.to_string(),
        }),
    }
}

impl SolverOptions {
    /// Empty options attributed to `source`.
    pub fn empty(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            entries: IndexMap::new(),
        }
    }

    /// Parse prefixed flags from `text`, keeping keys that start with
    /// `-{prefix}`.
    pub fn parse_prefixed(text: &str, prefix: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut opts = Self::empty(format!("{} ({prefix})", path.display()));
        let dashed = format!("-{prefix}");
        for (n, raw) in text.lines().enumerate() {
            let mut tokens = strip_comment(raw).split_whitespace().peekable();
            while let Some(token) = tokens.next() {
                if !is_flag(token) {
                    return Err(parse_error(
                        path,
                        n + 1,
                        format!("expected an option starting with '-', found '{token}'"),
                    ));
                }
                let value = match tokens.peek() {
                    Some(next) if !is_flag(next) => tokens.next().unwrap_or_default(),
                    _ => "true",
                };
                if let Some(key) = token.strip_prefix(&dashed) {
                    if key.is_empty() {
                        return Err(parse_error(path, n + 1, format!("empty key in '{token}'")));
                    }
                    opts.entries.insert(key.to_string(), value.to_string());
                }
            }
        }
        Ok(opts)
    }

    /// Parse `[scope:]key=value` lines from `text`.
    pub fn parse_key_value(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut opts = Self::empty(path.display().to_string());
        for (n, raw) in text.lines().enumerate() {
            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }
            let Some((lhs, rhs)) = line.split_once('=') else {
                return Err(parse_error(path, n + 1, format!("expected key=value, found '{line}'")));
            };
            let key = match lhs.rsplit_once(':') {
                Some((_, k)) => k.trim(),
                None => lhs.trim(),
            };
            let value = rhs.trim();
            if key.is_empty() || value.is_empty() {
                return Err(parse_error(path, n + 1, format!("empty key or value in '{line}'")));
            }
            opts.entries.insert(key.to_string(), value.to_string());
        }
        Ok(opts)
    }

    /// Read a prefixed-flag file; a missing file yields empty options.
    pub fn load_prefixed(path: impl AsRef<Path>, prefix: &str) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match read_optional(path)? {
            Some(text) => Self::parse_prefixed(&text, prefix, path),
            None => Ok(Self::empty(format!("{} ({prefix})", path.display()))),
        }
    }

    /// Read a key=value file; a missing file yields empty options.
    pub fn load_key_value(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match read_optional(path)? {
            Some(text) => Self::parse_key_value(&text, path),
            None => Ok(Self::empty(path.display().to_string())),
        }
    }

    /// Where these options came from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no options were given.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Set (or replace) an option.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Raw value of `key`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Entries in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn invalid(&self, key: &str, value: &str, reason: impl Into<String>) -> SolverError {
        SolverError::InvalidOption {
            source: self.source.clone(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    fn get_parsed<T: FromStr>(&self, key: &str, what: &str) -> Result<Option<T>, SolverError> {
        match self.get_str(key) {
            None => Ok(None),
            Some(v) => v
                .parse()
                .map(Some)
                .map_err(|_| self.invalid(key, v, format!("expected {what}"))),
        }
    }

    /// Floating-point value of `key`, if present.
    pub fn get_f64(&self, key: &str) -> Result<Option<f64>, SolverError> {
        self.get_parsed(key, "a number")
    }

    /// Non-negative integer value of `key`, if present.
    pub fn get_usize(&self, key: &str) -> Result<Option<usize>, SolverError> {
        self.get_parsed(key, "a non-negative integer")
    }

    /// Boolean value of `key`, if present.
    ///
    /// Accepts `true/false`, `yes/no`, `1/0` in any case.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, SolverError> {
        match self.get_str(key) {
            None => Ok(None),
            Some(v) => match v.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(Some(true)),
                "false" | "no" | "0" => Ok(Some(false)),
                _ => Err(self.invalid(key, v, "expected a boolean")),
            },
        }
    }

    /// Warn about every key not in `known`.
    ///
    /// Unknown keys are not an error: option files are shared with
    /// settings this backend does not implement.
    pub fn warn_unknown(&self, known: &[&str]) {
        for key in self.entries.keys() {
            if !known.contains(&key.as_str()) {
                warn!(source = %self.source, key = %key, "ignoring unrecognized solver option");
            }
        }
    }
}

/// Path of a file inside a simulation directory.
pub fn option_file(directory: &Path, name: &str) -> PathBuf {
    directory.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p() -> &'static Path {
        Path::new("solversPetscOptions.info")
    }

    #[test]
    fn prefixed_flags_filter_by_prefix() {
        let text = "# velocity\n-velocity_ksp_rtol 1e-8 -velocity_pc_type none\n\
                    -poisson_ksp_rtol 1e-6\n-poisson_ksp_initial_guess_nonzero\n";
        let v = SolverOptions::parse_prefixed(text, "velocity_", p()).unwrap();
        assert_eq!(v.len(), 2);
        assert_eq!(v.get_f64("ksp_rtol").unwrap(), Some(1e-8));
        assert_eq!(v.get_str("pc_type"), Some("none"));

        let q = SolverOptions::parse_prefixed(text, "poisson_", p()).unwrap();
        assert_eq!(q.get_f64("ksp_rtol").unwrap(), Some(1e-6));
        assert_eq!(q.get_bool("ksp_initial_guess_nonzero").unwrap(), Some(true));
    }

    #[test]
    fn negative_numbers_are_values() {
        let v = SolverOptions::parse_prefixed("-velocity_shift -1.5", "velocity_", p()).unwrap();
        assert_eq!(v.get_f64("shift").unwrap(), Some(-1.5));
    }

    #[test]
    fn stray_token_reports_line() {
        let err = SolverOptions::parse_prefixed("\n\nksp_rtol 1e-3", "velocity_", p()).unwrap_err();
        match err {
            ConfigError::Parse { line, .. } => assert_eq!(line, Some(3)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn key_value_with_scope() {
        let text = "config_version=2\nmain:solver = PCG # outer\n\nmain:max_iters=50\n";
        let o = SolverOptions::parse_key_value(text, Path::new("v.info")).unwrap();
        assert_eq!(o.get_str("solver"), Some("PCG"));
        assert_eq!(o.get_usize("max_iters").unwrap(), Some(50));
        let keys: Vec<_> = o.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["config_version", "solver", "max_iters"]);
    }

    #[test]
    fn key_value_rejects_missing_equals() {
        let err = SolverOptions::parse_key_value("a=1\nbroken\n", Path::new("p.info")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: Some(2), .. }));
    }

    #[test]
    fn bad_values_are_solver_errors() {
        let mut o = SolverOptions::empty("test");
        o.set("max_iters", "many").set("flag", "maybe");
        assert!(matches!(
            o.get_usize("max_iters"),
            Err(SolverError::InvalidOption { .. })
        ));
        assert!(o.get_bool("flag").is_err());
        assert_eq!(o.get_f64("absent").unwrap(), None);
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let o = SolverOptions::load_key_value(dir.path().join("nope.info")).unwrap();
        assert!(o.is_empty());
        let path = option_file(dir.path(), "solversPetscOptions.info");
        std::fs::write(&path, "-velocity_ksp_max_it 7\n").unwrap();
        let o = SolverOptions::load_prefixed(&path, "velocity_").unwrap();
        assert_eq!(o.get_usize("ksp_max_it").unwrap(), Some(7));
    }
}
