//! Strongly-typed identifiers: time steps, axes and the spatial dimension.

use std::fmt;

use crate::error::ConfigError;

/// Monotonically increasing time-step counter.
///
/// Incremented once per call to `step_time()`. Drives the save cadence,
/// the termination test and the checkpoint directory names.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeStep(pub u64);

impl TimeStep {
    /// The following step.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Whether this step falls on a save boundary for the given cadence.
    ///
    /// A cadence of zero never saves.
    pub fn is_multiple_of(self, cadence: u64) -> bool {
        cadence != 0 && self.0 % cadence == 0
    }
}

impl fmt::Display for TimeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TimeStep {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// A Cartesian axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    /// The x axis (index 0).
    X,
    /// The y axis (index 1).
    Y,
    /// The z axis (index 2).
    Z,
}

impl Axis {
    /// All three axes in index order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Zero-based index of the axis.
    pub fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    /// Axis from its zero-based index, if in range.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Lower-case axis letter.
    pub fn name(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        }
    }

    /// Conventional name of the velocity component normal to this axis.
    pub fn component_name(self) -> &'static str {
        match self {
            Self::X => "u",
            Self::Y => "v",
            Self::Z => "w",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Spatial dimension of a simulation, checked at runtime.
///
/// Code that depends on the dimension iterates over [`Dim::axes`] rather
/// than branching, so 2D and 3D share one implementation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dim {
    /// Two spatial dimensions (x, y).
    Two,
    /// Three spatial dimensions (x, y, z).
    Three,
}

impl Dim {
    /// Build from a dimension count, rejecting anything but 2 or 3.
    pub fn from_count(count: usize) -> Result<Self, ConfigError> {
        match count {
            2 => Ok(Self::Two),
            3 => Ok(Self::Three),
            other => Err(ConfigError::Invalid {
                context: "dimensions".into(),
                reason: format!("expected 2 or 3, got {other}"),
            }),
        }
    }

    /// Number of spatial dimensions.
    pub fn count(self) -> usize {
        match self {
            Self::Two => 2,
            Self::Three => 3,
        }
    }

    /// Active axes in index order.
    pub fn axes(self) -> &'static [Axis] {
        &Axis::ALL[..self.count()]
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}D", self.count())
    }
}
