//! Boundary-condition metadata for the six domain faces.
//!
//! Every face carries one condition per velocity component. Periodicity is
//! a property of an axis: both faces and every component must agree, which
//! [`BoundaryConditions::validate`] enforces.

use std::fmt;

use fracstep_core::{Axis, ConfigError, Dim};

use crate::edge::EdgeBehavior;

/// Which end of an axis a face sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// The low-coordinate end.
    Minus,
    /// The high-coordinate end.
    Plus,
}

/// One of the six faces of the rectangular domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoundaryLocation {
    /// Low-x face.
    XMinus,
    /// High-x face.
    XPlus,
    /// Low-y face.
    YMinus,
    /// High-y face.
    YPlus,
    /// Low-z face.
    ZMinus,
    /// High-z face.
    ZPlus,
}

impl BoundaryLocation {
    /// All faces in index order.
    pub const ALL: [BoundaryLocation; 6] = [
        Self::XMinus,
        Self::XPlus,
        Self::YMinus,
        Self::YPlus,
        Self::ZMinus,
        Self::ZPlus,
    ];

    /// Face on the given axis and side.
    pub fn new(axis: Axis, side: Side) -> Self {
        match (axis, side) {
            (Axis::X, Side::Minus) => Self::XMinus,
            (Axis::X, Side::Plus) => Self::XPlus,
            (Axis::Y, Side::Minus) => Self::YMinus,
            (Axis::Y, Side::Plus) => Self::YPlus,
            (Axis::Z, Side::Minus) => Self::ZMinus,
            (Axis::Z, Side::Plus) => Self::ZPlus,
        }
    }

    /// Faces that exist for the given dimension.
    pub fn for_dim(dim: Dim) -> &'static [BoundaryLocation] {
        &Self::ALL[..2 * dim.count()]
    }

    /// Zero-based index (0..6).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Axis normal to the face.
    pub fn axis(self) -> Axis {
        match self {
            Self::XMinus | Self::XPlus => Axis::X,
            Self::YMinus | Self::YPlus => Axis::Y,
            Self::ZMinus | Self::ZPlus => Axis::Z,
        }
    }

    /// Which end of the axis the face sits on.
    pub fn side(self) -> Side {
        match self {
            Self::XMinus | Self::YMinus | Self::ZMinus => Side::Minus,
            Self::XPlus | Self::YPlus | Self::ZPlus => Side::Plus,
        }
    }

    /// Configuration-file name of the face (`xMinus`, `yPlus`, ...).
    pub fn name(self) -> &'static str {
        match self {
            Self::XMinus => "xMinus",
            Self::XPlus => "xPlus",
            Self::YMinus => "yMinus",
            Self::YPlus => "yPlus",
            Self::ZMinus => "zMinus",
            Self::ZPlus => "zPlus",
        }
    }

    /// Parse a face name, case-insensitively.
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .into_iter()
            .find(|loc| loc.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                ConfigError::invalid("boundary location", format!("unknown face '{name}'"))
            })
    }
}

impl fmt::Display for BoundaryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of boundary condition applied to one velocity component on one face.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoundaryKind {
    /// Prescribed value.
    Dirichlet,
    /// Prescribed derivative along the axis.
    Neumann,
    /// Outflow advected with a prescribed convective speed.
    Convective,
    /// Wrap-around to the opposite face.
    Periodic,
}

impl BoundaryKind {
    /// Parse a kind as written in the flow description.
    ///
    /// `location` names the face and component for the error message.
    pub fn parse(kind: &str, location: &str) -> Result<Self, ConfigError> {
        match kind.to_ascii_uppercase().as_str() {
            "DIRICHLET" => Ok(Self::Dirichlet),
            "NEUMANN" => Ok(Self::Neumann),
            "CONVECTIVE" => Ok(Self::Convective),
            "PERIODIC" => Ok(Self::Periodic),
            _ => Err(ConfigError::UnknownBoundaryKind {
                location: location.to_string(),
                kind: kind.to_string(),
            }),
        }
    }

    /// Upper-case configuration name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Dirichlet => "DIRICHLET",
            Self::Neumann => "NEUMANN",
            Self::Convective => "CONVECTIVE",
            Self::Periodic => "PERIODIC",
        }
    }
}

/// A single condition: kind plus its scalar parameter.
///
/// The value is the prescribed velocity (Dirichlet), derivative along the
/// axis (Neumann) or convective speed (Convective); it is unused for
/// periodic faces.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundaryCondition {
    /// Condition kind.
    pub kind: BoundaryKind,
    /// Scalar parameter of the condition.
    pub value: f64,
}

impl BoundaryCondition {
    /// Dirichlet condition with the given value.
    pub fn dirichlet(value: f64) -> Self {
        Self {
            kind: BoundaryKind::Dirichlet,
            value,
        }
    }

    /// Periodic condition.
    pub fn periodic() -> Self {
        Self {
            kind: BoundaryKind::Periodic,
            value: 0.0,
        }
    }
}

/// Conditions for every face and velocity component of a domain.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundaryConditions {
    dim: Dim,
    faces: [[BoundaryCondition; 3]; 6],
}

impl BoundaryConditions {
    /// No-slip walls (homogeneous Dirichlet) on every face.
    pub fn no_slip(dim: Dim) -> Self {
        Self {
            dim,
            faces: [[BoundaryCondition::dirichlet(0.0); 3]; 6],
        }
    }

    /// Periodic on every face.
    pub fn periodic(dim: Dim) -> Self {
        Self {
            dim,
            faces: [[BoundaryCondition::periodic(); 3]; 6],
        }
    }

    /// Spatial dimension these conditions apply to.
    pub fn dim(&self) -> Dim {
        self.dim
    }

    /// Condition for `component` (0 = u, 1 = v, 2 = w) on `location`.
    pub fn get(&self, location: BoundaryLocation, component: usize) -> BoundaryCondition {
        self.faces[location.index()][component]
    }

    /// Replace the condition for `component` on `location`.
    pub fn set(&mut self, location: BoundaryLocation, component: usize, bc: BoundaryCondition) {
        self.faces[location.index()][component] = bc;
    }

    /// Whether `axis` is periodic.
    pub fn is_periodic(&self, axis: Axis) -> bool {
        self.get(BoundaryLocation::new(axis, Side::Minus), 0).kind == BoundaryKind::Periodic
    }

    /// Edge behavior of `axis`; inactive axes are treated as bounded.
    pub fn edge(&self, axis: Axis) -> EdgeBehavior {
        if axis.index() < self.dim.count() && self.is_periodic(axis) {
            EdgeBehavior::Wrap
        } else {
            EdgeBehavior::Bounded
        }
    }

    /// Whether every active axis is periodic.
    pub fn fully_periodic(&self) -> bool {
        self.dim.axes().iter().all(|&a| self.is_periodic(a))
    }

    /// Check that periodicity is declared consistently per axis.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ncomp = self.dim.count();
        for &axis in self.dim.axes() {
            let minus = BoundaryLocation::new(axis, Side::Minus);
            let plus = BoundaryLocation::new(axis, Side::Plus);
            let periodic = self.is_periodic(axis);
            for loc in [minus, plus] {
                for c in 0..ncomp {
                    let bc = self.get(loc, c);
                    if (bc.kind == BoundaryKind::Periodic) != periodic {
                        return Err(ConfigError::invalid(
                            format!("boundary {loc}/{}", Axis::ALL[c].component_name()),
                            format!(
                                "axis {axis} must be periodic on both faces and all components or on none"
                            ),
                        ));
                    }
                    if !bc.value.is_finite() {
                        return Err(ConfigError::invalid(
                            format!("boundary {loc}/{}", Axis::ALL[c].component_name()),
                            "value must be finite",
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}
