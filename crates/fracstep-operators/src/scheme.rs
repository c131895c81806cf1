//! Time-integration schemes for the convective and diffusive terms.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Treatment of the convective term.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConvectionScheme {
    /// Explicit Euler: `γ = 1, ζ = 0`.
    EulerExplicit,
    /// Second-order Adams–Bashforth: `γ = 3/2, ζ = -1/2`.
    #[serde(rename = "ADAMS_BASHFORTH_2")]
    AdamsBashforth2,
}

impl ConvectionScheme {
    /// Weights `(γ, ζ)` of the current and previous convection terms.
    ///
    /// Without a previous term (first step of a run without history) the
    /// first-order weights apply.
    pub fn coefficients(self, has_history: bool) -> (f64, f64) {
        match self {
            Self::AdamsBashforth2 if has_history => (1.5, -0.5),
            _ => (1.0, 0.0),
        }
    }
}

/// Treatment of the diffusive term.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiffusionScheme {
    /// Fully explicit: `θ = 0`.
    EulerExplicit,
    /// Fully implicit: `θ = 1`.
    EulerImplicit,
    /// Crank–Nicolson: `θ = 1/2`.
    CrankNicolson,
}

impl DiffusionScheme {
    /// Implicit weight `θ`.
    pub fn theta(self) -> f64 {
        match self {
            Self::EulerExplicit => 0.0,
            Self::EulerImplicit => 1.0,
            Self::CrankNicolson => 0.5,
        }
    }
}

impl fmt::Display for ConvectionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EulerExplicit => "EULER_EXPLICIT",
            Self::AdamsBashforth2 => "ADAMS_BASHFORTH_2",
        })
    }
}

impl fmt::Display for DiffusionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EulerExplicit => "EULER_EXPLICIT",
            Self::EulerImplicit => "EULER_IMPLICIT",
            Self::CrankNicolson => "CRANK_NICOLSON",
        })
    }
}

/// Viscosity and implicit weight of the diffusive term.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiffusionCoefficients {
    /// Kinematic viscosity.
    pub nu: f64,
    /// Implicit weight.
    pub theta: f64,
}

impl DiffusionCoefficients {
    /// Coefficients for a scheme and viscosity.
    pub fn new(scheme: DiffusionScheme, nu: f64) -> Self {
        Self {
            nu,
            theta: scheme.theta(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adams_bashforth_falls_back_without_history() {
        assert_eq!(ConvectionScheme::AdamsBashforth2.coefficients(false), (1.0, 0.0));
        assert_eq!(ConvectionScheme::AdamsBashforth2.coefficients(true), (1.5, -0.5));
        assert_eq!(ConvectionScheme::EulerExplicit.coefficients(true), (1.0, 0.0));
        assert_eq!(DiffusionScheme::CrankNicolson.theta(), 0.5);
        assert_eq!(ConvectionScheme::AdamsBashforth2.to_string(), "ADAMS_BASHFORTH_2");
    }
}
