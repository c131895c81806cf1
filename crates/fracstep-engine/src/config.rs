//! Simulation descriptors read from the YAML files of a case directory.
//!
//! A case directory holds:
//!
//! - `cartesianMesh.yaml`: one entry per direction with its start
//!   coordinate and stretched sub-domains;
//! - `flowDescription.yaml`: dimension, viscosity, initial state and
//!   boundary conditions;
//! - `simulationParameters.yaml`: time stepping, schemes and solver
//!   backends;
//! - `bodies.yaml`: immersed-boundary runs only.
//!
//! The raw descriptors mirror the files one to one. [`SimulationConfig`]
//! resolves them into the mesh, boundary conditions and body the engine
//! works with, and validates every cross-file constraint up front.

use std::fs;
use std::path::{Path, PathBuf};

use fracstep_core::{Axis, ConfigError, Dim};
use fracstep_grid::{
    BoundaryCondition, BoundaryConditions, BoundaryKind, BoundaryLocation, CartesianMesh,
    StretchedSegment,
};
use fracstep_operators::{Body, ConvectionScheme, DiffusionScheme};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

/// Mesh descriptor file.
pub const MESH_FILE: &str = "cartesianMesh.yaml";
/// Flow descriptor file.
pub const FLOW_FILE: &str = "flowDescription.yaml";
/// Run-parameter file.
pub const PARAMETERS_FILE: &str = "simulationParameters.yaml";
/// Immersed-body file.
pub const BODIES_FILE: &str = "bodies.yaml";

// ── Raw descriptors ─────────────────────────────────────────────

/// One direction of `cartesianMesh.yaml`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MeshDirection {
    /// `x`, `y` or `z`.
    pub direction: String,
    /// Coordinate of the first node.
    pub start: f64,
    /// Consecutive segments, each ending where the next starts.
    pub sub_domains: Vec<SubDomain>,
}

/// A stretched segment of one direction.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubDomain {
    /// End coordinate.
    pub end: f64,
    /// Number of cells.
    pub cells: usize,
    /// Width ratio of consecutive cells.
    #[serde(default = "unit_ratio")]
    pub stretch_ratio: f64,
}

fn unit_ratio() -> f64 {
    1.0
}

/// A `[KIND, value]` pair as written in the flow description.
pub type RawCondition = (String, f64);

/// One face of `boundaryConditions`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct BoundaryEntry {
    /// Face name, e.g. `xMinus`.
    pub location: String,
    /// Condition on the x component.
    #[serde(default)]
    pub u: Option<RawCondition>,
    /// Condition on the y component.
    #[serde(default)]
    pub v: Option<RawCondition>,
    /// Condition on the z component.
    #[serde(default)]
    pub w: Option<RawCondition>,
}

/// `flowDescription.yaml`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlowDescription {
    /// 2 or 3.
    pub dimensions: usize,
    /// Kinematic viscosity.
    pub nu: f64,
    /// Uniform initial velocity, one entry per direction.
    #[serde(default)]
    pub initial_velocity: Vec<f64>,
    /// `[amplitude, frequency]` of the initial perturbation.
    #[serde(default)]
    pub initial_perturbation: Option<[f64; 2]>,
    /// Face conditions; faces left out are no-slip walls.
    #[serde(default)]
    pub boundary_conditions: Vec<BoundaryEntry>,
}

/// Immersed-boundary treatment.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IbmScheme {
    /// Plain Navier–Stokes, no body.
    #[default]
    NavierStokes,
    /// Body forces as Lagrange multipliers (Taira and Colonius).
    TairaColonius,
}

/// Backend family of a linear system.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
pub enum SolveType {
    /// Krylov solver configured from `solversPetscOptions.info`.
    #[default]
    #[serde(rename = "CPU")]
    Cpu,
    /// Multigrid solver configured from `solversAmgXOptions_*.info`.
    #[serde(rename = "GPU")]
    Gpu,
}

/// `simulationParameters.yaml`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimulationParameters {
    /// Time increment.
    pub dt: f64,
    /// Step to start from; nonzero restarts from that checkpoint.
    #[serde(default)]
    pub start_step: u64,
    /// Number of steps to take.
    pub nt: u64,
    /// Checkpoint cadence in steps.
    pub nsave: u64,
    /// Immersed-boundary treatment.
    #[serde(default)]
    pub ibm_scheme: IbmScheme,
    /// Convection time scheme.
    #[serde(default = "default_convection")]
    pub convection: ConvectionScheme,
    /// Diffusion time scheme.
    #[serde(default = "default_diffusion")]
    pub diffusion: DiffusionScheme,
    /// Backend of the velocity system.
    #[serde(default)]
    pub velocity_solve_type: SolveType,
    /// Backend of the pressure/force system.
    #[serde(default)]
    pub poisson_solve_type: SolveType,
    /// Number of ranks the operators are partitioned over.
    #[serde(default = "one_rank")]
    pub ranks: usize,
    /// Dump the assembled operators after initialization.
    #[serde(default)]
    pub output_operators: bool,
}

fn default_convection() -> ConvectionScheme {
    ConvectionScheme::AdamsBashforth2
}

fn default_diffusion() -> DiffusionScheme {
    DiffusionScheme::CrankNicolson
}

fn one_rank() -> usize {
    1
}

impl SimulationParameters {
    /// Check the numeric constraints of the run parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. dt must be finite and positive.
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(ConfigError::invalid(
                "dt",
                format!("must be finite and positive, got {}", self.dt),
            ));
        }
        // 2. Checkpoint cadence >= 1.
        if self.nsave == 0 {
            return Err(ConfigError::invalid("nsave", "must be at least 1"));
        }
        // 3. At least one rank.
        if self.ranks == 0 {
            return Err(ConfigError::invalid("ranks", "must be at least 1"));
        }
        // 4. The final step must be representable.
        if self.start_step.checked_add(self.nt).is_none() {
            return Err(ConfigError::invalid("nt", "startStep + nt overflows"));
        }
        Ok(())
    }
}

/// One entry of `bodies.yaml`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BodyEntry {
    /// Only `points` is supported.
    #[serde(rename = "type")]
    pub kind: String,
    /// Points file relative to the case directory.
    #[serde(default)]
    pub points_file: Option<String>,
    /// Inline point coordinates.
    #[serde(default)]
    pub points: Option<Vec<Vec<f64>>>,
}

// ── YAML loading ────────────────────────────────────────────────

fn read_text(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        line: None,
        message: e.to_string(),
    })
}

/// Deserialize a YAML document, reporting the line of the failure.
pub fn parse_yaml<T: DeserializeOwned>(text: &str, path: &Path) -> Result<T, ConfigError> {
    serde_yaml::from_str(text).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        line: e.location().map(|l| l.line()),
        message: e.to_string(),
    })
}

fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    parse_yaml(&read_text(path)?, path)
}

// ── Resolution ──────────────────────────────────────────────────

/// Build the mesh from its per-direction descriptors.
pub fn build_mesh(dim: Dim, directions: &[MeshDirection]) -> Result<CartesianMesh, ConfigError> {
    let mut axes: [Option<(f64, Vec<StretchedSegment>)>; 3] = [None, None, None];
    for d in directions {
        let axis = Axis::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(&d.direction))
            .ok_or_else(|| {
                ConfigError::invalid("mesh direction", format!("unknown '{}'", d.direction))
            })?;
        if axis.index() >= dim.count() {
            return Err(ConfigError::invalid(
                format!("mesh direction {axis}"),
                format!("not used by a {}D run", dim.count()),
            ));
        }
        let slot = &mut axes[axis.index()];
        if slot.is_some() {
            return Err(ConfigError::invalid(
                format!("mesh direction {axis}"),
                "declared twice",
            ));
        }
        let segments = d
            .sub_domains
            .iter()
            .map(|s| StretchedSegment {
                end: s.end,
                cells: s.cells,
                stretch_ratio: s.stretch_ratio,
            })
            .collect();
        *slot = Some((d.start, segments));
    }
    let mut resolved = Vec::with_capacity(dim.count());
    for &axis in dim.axes() {
        let entry = axes[axis.index()]
            .take()
            .ok_or_else(|| ConfigError::invalid(format!("mesh direction {axis}"), "missing"))?;
        resolved.push(entry);
    }
    CartesianMesh::from_segments(dim, &resolved)
}

/// Resolve face entries over a no-slip default.
pub fn build_boundary_conditions(
    dim: Dim,
    entries: &[BoundaryEntry],
) -> Result<BoundaryConditions, ConfigError> {
    let mut bcs = BoundaryConditions::no_slip(dim);
    for entry in entries {
        let location = BoundaryLocation::parse(&entry.location)?;
        if location.axis().index() >= dim.count() {
            return Err(ConfigError::invalid(
                format!("boundary {location}"),
                format!("not a face of a {}D domain", dim.count()),
            ));
        }
        let given = [&entry.u, &entry.v, &entry.w];
        for (c, raw) in given.iter().enumerate() {
            let name = format!("{location}/{}", Axis::ALL[c].component_name());
            match (raw, c < dim.count()) {
                (Some((kind, value)), true) => {
                    let kind = BoundaryKind::parse(kind, &name)?;
                    bcs.set(location, c, BoundaryCondition { kind, value: *value });
                }
                (None, true) => {
                    return Err(ConfigError::invalid(format!("boundary {name}"), "missing"));
                }
                (Some(_), false) => {
                    return Err(ConfigError::invalid(
                        format!("boundary {name}"),
                        format!("no such component in {}D", dim.count()),
                    ));
                }
                (None, false) => {}
            }
        }
    }
    bcs.validate()?;
    Ok(bcs)
}

fn build_body(dim: Dim, directory: &Path, entries: &[BodyEntry]) -> Result<Body, ConfigError> {
    let mut points = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        if !entry.kind.eq_ignore_ascii_case("points") {
            return Err(ConfigError::invalid(
                format!("body {i}"),
                format!("unsupported type '{}'", entry.kind),
            ));
        }
        match (&entry.points_file, &entry.points) {
            (Some(file), None) => {
                let path = directory.join(file);
                let body = Body::parse_points(dim, &read_text(&path)?, &path)?;
                points.extend_from_slice(body.points());
            }
            (None, Some(inline)) => {
                for (k, p) in inline.iter().enumerate() {
                    if p.len() != dim.count() {
                        return Err(ConfigError::invalid(
                            format!("body {i} point {k}"),
                            format!("expected {} coordinates, found {}", dim.count(), p.len()),
                        ));
                    }
                    let mut xyz = [0.0; 3];
                    xyz[..p.len()].copy_from_slice(p);
                    points.push(xyz);
                }
            }
            _ => {
                return Err(ConfigError::invalid(
                    format!("body {i}"),
                    "give exactly one of pointsFile and points",
                ))
            }
        }
    }
    Body::new(dim, points)
}

/// Resolved flow settings.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowSettings {
    /// Kinematic viscosity.
    pub nu: f64,
    /// Initial velocity per component; unused components are zero.
    pub initial_velocity: [f64; 3],
    /// `(amplitude, frequency)` of the initial perturbation.
    pub perturbation: Option<(f64, f64)>,
    /// Face conditions.
    pub bcs: BoundaryConditions,
}

/// Everything a run needs, resolved and validated.
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    /// Case directory; outputs are written here.
    pub directory: PathBuf,
    /// The mesh.
    pub mesh: CartesianMesh,
    /// Viscosity, initial state and boundary conditions.
    pub flow: FlowSettings,
    /// Run parameters.
    pub parameters: SimulationParameters,
    /// The immersed body of a Taira–Colonius run.
    pub body: Option<Body>,
}

impl SimulationConfig {
    /// Read and resolve every descriptor of `directory`.
    pub fn load(directory: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let directory = directory.into();
        let flow: FlowDescription = load_yaml(&directory.join(FLOW_FILE))?;
        let mesh: Vec<MeshDirection> = load_yaml(&directory.join(MESH_FILE))?;
        let parameters: SimulationParameters = load_yaml(&directory.join(PARAMETERS_FILE))?;
        let body = match parameters.ibm_scheme {
            IbmScheme::NavierStokes => None,
            IbmScheme::TairaColonius => {
                let dim = Dim::from_count(flow.dimensions)?;
                let entries: Vec<BodyEntry> = load_yaml(&directory.join(BODIES_FILE))?;
                Some(build_body(dim, &directory, &entries)?)
            }
        };
        let config = Self::from_descriptors(directory, &flow, &mesh, parameters, body)?;
        info!(
            directory = %config.directory.display(),
            dim = config.mesh.dim().count(),
            cells = ?config.mesh.cell_counts(),
            body_points = config.body.as_ref().map_or(0, Body::len),
            "simulation configured"
        );
        Ok(config)
    }

    /// Resolve already-parsed descriptors.
    pub fn from_descriptors(
        directory: PathBuf,
        flow: &FlowDescription,
        mesh: &[MeshDirection],
        parameters: SimulationParameters,
        body: Option<Body>,
    ) -> Result<Self, ConfigError> {
        let dim = Dim::from_count(flow.dimensions)?;
        // 1. Viscosity must be finite and non-negative.
        if !flow.nu.is_finite() || flow.nu < 0.0 {
            return Err(ConfigError::invalid(
                "nu",
                format!("must be finite and non-negative, got {}", flow.nu),
            ));
        }
        // 2. Initial velocity: none, or one value per direction.
        let mut initial_velocity = [0.0; 3];
        match flow.initial_velocity.len() {
            0 => {}
            n if n == dim.count() => initial_velocity[..n].copy_from_slice(&flow.initial_velocity),
            n => {
                return Err(ConfigError::invalid(
                    "initialVelocity",
                    format!("expected {} values, found {n}", dim.count()),
                ))
            }
        }
        // 3. Perturbation frequency must be positive.
        let perturbation = match flow.initial_perturbation {
            Some([amplitude, frequency]) => {
                if !(frequency > 0.0) || !amplitude.is_finite() {
                    return Err(ConfigError::invalid(
                        "initialPerturbation",
                        "needs a finite amplitude and a positive frequency",
                    ));
                }
                Some((amplitude, frequency))
            }
            None => None,
        };
        // 4. Run parameters.
        parameters.validate()?;
        // 5. A Taira–Colonius run needs a body.
        if parameters.ibm_scheme == IbmScheme::TairaColonius && body.is_none() {
            return Err(ConfigError::invalid("ibmScheme", "TAIRA_COLONIUS needs a body"));
        }
        let bcs = build_boundary_conditions(dim, &flow.boundary_conditions)?;
        let mesh = build_mesh(dim, mesh)?;
        debug!(?initial_velocity, ?perturbation, "flow description resolved");
        Ok(Self {
            directory,
            mesh,
            flow: FlowSettings {
                nu: flow.nu,
                initial_velocity,
                perturbation,
                bcs,
            },
            parameters,
            body,
        })
    }

    /// Spatial dimension.
    pub fn dim(&self) -> Dim {
        self.mesh.dim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLOW: &str = "\
dimensions: 2
nu: 0.01
initialVelocity: [0.0, 0.0]
boundaryConditions:
  - location: yPlus
    u: [DIRICHLET, 1.0]
    v: [DIRICHLET, 0.0]
";

    const PARAMS: &str = "\
dt: 0.01
nt: 10
nsave: 5
convection: ADAMS_BASHFORTH_2
diffusion: CRANK_NICOLSON
velocitySolveType: CPU
poissonSolveType: GPU
";

    fn p() -> &'static Path {
        Path::new("case/file.yaml")
    }

    #[test]
    fn parameters_use_defaults() {
        let params: SimulationParameters = parse_yaml("dt: 0.1\nnt: 3\nnsave: 1\n", p()).unwrap();
        assert_eq!(params.start_step, 0);
        assert_eq!(params.ibm_scheme, IbmScheme::NavierStokes);
        assert_eq!(params.convection, ConvectionScheme::AdamsBashforth2);
        assert_eq!(params.diffusion, DiffusionScheme::CrankNicolson);
        assert_eq!(params.velocity_solve_type, SolveType::Cpu);
        assert_eq!(params.ranks, 1);
        assert!(!params.output_operators);
    }

    #[test]
    fn parameters_parse_schemes_and_backends() {
        let params: SimulationParameters = parse_yaml(PARAMS, p()).unwrap();
        assert_eq!(params.poisson_solve_type, SolveType::Gpu);
        assert_eq!(params.nsave, 5);
    }

    #[test]
    fn yaml_error_reports_line() {
        let err = parse_yaml::<SimulationParameters>("dt: 0.1\nnt: [\n", p()).unwrap_err();
        match err {
            ConfigError::Parse { line, .. } => assert!(line.is_some()),
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn unknown_scheme_is_a_parse_error() {
        let text = "dt: 0.1\nnt: 3\nnsave: 1\nconvection: RK4\n";
        let err = parse_yaml::<SimulationParameters>(text, p()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn validate_rejects_zero_cadence() {
        let mut params: SimulationParameters = parse_yaml(PARAMS, p()).unwrap();
        params.nsave = 0;
        match params.validate() {
            Err(ConfigError::Invalid { context, .. }) => assert_eq!(context, "nsave"),
            other => panic!("expected Invalid(nsave), got {other:?}"),
        }
    }

    #[test]
    fn lid_boundary_resolves_over_no_slip() {
        let flow: FlowDescription = parse_yaml(FLOW, p()).unwrap();
        let bcs = build_boundary_conditions(Dim::Two, &flow.boundary_conditions).unwrap();
        let lid = bcs.get(BoundaryLocation::YPlus, 0);
        assert_eq!(lid, BoundaryCondition::dirichlet(1.0));
        assert_eq!(bcs.get(BoundaryLocation::XMinus, 1), BoundaryCondition::dirichlet(0.0));
    }

    #[test]
    fn unknown_kind_names_face_and_component() {
        let entry = BoundaryEntry {
            location: "xPlus".into(),
            u: Some(("OUTFLOW".into(), 0.0)),
            v: Some(("DIRICHLET".into(), 0.0)),
            w: None,
        };
        let err = build_boundary_conditions(Dim::Two, &[entry]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownBoundaryKind {
                location: "xPlus/u".into(),
                kind: "OUTFLOW".into(),
            }
        );
    }

    #[test]
    fn half_periodic_axis_is_rejected() {
        let entry = BoundaryEntry {
            location: "xMinus".into(),
            u: Some(("PERIODIC".into(), 0.0)),
            v: Some(("PERIODIC".into(), 0.0)),
            w: None,
        };
        assert!(build_boundary_conditions(Dim::Two, &[entry]).is_err());
    }

    #[test]
    fn mesh_directions_in_any_order() {
        let text = "\
- direction: y
  start: 0.0
  subDomains:
    - end: 2.0
      cells: 4
- direction: x
  start: -1.0
  subDomains:
    - end: 0.0
      cells: 2
      stretchRatio: 1.0
    - end: 1.0
      cells: 3
      stretchRatio: 1.1
";
        let dirs: Vec<MeshDirection> = parse_yaml(text, p()).unwrap();
        let mesh = build_mesh(Dim::Two, &dirs).unwrap();
        assert_eq!(mesh.cell_counts()[..2], [5, 4]);
        assert_eq!(mesh.start(Axis::X), -1.0);
        assert!(mesh.width(Axis::X, 4) > mesh.width(Axis::X, 2));
    }

    #[test]
    fn missing_direction_is_rejected() {
        let dirs = vec![MeshDirection {
            direction: "x".into(),
            start: 0.0,
            sub_domains: vec![SubDomain {
                end: 1.0,
                cells: 4,
                stretch_ratio: 1.0,
            }],
        }];
        assert!(build_mesh(Dim::Two, &dirs).is_err());
    }

    #[test]
    fn inline_body_points() {
        let entries = vec![BodyEntry {
            kind: "points".into(),
            points_file: None,
            points: Some(vec![vec![0.5, 0.5], vec![0.25, 0.75]]),
        }];
        let body = build_body(Dim::Two, Path::new("."), &entries).unwrap();
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn taira_colonius_without_body_fails() {
        let flow: FlowDescription = parse_yaml(FLOW, p()).unwrap();
        let mut params: SimulationParameters = parse_yaml(PARAMS, p()).unwrap();
        params.ibm_scheme = IbmScheme::TairaColonius;
        let mesh: Vec<MeshDirection> = parse_yaml(
            "- {direction: x, start: 0.0, subDomains: [{end: 1.0, cells: 4}]}\n\
             - {direction: y, start: 0.0, subDomains: [{end: 1.0, cells: 4}]}\n",
            p(),
        )
        .unwrap();
        let err = SimulationConfig::from_descriptors(PathBuf::from("."), &flow, &mesh, params, None)
            .unwrap_err();
        assert!(err.to_string().contains("ibmScheme"));
    }
}
