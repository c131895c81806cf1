//! Wall-clock accounting per stage of the time step.
//!
//! A [`StageTimer`] enters a `tracing` span for its stage and adds the
//! elapsed time to the shared [`StageTimings`] when dropped, so early
//! returns through `?` are still counted.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::span::EnteredSpan;
use tracing::{info, info_span};

/// Timed stages of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Assembly, solver setup and initial condition.
    Initialize,
    /// Explicit terms, ghosts, `bc1` and `rhs1`.
    RhsVelocity,
    /// Velocity solve.
    SolveVelocity,
    /// `r2` and `rhs2`.
    RhsPoisson,
    /// Pressure/force solve.
    SolvePoisson,
    /// `q = q* - BNQ λ`.
    Projection,
    /// Logs and checkpoints.
    Output,
}

impl Stage {
    /// Every stage, in step order.
    pub const ALL: [Stage; 7] = [
        Stage::Initialize,
        Stage::RhsVelocity,
        Stage::SolveVelocity,
        Stage::RhsPoisson,
        Stage::SolvePoisson,
        Stage::Projection,
        Stage::Output,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Stage name used in spans and the summary.
    pub fn name(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::RhsVelocity => "rhs_velocity",
            Self::SolveVelocity => "solve_velocity",
            Self::RhsPoisson => "rhs_poisson",
            Self::SolvePoisson => "solve_poisson",
            Self::Projection => "projection",
            Self::Output => "output",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accumulated time and entry count per stage.
#[derive(Debug, Default)]
pub struct StageTimings {
    nanos: [AtomicU64; 7],
    calls: [AtomicU64; 7],
}

impl StageTimings {
    /// Fresh, shareable accumulator.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add one entry of `stage` lasting `elapsed`.
    pub fn record(&self, stage: Stage, elapsed: Duration) {
        let ns = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.nanos[stage.index()].fetch_add(ns, Ordering::Relaxed);
        self.calls[stage.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Total time spent in `stage`.
    pub fn total(&self, stage: Stage) -> Duration {
        Duration::from_nanos(self.nanos[stage.index()].load(Ordering::Relaxed))
    }

    /// Number of times `stage` was entered.
    pub fn calls(&self, stage: Stage) -> u64 {
        self.calls[stage.index()].load(Ordering::Relaxed)
    }

    /// Log one line per stage that ran.
    pub fn report(&self) {
        let all: Duration = Stage::ALL.iter().map(|&s| self.total(s)).sum();
        for stage in Stage::ALL {
            let calls = self.calls(stage);
            if calls == 0 {
                continue;
            }
            let total = self.total(stage);
            let share = if all.is_zero() {
                0.0
            } else {
                100.0 * total.as_secs_f64() / all.as_secs_f64()
            };
            info!(
                stage = stage.name(),
                calls,
                total_s = total.as_secs_f64(),
                share_pct = share,
                "stage timing"
            );
        }
    }
}

/// Scope guard timing one stage.
#[must_use = "the stage is timed until the guard is dropped"]
pub struct StageTimer {
    timings: Arc<StageTimings>,
    stage: Stage,
    start: Instant,
    _span: EnteredSpan,
}

impl StageTimer {
    /// Enter `stage`.
    pub fn start(timings: &Arc<StageTimings>, stage: Stage) -> Self {
        Self {
            timings: Arc::clone(timings),
            stage,
            start: Instant::now(),
            _span: info_span!("stage", name = stage.name()).entered(),
        }
    }

    /// Time since the stage was entered.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        self.timings.record(self.stage, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn dropped_timer_records_once() {
        let t = StageTimings::new();
        {
            let _g = StageTimer::start(&t, Stage::Projection);
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(t.calls(Stage::Projection), 1);
        assert!(t.total(Stage::Projection) >= Duration::from_millis(2));
        assert_eq!(t.calls(Stage::SolvePoisson), 0);
    }

    #[test]
    fn early_return_is_still_counted() {
        fn failing(t: &Arc<StageTimings>) -> Result<(), ()> {
            let _g = StageTimer::start(t, Stage::SolveVelocity);
            Err(())
        }
        let t = StageTimings::new();
        assert!(failing(&t).is_err());
        assert_eq!(t.calls(Stage::SolveVelocity), 1);
    }

    #[test]
    fn stage_order_matches_index() {
        for (i, s) in Stage::ALL.iter().enumerate() {
            assert_eq!(s.index(), i);
        }
    }

    proptest! {
        #[test]
        fn totals_are_sums_of_records(
            entries in prop::collection::vec((0usize..7, 0u64..1_000_000), 0..50)
        ) {
            let t = StageTimings::new();
            let mut expected = [(0u64, 0u64); 7];
            for &(s, ns) in &entries {
                t.record(Stage::ALL[s], Duration::from_nanos(ns));
                expected[s].0 += ns;
                expected[s].1 += 1;
            }
            for (stage, (ns, calls)) in Stage::ALL.iter().zip(expected) {
                prop_assert_eq!(t.total(*stage), Duration::from_nanos(ns));
                prop_assert_eq!(t.calls(*stage), calls);
            }
        }
    }
}
