//! Solver tuning

use crate::defaults;

/// Tuning knobs for the tour solvers
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Cap on improvement sweeps, shared by 2-opt and the window-aware
    /// swap pass. Each sweep visits every move candidate once.
    pub max_improvement_passes: usize,
    /// Extra minutes a window-aware move may cost while removing a
    /// missed window. Zero makes cost improvements strictly monotonic.
    pub improvement_tolerance_minutes: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_improvement_passes: defaults::DEFAULT_MAX_IMPROVEMENT_PASSES,
            improvement_tolerance_minutes: defaults::DEFAULT_IMPROVEMENT_TOLERANCE_MINUTES,
        }
    }
}

impl SolverConfig {
    /// Few sweeps for interactive contexts where latency matters most
    pub fn fast() -> Self {
        Self {
            max_improvement_passes: 20,
            improvement_tolerance_minutes: 1,
        }
    }

    /// More sweeps and slack for batch runs where quality matters most
    pub fn quality() -> Self {
        Self {
            max_improvement_passes: 400,
            improvement_tolerance_minutes: 2,
        }
    }
}
