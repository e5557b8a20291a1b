use std::fmt;
use std::time::Duration;

use crate::error::{StepError, StepResult};
use crate::metrics::RollingAverage;

/// Inputs that shape a step plan, usually derived from
/// [`WorldConfig::step_params`](crate::WorldConfig::step_params).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepParams {
    /// Fixed sub-step length in seconds. Must be positive.
    pub fixed_tick: f32,
    /// Hard cap on sub-steps per frame.
    pub max_substeps: u32,
    /// Share (0..=1) of a min-fps frame that stepping may consume.
    pub budget_fraction: f32,
    /// Frames slower than this are degraded and subject to the budget.
    pub min_fps: f32,
}

/// How much simulation to run this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepPlan {
    /// Number of fixed sub-steps to run.
    pub substeps: u32,
    /// Length of each sub-step in seconds.
    pub substep_duration: f32,
    /// Time carried into the next frame, always in `[0, substep_duration)`.
    pub leftover: f32,
    /// Excess time was discarded by the sub-step cap or the frame budget.
    pub clamped: bool,
}

impl StepPlan {
    /// A plan that runs nothing and carries nothing.
    pub fn idle(substep_duration: f32) -> Self {
        Self {
            substeps: 0,
            substep_duration,
            leftover: 0.0,
            clamped: false,
        }
    }

    /// Simulated seconds this plan advances.
    pub fn stepped_time(&self) -> f32 {
        self.substeps as f32 * self.substep_duration
    }
}

impl fmt::Display for StepPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} x {:.4}s, leftover {:.4}s",
            self.substeps, self.substep_duration, self.leftover
        )?;
        if self.clamped {
            write!(f, " (clamped)")?;
        }
        Ok(())
    }
}

/// Turns wall-clock frame time into fixed sub-steps.
///
/// The carried remainder lives with the caller (see
/// [`StepClock`](crate::StepClock)); the scheduler only keeps a rolling
/// average of how long one sub-step takes, which bounds degraded frames.
#[derive(Debug, Clone, Default)]
pub struct StepScheduler {
    substep_time: RollingAverage,
}

impl StepScheduler {
    /// Create a scheduler with no timing history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan the sub-steps for a frame of `elapsed` seconds with `remainder`
    /// seconds carried from the previous frame.
    pub fn plan(&self, elapsed: f32, remainder: f32, params: &StepParams) -> StepResult<StepPlan> {
        let tick = params.fixed_tick;
        if !(tick.is_finite() && tick > 0.0) {
            return Err(StepError::InvalidInput(format!(
                "fixed tick must be positive, got {tick}"
            )));
        }
        if !elapsed.is_finite() || elapsed < 0.0 {
            return Err(StepError::InvalidInput(format!(
                "elapsed time must be finite and non-negative, got {elapsed}"
            )));
        }
        if !remainder.is_finite() || remainder < 0.0 {
            return Err(StepError::InvalidInput(format!(
                "carried remainder must be finite and non-negative, got {remainder}"
            )));
        }

        let total = elapsed + remainder;
        let max = params.max_substeps;
        let mut clamped = total > max as f32 * tick;
        let mut substeps = if clamped {
            max
        } else {
            ((total / tick).floor() as u32).min(max)
        };

        let cap = self.budget_cap(elapsed, params).unwrap_or(u32::MAX);
        if cap < substeps {
            tracing::debug!(substeps, cap, elapsed, "degraded frame, cutting sub-steps to budget");
            substeps = cap;
            clamped = true;
        }

        let leftover = if clamped {
            0.0
        } else {
            let rest = (total - substeps as f32 * tick).max(0.0);
            if rest >= tick {
                tick * (1.0 - f32::EPSILON)
            } else {
                rest
            }
        };

        Ok(StepPlan {
            substeps,
            substep_duration: tick,
            leftover,
            clamped,
        })
    }

    /// Sub-step cap for a degraded frame, if the frame is degraded and the
    /// sub-step cost is known.
    fn budget_cap(&self, elapsed: f32, params: &StepParams) -> Option<u32> {
        let degraded = elapsed * params.min_fps > 1.0;
        if !degraded {
            return None;
        }
        let average = self.substep_time.get().filter(|avg| *avg > 0.0)?;
        let expected_frame = 1.0 / params.min_fps;
        let allowed = (params.budget_fraction * expected_frame / average).floor();
        Some(allowed.max(0.0) as u32)
    }

    /// Fold the measured cost of one sub-step into the rolling average.
    pub fn record_substep_time(&mut self, elapsed: Duration) {
        self.substep_time.record(elapsed.as_secs_f32());
    }

    /// Rolling average sub-step cost in seconds, if any were recorded.
    pub fn average_substep_time(&self) -> Option<f32> {
        self.substep_time.get()
    }

    /// Forget the timing history.
    pub fn reset(&mut self) {
        self.substep_time.reset();
    }
}
