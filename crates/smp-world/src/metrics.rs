use std::time::Duration;

/// Exponentially weighted moving average.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingAverage {
    value: f32,
    weight: f32,
    primed: bool,
}

impl RollingAverage {
    /// Create an average where each new sample contributes `weight` (0..=1).
    pub fn new(weight: f32) -> Self {
        Self {
            value: 0.0,
            weight: weight.clamp(0.0, 1.0),
            primed: false,
        }
    }

    /// Fold in a sample. The first sample seeds the average directly.
    pub fn record(&mut self, sample: f32) {
        if !sample.is_finite() {
            return;
        }
        if self.primed {
            self.value += (sample - self.value) * self.weight;
        } else {
            self.value = sample;
            self.primed = true;
        }
    }

    /// The current average, or `None` before any sample.
    pub fn get(&self) -> Option<f32> {
        self.primed.then_some(self.value)
    }

    /// The current average, 0 before any sample.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Forget all samples.
    pub fn reset(&mut self) {
        self.value = 0.0;
        self.primed = false;
    }
}

impl Default for RollingAverage {
    fn default() -> Self {
        Self::new(0.1)
    }
}

/// Timing diagnostics published after every frame. Not used for control
/// decisions except through the scheduler's own average.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    /// Average wall-clock interval between frames, in seconds.
    pub average_interval: RollingAverage,
    /// Average time spent stepping per stepped frame, in seconds.
    pub average_processing: RollingAverage,
    /// Average time per sub-step, in seconds.
    pub average_substep: RollingAverage,
    /// Frames with a valid delta seen by `do_update`.
    pub frames: u64,
    /// Frames that ran at least one sub-step.
    pub stepped_frames: u64,
    /// Sub-steps executed.
    pub substeps: u64,
    /// Frames whose excess time was discarded by clamping or the frame budget.
    pub clamped_frames: u64,
    /// System faults observed.
    pub faults: u64,
}

impl Metrics {
    /// Record the interval of a new frame.
    pub fn record_interval(&mut self, delta: f32) {
        self.frames += 1;
        self.average_interval.record(delta);
    }

    /// Record the cost of a stepped frame.
    pub fn record_step(&mut self, substeps: u32, elapsed: Duration) {
        if substeps == 0 {
            return;
        }
        let seconds = elapsed.as_secs_f32();
        self.stepped_frames += 1;
        self.substeps += u64::from(substeps);
        self.average_processing.record(seconds);
        self.average_substep.record(seconds / substeps as f32);
    }
}
