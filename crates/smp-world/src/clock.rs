/// Tracks simulated time: the carried frame remainder, a monotonic sub-step
/// counter, and total simulated seconds.
#[derive(Debug, Clone, Default)]
pub struct StepClock {
    tick: u64,
    remainder: f32,
    simulated: f64,
}

impl StepClock {
    /// Create a clock at tick 0 with no carried remainder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one sub-step of `dt` seconds. Returns the new tick number.
    pub fn advance(&mut self, dt: f32) -> u64 {
        self.tick += 1;
        self.simulated += f64::from(dt);
        self.tick
    }

    /// Return the current tick number.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Frame time carried into the next plan.
    pub fn remainder(&self) -> f32 {
        self.remainder
    }

    /// Store the leftover from the latest plan.
    pub fn set_remainder(&mut self, leftover: f32) {
        self.remainder = leftover;
    }

    /// Drop any carried remainder.
    pub fn clear_remainder(&mut self) {
        self.remainder = 0.0;
    }

    /// Total simulated seconds since creation.
    pub fn simulated_seconds(&self) -> f64 {
        self.simulated
    }
}
