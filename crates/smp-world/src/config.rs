use serde::{Deserialize, Serialize};

use crate::error::{StepError, StepResult};
use crate::scheduler::StepParams;

/// Tunables for a physics world. Every field has a default; hosts usually
/// override a handful and keep the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Fixed sub-step length in seconds.
    pub time_tick: f32,
    /// Maximum sub-steps per frame. Time beyond this is discarded.
    pub max_substeps: u32,
    /// Frames slower than this are treated as degraded.
    pub min_fps: f32,
    /// Share of a min-fps frame, in percent, that stepping may consume.
    pub frame_budget_percent: f32,
    /// Limit how far a bone may rotate in one sub-step.
    pub clamp_rotations: bool,
    /// Rotation limit in radians per second when clamping is on.
    pub rotation_speed_limit: f32,
    /// Apply wind to bodies at all.
    pub wind_enabled: bool,
    /// Multiplier applied to the smoothed wind vector.
    pub wind_strength: f32,
    /// Obstruction distance at or below which wind is fully blocked.
    pub distance_for_no_wind: f32,
    /// Obstruction distance at or above which wind is at full strength.
    pub distance_for_max_wind: f32,
    /// Moving-average window for wind smoothing, in sub-steps.
    pub wind_smoothing_samples: usize,
    /// Re-centre the simulation around the viewer while stepping.
    pub use_translation_offset: bool,
    /// Worker pool size. 0 lets rayon pick.
    pub worker_threads: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            time_tick: 1.0 / 60.0,
            max_substeps: 4,
            min_fps: 60.0,
            frame_budget_percent: 30.0,
            clamp_rotations: true,
            rotation_speed_limit: 10.0,
            wind_enabled: true,
            wind_strength: 2.0,
            distance_for_no_wind: 50.0,
            distance_for_max_wind: 3000.0,
            wind_smoothing_samples: 8,
            use_translation_offset: true,
            worker_threads: 0,
        }
    }
}

impl WorldConfig {
    /// Set the fixed sub-step length.
    pub fn with_time_tick(mut self, tick: f32) -> Self {
        self.time_tick = tick;
        self
    }

    /// Set the per-frame sub-step cap.
    pub fn with_max_substeps(mut self, max: u32) -> Self {
        self.max_substeps = max;
        self
    }

    /// Set the degraded-frame threshold.
    pub fn with_min_fps(mut self, fps: f32) -> Self {
        self.min_fps = fps;
        self
    }

    /// Set the frame-time budget in percent.
    pub fn with_frame_budget_percent(mut self, percent: f32) -> Self {
        self.frame_budget_percent = percent;
        self
    }

    /// Enable or disable rotation clamping with the given speed limit.
    pub fn with_rotation_clamp(mut self, enabled: bool, speed_limit: f32) -> Self {
        self.clamp_rotations = enabled;
        self.rotation_speed_limit = speed_limit;
        self
    }

    /// Set wind strength and the attenuation distances.
    pub fn with_wind(mut self, strength: f32, no_wind: f32, max_wind: f32) -> Self {
        self.wind_strength = strength;
        self.distance_for_no_wind = no_wind;
        self.distance_for_max_wind = max_wind;
        self
    }

    /// Set the wind smoothing window.
    pub fn with_wind_smoothing_samples(mut self, samples: usize) -> Self {
        self.wind_smoothing_samples = samples;
        self
    }

    /// Enable or disable re-centring around the viewer.
    pub fn with_translation_offset(mut self, enabled: bool) -> Self {
        self.use_translation_offset = enabled;
        self
    }

    /// Set the worker pool size (0 = rayon default).
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    /// Scheduler parameters derived from this configuration.
    pub fn step_params(&self) -> StepParams {
        StepParams {
            fixed_tick: self.time_tick,
            max_substeps: self.max_substeps,
            budget_fraction: self.frame_budget_percent / 100.0,
            min_fps: self.min_fps,
        }
    }

    /// Per-sub-step rotation limit, if clamping is enabled.
    pub fn rotation_limit(&self) -> Option<f32> {
        self.clamp_rotations
            .then(|| self.rotation_speed_limit * self.time_tick)
    }

    /// Reject settings the scheduler or wind model cannot work with.
    pub fn validate(&self) -> StepResult<()> {
        if !is_positive(self.time_tick) {
            return Err(StepError::InvalidInput(format!(
                "time_tick must be positive, got {}",
                self.time_tick
            )));
        }
        if self.max_substeps == 0 {
            return Err(StepError::InvalidInput(
                "max_substeps must be at least 1".into(),
            ));
        }
        if !is_positive(self.min_fps) {
            return Err(StepError::InvalidInput(format!(
                "min_fps must be positive, got {}",
                self.min_fps
            )));
        }
        if !is_positive(self.frame_budget_percent) || self.frame_budget_percent > 100.0 {
            return Err(StepError::InvalidInput(format!(
                "frame_budget_percent must be in (0, 100], got {}",
                self.frame_budget_percent
            )));
        }
        if self.clamp_rotations && !is_non_negative(self.rotation_speed_limit) {
            return Err(StepError::InvalidInput(format!(
                "rotation_speed_limit must be non-negative, got {}",
                self.rotation_speed_limit
            )));
        }
        if !is_non_negative(self.distance_for_no_wind)
            || self.distance_for_max_wind.is_nan()
            || self.distance_for_max_wind < self.distance_for_no_wind
        {
            return Err(StepError::InvalidInput(format!(
                "wind distances must satisfy 0 <= no_wind ({}) <= max_wind ({})",
                self.distance_for_no_wind, self.distance_for_max_wind
            )));
        }
        Ok(())
    }
}

fn is_positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

fn is_non_negative(value: f32) -> bool {
    value.is_finite() && value >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let config = WorldConfig::default();
        assert!((config.time_tick - 1.0 / 60.0).abs() < f32::EPSILON);
        assert_eq!(config.max_substeps, 4);
        assert_eq!(config.wind_smoothing_samples, 8);
        assert!(config.clamp_rotations);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_builder_chain() {
        let config = WorldConfig::default()
            .with_time_tick(0.01)
            .with_max_substeps(8)
            .with_min_fps(30.0)
            .with_frame_budget_percent(50.0)
            .with_worker_threads(2);
        assert!((config.time_tick - 0.01).abs() < f32::EPSILON);
        assert_eq!(config.max_substeps, 8);
        assert_eq!(config.worker_threads, 2);

        let params = config.step_params();
        assert!((params.budget_fraction - 0.5).abs() < f32::EPSILON);
        assert!((params.min_fps - 30.0).abs() < f32::EPSILON);
    }

    #[test]
    fn rotation_limit_scales_with_tick() {
        let config = WorldConfig::default()
            .with_time_tick(0.1)
            .with_rotation_clamp(true, 5.0);
        assert!((config.rotation_limit().unwrap() - 0.5).abs() < 1e-6);

        let off = config.with_rotation_clamp(false, 5.0);
        assert_eq!(off.rotation_limit(), None);
    }

    #[test]
    fn validate_rejects_bad_tick() {
        let config = WorldConfig::default().with_time_tick(0.0);
        assert!(matches!(config.validate(), Err(StepError::InvalidInput(_))));

        let config = WorldConfig::default().with_time_tick(f32::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_wind_distances() {
        let config = WorldConfig::default().with_wind(1.0, 100.0, 10.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_budget() {
        let config = WorldConfig::default().with_frame_budget_percent(0.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: WorldConfig =
            serde_json::from_str(r#"{ "max_substeps": 2, "wind_strength": 0.5 }"#).unwrap();
        assert_eq!(config.max_substeps, 2);
        assert!((config.wind_strength - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.wind_smoothing_samples, 8);
    }
}
