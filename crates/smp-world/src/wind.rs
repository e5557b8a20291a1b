use std::collections::VecDeque;

use glam::Vec3;

/// Answers how far wind travels from a point before something blocks it.
pub trait WindOcclusion: Send + Sync {
    /// Distance from `origin` along `direction` to the nearest obstruction,
    /// or `None` when nothing is in the way.
    fn obstruction_distance(&self, origin: Vec3, direction: Vec3) -> Option<f32>;
}

/// Wind strength factor for an obstruction at `distance`: 0 at or below
/// `no_wind`, 1 at or above `max_wind`, linear in between. An unobstructed
/// path gets full strength.
pub fn attenuation(distance: Option<f32>, no_wind: f32, max_wind: f32) -> f32 {
    let Some(distance) = distance else {
        return 1.0;
    };
    if distance.is_nan() || distance <= no_wind {
        0.0
    } else if distance >= max_wind {
        1.0
    } else {
        (distance - no_wind) / (max_wind - no_wind)
    }
}

/// Smoothed wind vector. The target can change abruptly; the smoothed value
/// follows it as a moving average over the last `window` sub-steps.
#[derive(Debug, Clone)]
pub struct WindModel {
    target_direction: Vec3,
    target_scale: f32,
    smoothed: Vec3,
    window: usize,
    samples: VecDeque<Vec3>,
}

impl Default for WindModel {
    fn default() -> Self {
        Self::new(8)
    }
}

impl WindModel {
    /// Calm wind with a smoothing window of `window` samples (at least 1).
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            target_direction: Vec3::ZERO,
            target_scale: 0.0,
            smoothed: Vec3::ZERO,
            window,
            samples: VecDeque::with_capacity(window),
        }
    }

    /// Set where the wind should blow. The direction is normalised; a zero
    /// direction means calm.
    pub fn set_target(&mut self, direction: Vec3, scale: f32) {
        self.target_direction = direction.normalize_or_zero();
        self.target_scale = if scale.is_finite() { scale } else { 0.0 };
    }

    /// Resize the smoothing window. A window of 1 snaps to the target.
    pub fn set_window(&mut self, window: usize) {
        self.window = window.max(1);
        while self.samples.len() > self.window {
            self.samples.pop_front();
        }
    }

    /// The vector the smoothed value is heading towards.
    pub fn target(&self) -> Vec3 {
        self.target_direction * self.target_scale
    }

    /// Normalised target direction.
    pub fn direction(&self) -> Vec3 {
        self.target_direction
    }

    /// Current smoothed wind vector.
    pub fn smoothed(&self) -> Vec3 {
        self.smoothed
    }

    /// Current smoothing window.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Take one sample of the target for a sub-step of `dt` seconds. An
    /// empty or invalid sub-step adds nothing.
    pub fn update(&mut self, dt: f32) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }
        self.samples.push_back(self.target());
        while self.samples.len() > self.window {
            self.samples.pop_front();
        }
        let sum: Vec3 = self.samples.iter().copied().sum();
        self.smoothed = sum / self.samples.len() as f32;
    }

    /// Drop all samples and settle to calm. The target is kept.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.smoothed = Vec3::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn window_of_one_snaps_to_target() {
        let mut wind = WindModel::new(4);
        wind.set_target(Vec3::X, 3.0);
        for _ in 0..4 {
            wind.update(DT);
        }
        wind.set_window(1);
        wind.set_target(Vec3::new(0.0, 0.0, 2.0), 5.0);
        wind.update(DT);
        assert_eq!(wind.smoothed(), Vec3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn zero_window_is_coerced_to_one() {
        let mut wind = WindModel::new(0);
        assert_eq!(wind.window(), 1);
        wind.set_target(Vec3::Y, 2.0);
        wind.update(DT);
        assert_eq!(wind.smoothed(), Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn moving_average_converges_over_window() {
        let mut wind = WindModel::new(4);
        wind.set_target(Vec3::X, 4.0);
        wind.update(DT);
        assert_eq!(wind.smoothed(), Vec3::new(4.0, 0.0, 0.0));

        wind.set_target(Vec3::X, 0.0);
        wind.update(DT);
        assert_eq!(wind.smoothed(), Vec3::new(2.0, 0.0, 0.0));
        wind.update(DT);
        wind.update(DT);
        assert!((wind.smoothed().x - 1.0).abs() < 1e-6);
        wind.update(DT);
        assert_eq!(wind.smoothed(), Vec3::ZERO);
    }

    #[test]
    fn empty_substep_adds_no_sample() {
        let mut wind = WindModel::new(2);
        wind.set_target(Vec3::X, 1.0);
        wind.update(0.0);
        wind.update(f32::NAN);
        assert_eq!(wind.smoothed(), Vec3::ZERO);
    }

    #[test]
    fn direction_is_normalised() {
        let mut wind = WindModel::new(1);
        wind.set_target(Vec3::new(10.0, 0.0, 0.0), 2.0);
        assert_eq!(wind.target(), Vec3::new(2.0, 0.0, 0.0));
        wind.set_target(Vec3::ZERO, 2.0);
        assert_eq!(wind.target(), Vec3::ZERO);
    }

    #[test]
    fn reset_returns_to_calm() {
        let mut wind = WindModel::new(3);
        wind.set_target(Vec3::X, 1.0);
        wind.update(DT);
        wind.reset();
        assert_eq!(wind.smoothed(), Vec3::ZERO);
        assert_eq!(wind.target(), Vec3::X);
    }

    #[test]
    fn attenuation_interpolates_between_thresholds() {
        assert_eq!(attenuation(None, 50.0, 3000.0), 1.0);
        assert_eq!(attenuation(Some(10.0), 50.0, 3000.0), 0.0);
        assert_eq!(attenuation(Some(50.0), 50.0, 3000.0), 0.0);
        assert_eq!(attenuation(Some(5000.0), 50.0, 3000.0), 1.0);
        assert!((attenuation(Some(1525.0), 50.0, 3000.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn attenuation_with_equal_thresholds_is_a_step() {
        assert_eq!(attenuation(Some(9.0), 10.0, 10.0), 0.0);
        assert_eq!(attenuation(Some(11.0), 10.0, 10.0), 1.0);
    }
}
