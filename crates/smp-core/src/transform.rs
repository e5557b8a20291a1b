use glam::{Quat, Vec3};

/// World-space transform of a single simulated bone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Bone origin.
    pub translation: Vec3,
    /// Bone orientation.
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// The identity transform at the origin.
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Create a transform from a translation and rotation.
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// Create an unrotated transform at `translation`.
    pub fn from_translation(translation: Vec3) -> Self {
        Self::new(translation, Quat::IDENTITY)
    }

    /// True when every component is finite.
    pub fn is_finite(&self) -> bool {
        self.translation.is_finite() && self.rotation.is_finite()
    }

    /// This transform moved by `offset`.
    pub fn translated(self, offset: Vec3) -> Self {
        Self {
            translation: self.translation + offset,
            ..self
        }
    }
}

/// Limit the rotation from `previous` to `next` to at most `max_angle`
/// radians, keeping the direction of travel.
pub fn clamp_rotation(previous: Quat, next: Quat, max_angle: f32) -> Quat {
    if max_angle <= 0.0 {
        return previous;
    }
    let angle = previous.angle_between(next);
    if !angle.is_finite() || angle <= max_angle {
        return next;
    }
    previous.slerp(next, max_angle / angle)
}
