use std::sync::Arc;

use glam::{Quat, Vec3};
use parking_lot::Mutex;

use crate::error::BodyResult;
use crate::key::SystemKey;
use crate::transform::{Transform, clamp_rotation};

/// Per-sub-step inputs handed to every body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepContext {
    /// Sub-step length in seconds.
    pub dt: f32,
    /// Monotonic sub-step counter.
    pub tick: u64,
    /// Wind force for this sub-step, already scaled and attenuated.
    pub wind: Vec3,
    /// Maximum bone rotation for this sub-step in radians, if clamping is on.
    pub rotation_limit: Option<f32>,
}

impl StepContext {
    /// A context with no wind and no rotation clamping.
    pub fn still(dt: f32, tick: u64) -> Self {
        Self {
            dt,
            tick,
            wind: Vec3::ZERO,
            rotation_limit: None,
        }
    }

    /// Apply this sub-step's rotation limit, if any.
    pub fn clamp_rotation(&self, previous: Quat, next: Quat) -> Quat {
        match self.rotation_limit {
            Some(limit) => clamp_rotation(previous, next, limit),
            None => next,
        }
    }
}

/// The physics representation of one skinned mesh, as seen by the stepping
/// core. The solver behind it is opaque; the core only advances, resets,
/// snapshots and re-centres it.
pub trait SimulationBody: Send {
    /// Key of the skeleton root this body simulates.
    fn root_key(&self) -> SystemKey;

    /// Advance the body by one sub-step.
    fn advance(&mut self, ctx: &StepContext) -> BodyResult<()>;

    /// Put every bone back to its bind pose and drop velocities.
    fn reset_to_original(&mut self);

    /// Snapshot of the current bone transforms.
    fn transforms(&self) -> Vec<Transform>;

    /// Overwrite the bone transforms, in the order returned by [`transforms`](Self::transforms).
    fn set_transforms(&mut self, transforms: &[Transform]);

    /// Move every bone by `offset`.
    fn translate(&mut self, offset: Vec3) {
        let moved: Vec<Transform> = self
            .transforms()
            .into_iter()
            .map(|t| t.translated(offset))
            .collect();
        self.set_transforms(&moved);
    }

    /// Whether the host currently wants this body simulated.
    fn wants_simulation(&self) -> bool {
        true
    }
}

/// A body shared between the host (owner) and the stepping core.
pub type SharedBody = Arc<Mutex<dyn SimulationBody>>;

/// Wrap a body for registration.
pub fn shared<B: SimulationBody + 'static>(body: B) -> SharedBody {
    Arc::new(Mutex::new(body))
}
