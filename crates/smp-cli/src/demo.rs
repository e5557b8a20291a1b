//! A hanging chain of bones integrated with Verlet steps. Stands in for a
//! skinned mesh's physics so the CLI has something to drive.

use smp_core::{BodyError, BodyResult, Quat, SimulationBody, StepContext, SystemKey, Transform, Vec3};

const GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);
const DAMPING: f32 = 0.98;

/// Demo body: bone 0 is pinned, the rest swing under gravity and wind.
#[derive(Debug, Clone)]
pub struct DemoChain {
    key: SystemKey,
    segment: f32,
    rest: Vec<Vec3>,
    positions: Vec<Vec3>,
    previous: Vec<Vec3>,
    rotations: Vec<Quat>,
}

impl DemoChain {
    /// A chain of `bones` bones hanging straight down from `anchor`.
    pub fn new(key: u64, anchor: Vec3, bones: usize, segment: f32) -> Self {
        let rest: Vec<Vec3> = (0..bones.max(1))
            .map(|i| anchor + Vec3::NEG_Y * segment * i as f32)
            .collect();
        Self {
            key: SystemKey(key),
            segment,
            positions: rest.clone(),
            previous: rest.clone(),
            rotations: vec![Quat::IDENTITY; rest.len()],
            rest,
        }
    }
}

/// Horizontal distance of the last bone from the first.
pub fn tip_sway(transforms: &[Transform]) -> f32 {
    match (transforms.first(), transforms.last()) {
        (Some(anchor), Some(tip)) => {
            let d = tip.translation - anchor.translation;
            Vec3::new(d.x, 0.0, d.z).length()
        }
        _ => 0.0,
    }
}

impl SimulationBody for DemoChain {
    fn root_key(&self) -> SystemKey {
        self.key
    }

    fn advance(&mut self, ctx: &StepContext) -> BodyResult<()> {
        let accel = (GRAVITY + ctx.wind) * ctx.dt * ctx.dt;
        for i in 1..self.positions.len() {
            let current = self.positions[i];
            let velocity = (current - self.previous[i]) * DAMPING;
            self.previous[i] = current;

            let parent = self.positions[i - 1];
            let free = current + velocity + accel;
            let dir = (free - parent).normalize_or_zero();
            if dir == Vec3::ZERO {
                continue;
            }
            self.positions[i] = parent + dir * self.segment;

            let next = Quat::from_rotation_arc(Vec3::NEG_Y, dir);
            self.rotations[i - 1] = ctx.clamp_rotation(self.rotations[i - 1], next);
        }

        match self.positions.iter().position(|p| !p.is_finite()) {
            Some(bone) => Err(BodyError::Diverged(format!("bone {bone} left finite space"))),
            None => Ok(()),
        }
    }

    fn reset_to_original(&mut self) {
        self.positions.clone_from(&self.rest);
        self.previous.clone_from(&self.rest);
        self.rotations.fill(Quat::IDENTITY);
    }

    fn transforms(&self) -> Vec<Transform> {
        self.positions
            .iter()
            .zip(&self.rotations)
            .map(|(p, r)| Transform::new(*p, *r))
            .collect()
    }

    fn set_transforms(&mut self, transforms: &[Transform]) {
        for (i, t) in transforms.iter().enumerate().take(self.positions.len()) {
            self.positions[i] = t.translation;
            self.previous[i] = t.translation;
            self.rotations[i] = t.rotation;
        }
    }

    fn translate(&mut self, offset: Vec3) {
        for p in self.positions.iter_mut().chain(self.previous.iter_mut()) {
            *p += offset;
        }
    }
}
