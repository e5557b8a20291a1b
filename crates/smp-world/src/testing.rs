use std::sync::Arc;
use std::time::Duration;

use glam::Vec3;
use parking_lot::Mutex;
use smp_core::{BodyError, BodyResult, SimulationBody, StepContext, SystemKey, Transform};

/// A body that drifts along +X (plus wind) each sub-step and can be told to
/// fail on a given tick.
#[derive(Debug, Clone)]
pub struct ScriptedBody {
    pub key: SystemKey,
    pub bones: Vec<Transform>,
    pub original: Vec<Transform>,
    pub advances: usize,
    pub resets: usize,
    pub last_wind: Vec3,
    pub fail_on_tick: Option<u64>,
    pub nan_on_tick: Option<u64>,
    pub wants: bool,
    pub delay: Duration,
}

impl ScriptedBody {
    pub fn new(key: u64, bones: usize) -> Self {
        let original: Vec<Transform> = (0..bones)
            .map(|i| Transform::from_translation(Vec3::new(0.0, -(i as f32), key as f32)))
            .collect();
        Self {
            key: SystemKey(key),
            bones: original.clone(),
            original,
            advances: 0,
            resets: 0,
            last_wind: Vec3::ZERO,
            fail_on_tick: None,
            nan_on_tick: None,
            wants: true,
            delay: Duration::ZERO,
        }
    }

    pub fn failing_on(mut self, tick: u64) -> Self {
        self.fail_on_tick = Some(tick);
        self
    }
}

impl SimulationBody for ScriptedBody {
    fn root_key(&self) -> SystemKey {
        self.key
    }

    fn advance(&mut self, ctx: &StepContext) -> BodyResult<()> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.advances += 1;
        self.last_wind = ctx.wind;
        let step = (Vec3::X + ctx.wind) * ctx.dt;
        for bone in &mut self.bones {
            bone.translation += step;
        }
        if self.nan_on_tick == Some(ctx.tick) {
            self.bones[0].translation.x = f32::NAN;
        }
        if self.fail_on_tick == Some(ctx.tick) {
            return Err(BodyError::Diverged(format!("scripted failure at tick {}", ctx.tick)));
        }
        Ok(())
    }

    fn reset_to_original(&mut self) {
        self.resets += 1;
        self.bones = self.original.clone();
    }

    fn transforms(&self) -> Vec<Transform> {
        self.bones.clone()
    }

    fn set_transforms(&mut self, transforms: &[Transform]) {
        self.bones = transforms.to_vec();
    }

    fn wants_simulation(&self) -> bool {
        self.wants
    }
}

/// A scripted body handle that keeps its concrete type for assertions.
pub type Scripted = Arc<Mutex<ScriptedBody>>;

pub fn scripted(body: ScriptedBody) -> Scripted {
    Arc::new(Mutex::new(body))
}
