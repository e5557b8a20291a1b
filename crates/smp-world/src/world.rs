use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, sync_channel};
use std::sync::{Arc, Weak};
use std::time::Duration;

use glam::Vec3;
use parking_lot::{Mutex, RwLock};
use smp_core::{SharedBody, SystemKey, Transform};

use crate::clock::StepClock;
use crate::config::WorldConfig;
use crate::error::{StepError, StepResult};
use crate::event::{EventBus, EventKind, HostEvent};
use crate::metrics::Metrics;
use crate::registry::SystemRegistry;
use crate::runner::{ConcurrentStepRunner, StepEnv};
use crate::scheduler::{StepPlan, StepScheduler};
use crate::suspension::{SuspensionController, SuspensionState};
use crate::wind::{WindModel, WindOcclusion, attenuation};

static GLOBAL: Mutex<Option<Arc<PhysicsWorld>>> = parking_lot::const_mutex(None);

/// How a call to [`PhysicsWorld::do_update`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The plan ran (possibly with zero sub-steps).
    Stepped,
    /// Stepping is suspended.
    Suspended,
    /// A stasis operation is running.
    Stasis,
    /// The frame delta was rejected; nothing ran.
    Rejected,
    /// The world has been shut down.
    Shutdown,
}

impl fmt::Display for FrameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stepped => write!(f, "stepped"),
            Self::Suspended => write!(f, "suspended"),
            Self::Stasis => write!(f, "stasis"),
            Self::Rejected => write!(f, "rejected"),
            Self::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Summary of one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// How the frame ended.
    pub outcome: FrameOutcome,
    /// The plan, when one was made.
    pub plan: Option<StepPlan>,
    /// Sub-steps that actually ran.
    pub substeps: u32,
    /// Systems that faulted during this frame.
    pub faults: Vec<SystemKey>,
    /// Wall-clock time spent stepping.
    pub processing: Duration,
}

impl FrameReport {
    fn skipped(outcome: FrameOutcome) -> Self {
        Self {
            outcome,
            plan: None,
            substeps: 0,
            faults: Vec::new(),
            processing: Duration::ZERO,
        }
    }
}

/// A frame running on the worker pool. Call [`join`](Self::join) before
/// consuming simulation results.
#[derive(Debug)]
pub struct PendingUpdate {
    rx: Receiver<FrameReport>,
}

impl PendingUpdate {
    /// Wait for the frame to finish.
    pub fn join(self) -> FrameReport {
        self.rx
            .recv()
            .unwrap_or_else(|_| FrameReport::skipped(FrameOutcome::Rejected))
    }
}

/// State only touched while holding the step gate.
#[derive(Debug)]
struct StepState {
    clock: StepClock,
    scheduler: StepScheduler,
    wind: WindModel,
}

/// Transforms captured by `apply_translation_offset`, reused on restore if
/// nothing stepped in between.
#[derive(Debug)]
struct OffsetSnapshot {
    generation: u64,
    offset: Vec3,
    transforms: HashMap<SystemKey, Vec<Transform>>,
}

/// The physics world the host talks to.
///
/// The host thread calls [`do_update`](Self::do_update) once per frame.
/// Suspension, registry mutation and configuration calls may come from any
/// thread. A step gate serialises frames, resets and stasis work. While a
/// frame runs, registry membership is pinned, so adding or removing a
/// system waits for the frame boundary and never sees a body in
/// offset space.
pub struct PhysicsWorld {
    config: RwLock<WorldConfig>,
    suspension: SuspensionController,
    registry: SystemRegistry,
    runner: ConcurrentStepRunner,
    step: Mutex<StepState>,
    metrics: Mutex<Metrics>,
    viewer: Mutex<Vec3>,
    occlusion: RwLock<Option<Arc<dyn WindOcclusion>>>,
    offset: Mutex<Option<OffsetSnapshot>>,
    generation: AtomicU64,
    shut_down: AtomicBool,
}

impl fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("state", &self.suspension.state())
            .field("systems", &self.registry.len())
            .field("threads", &self.runner.threads())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

impl PhysicsWorld {
    /// Create a world. Hosts normally go through [`global`](Self::global);
    /// tests build their own.
    pub fn new(config: WorldConfig) -> StepResult<Self> {
        config.validate()?;
        let runner = ConcurrentStepRunner::new(config.worker_threads)?;
        let wind = WindModel::new(config.wind_smoothing_samples);
        tracing::info!(
            threads = runner.threads(),
            tick = config.time_tick,
            max_substeps = config.max_substeps,
            "physics world created"
        );
        Ok(Self {
            config: RwLock::new(config),
            suspension: SuspensionController::new(),
            registry: SystemRegistry::new(),
            runner,
            step: Mutex::new(StepState {
                clock: StepClock::new(),
                scheduler: StepScheduler::new(),
                wind,
            }),
            metrics: Mutex::new(Metrics::default()),
            viewer: Mutex::new(Vec3::ZERO),
            occlusion: RwLock::new(None),
            offset: Mutex::new(None),
            generation: AtomicU64::new(0),
            shut_down: AtomicBool::new(false),
        })
    }

    /// The process-wide world, created with default configuration on first
    /// use.
    pub fn global() -> StepResult<Arc<Self>> {
        let mut slot = GLOBAL.lock();
        if let Some(world) = slot.as_ref() {
            return Ok(Arc::clone(world));
        }
        let world = Arc::new(Self::new(WorldConfig::default())?);
        *slot = Some(Arc::clone(&world));
        Ok(world)
    }

    /// Shut down and release the process-wide world. Returns whether one
    /// existed. A later [`global`](Self::global) creates a fresh world.
    pub fn teardown_global() -> bool {
        let taken = GLOBAL.lock().take();
        match taken {
            Some(world) => {
                world.shutdown();
                true
            }
            None => false,
        }
    }

    /// Subscribe this world to the host's frame, camera and shutdown events.
    /// The bus only holds a weak reference.
    pub fn attach(self: &Arc<Self>, bus: &mut EventBus) {
        let weak = Arc::downgrade(self);
        bus.subscribe(EventKind::Frame, with_world(&weak, |world, event| {
            if let HostEvent::Frame { delta } = event {
                world.do_update(*delta);
            }
        }));
        bus.subscribe(EventKind::Camera, with_world(&weak, |world, event| {
            if let HostEvent::Camera { position } = event {
                world.set_viewer_position(*position);
            }
        }));
        bus.subscribe(EventKind::Shutdown, with_world(&weak, |world, _| {
            world.shutdown();
        }));
    }

    /// [`global`](Self::global), attached to `bus`, torn down on the bus's
    /// shutdown event.
    pub fn attach_global(bus: &mut EventBus) -> StepResult<Arc<Self>> {
        let world = Self::global()?;
        world.attach(bus);
        bus.subscribe(EventKind::Shutdown, |_| {
            Self::teardown_global();
        });
        Ok(world)
    }

    /// Run one host frame: gate, plan, step, publish metrics. Never fails;
    /// problems are logged and the frame is skipped or degraded.
    pub fn do_update(&self, delta: f32) -> FrameReport {
        if self.is_shut_down() {
            return FrameReport::skipped(FrameOutcome::Shutdown);
        }
        if delta.is_finite() && delta >= 0.0 {
            self.metrics.lock().record_interval(delta);
        }

        let mut step = self.step.lock();
        match self.suspension.state() {
            SuspensionState::Running => {}
            SuspensionState::Suspended | SuspensionState::SuspendedLoading => {
                return FrameReport::skipped(FrameOutcome::Suspended);
            }
            SuspensionState::Stasis => return FrameReport::skipped(FrameOutcome::Stasis),
        }

        let config = self.config.read().clone();
        let plan = match step
            .scheduler
            .plan(delta, step.clock.remainder(), &config.step_params())
        {
            Ok(plan) => plan,
            Err(error) => {
                tracing::warn!(delta, %error, "frame skipped");
                return FrameReport::skipped(FrameOutcome::Rejected);
            }
        };
        step.clock.set_remainder(plan.leftover);
        tracing::trace!(delta, %plan, "frame planned");
        if plan.clamped {
            self.metrics.lock().clamped_frames += 1;
        }

        let mut report = FrameReport {
            plan: Some(plan),
            ..FrameReport::skipped(FrameOutcome::Stepped)
        };
        if plan.substeps == 0 {
            return report;
        }

        let env = self.step_env(&config, &step.wind);
        // Add and remove wait until the offset has been undone.
        let _membership = self.registry.pin_membership();
        let offset = if config.use_translation_offset {
            self.apply_offset_locked()
        } else {
            Vec3::ZERO
        };

        let StepState {
            clock,
            scheduler,
            wind,
        } = &mut *step;
        let run = self.runner.run(&plan, &self.registry, wind, clock, env, || {
            self.suspension.is_running()
        });
        self.generation
            .fetch_add(u64::from(run.substeps_run), Ordering::AcqRel);

        self.restore_offset_locked(offset);

        if let Some(per_substep) = run.per_substep() {
            scheduler.record_substep_time(per_substep);
        }
        {
            let mut metrics = self.metrics.lock();
            metrics.record_step(run.substeps_run, run.elapsed);
            metrics.faults += run.faults.len() as u64;
        }
        if run.interrupted {
            tracing::debug!(ran = run.substeps_run, planned = plan.substeps, "frame interrupted by suspension");
        }

        report.substeps = run.substeps_run;
        report.faults = run.faults.into_iter().map(|(key, _)| key).collect();
        report.processing = run.elapsed;
        report
    }

    /// Run [`do_update`](Self::do_update) on the worker pool so it overlaps
    /// with host work.
    pub fn spawn_update(self: &Arc<Self>, delta: f32) -> PendingUpdate {
        let (tx, rx) = sync_channel(1);
        let world = Arc::clone(self);
        self.runner.spawn(move || {
            let _ = tx.send(world.do_update(delta));
        });
        PendingUpdate { rx }
    }

    fn step_env(&self, config: &WorldConfig, wind: &WindModel) -> StepEnv {
        let wind_scale = if config.wind_enabled {
            let direction = wind.direction();
            let distance = match self.occlusion.read().as_ref() {
                Some(occluder) if direction != Vec3::ZERO => {
                    occluder.obstruction_distance(*self.viewer.lock(), direction)
                }
                _ => None,
            };
            config.wind_strength
                * attenuation(
                    distance,
                    config.distance_for_no_wind,
                    config.distance_for_max_wind,
                )
        } else {
            0.0
        };
        StepEnv {
            wind_scale,
            rotation_limit: config.rotation_limit(),
        }
    }

    /// Refresh which systems the host wants simulated. Returns how many are
    /// active.
    pub fn update_active_state(&self) -> usize {
        self.registry.update_active()
    }

    /// Put every system back to its original pose, clear faults, drop the
    /// carried remainder and calm the wind.
    pub fn reset_systems(&self) {
        let mut step = self.step.lock();
        self.reset_locked(&mut step);
    }

    fn reset_locked(&self, step: &mut StepState) {
        let count = self.registry.reset_all();
        step.clock.clear_remainder();
        step.wind.reset();
        tracing::info!(systems = count, "systems reset");
    }

    /// Register a body. Fails if its root key is already registered or the
    /// world has shut down.
    pub fn add_skinned_mesh_system(&self, body: SharedBody) -> StepResult<SystemKey> {
        if self.is_shut_down() {
            return Err(StepError::IllegalState(
                "cannot add systems after shutdown".into(),
            ));
        }
        self.registry.add(body)
    }

    /// Unregister a body. Returns whether it was registered.
    pub fn remove_skinned_mesh_system(&self, body: &SharedBody) -> bool {
        self.registry.remove(body)
    }

    /// Unregister the system rooted at `key`.
    pub fn remove_system_by_node(&self, key: SystemKey) -> bool {
        self.registry.remove_by_key(key)
    }

    /// Pause stepping. See [`SuspensionController::suspend`].
    pub fn suspend(&self, loading: bool) -> StepResult<()> {
        self.suspension.suspend(loading)
    }

    /// Resume stepping. Leaving a loading suspend resets every system first.
    /// Returns whether that reset ran.
    pub fn resume(&self) -> StepResult<bool> {
        let mut step = self.step.lock();
        self.suspension.resume(|| self.reset_locked(&mut step))
    }

    /// True while suspended (not in stasis).
    pub fn is_suspended(&self) -> bool {
        self.suspension.is_suspended()
    }

    /// True while a stasis operation runs.
    pub fn is_in_stasis(&self) -> bool {
        self.suspension.is_in_stasis()
    }

    /// Current suspension state.
    pub fn suspension_state(&self) -> SuspensionState {
        self.suspension.state()
    }

    /// Run `work` once with stepping halted, waiting for any in-flight frame
    /// first. Fails if another stasis operation is running.
    pub fn suspend_until_finished<R>(&self, work: impl FnOnce() -> R) -> StepResult<R> {
        let gate = self.step.lock();
        self.suspension.suspend_until_finished(move || {
            drop(gate);
            work()
        })
    }

    /// Point the wind at `direction` with magnitude `scale`, smoothed over
    /// `samples` sub-steps.
    pub fn set_wind(&self, direction: Vec3, scale: f32, samples: usize) {
        let mut step = self.step.lock();
        step.wind.set_target(direction, scale);
        step.wind.set_window(samples);
    }

    /// Current smoothed wind vector, before strength and attenuation.
    pub fn wind(&self) -> Vec3 {
        self.step.lock().wind.smoothed()
    }

    /// Install or remove the occluder used for wind attenuation.
    pub fn set_wind_occlusion(&self, occluder: Option<Arc<dyn WindOcclusion>>) {
        *self.occlusion.write() = occluder;
    }

    /// Latest viewer position from the camera. Used for wind attenuation
    /// and as the centre for the translation offset.
    pub fn set_viewer_position(&self, position: Vec3) {
        *self.viewer.lock() = position;
    }

    /// Latest viewer position.
    pub fn viewer_position(&self) -> Vec3 {
        *self.viewer.lock()
    }

    /// Move every system so the viewer sits at the origin. Returns the
    /// offset to hand back to
    /// [`restore_translation_offset`](Self::restore_translation_offset).
    /// Waits for an in-flight frame.
    pub fn apply_translation_offset(&self) -> Vec3 {
        let _step = self.step.lock();
        self.apply_offset_locked()
    }

    /// Undo [`apply_translation_offset`](Self::apply_translation_offset).
    /// If nothing stepped in between, the original transforms come back
    /// bit for bit. Only systems that were offset are moved back.
    pub fn restore_translation_offset(&self, offset: Vec3) {
        let _step = self.step.lock();
        self.restore_offset_locked(offset);
    }

    fn apply_offset_locked(&self) -> Vec3 {
        let offset = *self.viewer.lock();
        if offset == Vec3::ZERO || !offset.is_finite() {
            return Vec3::ZERO;
        }
        let transforms = self.registry.snapshot_transforms();
        self.registry.translate_all(-offset);
        *self.offset.lock() = Some(OffsetSnapshot {
            generation: self.generation.load(Ordering::Acquire),
            offset,
            transforms,
        });
        offset
    }

    fn restore_offset_locked(&self, offset: Vec3) {
        if offset == Vec3::ZERO {
            return;
        }
        let saved = self.offset.lock().take();
        match saved {
            Some(saved) if saved.offset == offset => {
                if saved.generation == self.generation.load(Ordering::Acquire) {
                    self.registry.restore_transforms(&saved.transforms);
                } else {
                    self.registry
                        .translate_where(offset, |key| saved.transforms.contains_key(&key));
                }
            }
            _ => self.registry.translate_all(offset),
        }
    }

    /// Current configuration.
    pub fn config(&self) -> WorldConfig {
        self.config.read().clone()
    }

    /// Replace the configuration. The worker pool size is fixed at
    /// creation and is not changed here.
    pub fn set_config(&self, config: WorldConfig) -> StepResult<()> {
        config.validate()?;
        self.step
            .lock()
            .wind
            .set_window(config.wind_smoothing_samples);
        *self.config.write() = config;
        Ok(())
    }

    /// Snapshot of the timing metrics.
    pub fn metrics(&self) -> Metrics {
        self.metrics.lock().clone()
    }

    /// Registered system keys.
    pub fn systems(&self) -> Vec<SystemKey> {
        self.registry.keys()
    }

    /// Systems held at their last good transforms after diverging.
    pub fn faulted_systems(&self) -> Vec<SystemKey> {
        self.registry.faulted_keys()
    }

    /// Carried frame remainder in seconds.
    pub fn remainder(&self) -> f32 {
        self.step.lock().clock.remainder()
    }

    /// Sub-steps run since creation.
    pub fn tick(&self) -> u64 {
        self.step.lock().clock.tick()
    }

    /// Halt stepping for good and drop every system. Idempotent.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let _step = self.step.lock();
        self.registry.clear();
        tracing::info!("physics world shut down");
    }

    /// True once [`shutdown`](Self::shutdown) ran.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

fn with_world(
    weak: &Weak<PhysicsWorld>,
    handler: impl Fn(&PhysicsWorld, &HostEvent) + Send + Sync + 'static,
) -> impl Fn(&HostEvent) + Send + Sync + 'static {
    let weak = weak.clone();
    move |event| {
        if let Some(world) = weak.upgrade() {
            handler(&world, event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Scripted, ScriptedBody, scripted};
    use smp_core::SimulationBody;

    fn test_config() -> WorldConfig {
        WorldConfig::default()
            .with_time_tick(0.01)
            .with_min_fps(1.0)
            .with_translation_offset(false)
            .with_worker_threads(2)
    }

    fn world_with(bodies: &[Scripted]) -> PhysicsWorld {
        let world = PhysicsWorld::new(test_config()).unwrap();
        for body in bodies {
            world.add_skinned_mesh_system(body.clone()).unwrap();
        }
        world
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = PhysicsWorld::new(WorldConfig::default().with_time_tick(-1.0)).unwrap_err();
        assert!(matches!(err, StepError::InvalidInput(_)));
    }

    #[test]
    fn frame_steps_registered_systems() {
        let body = scripted(ScriptedBody::new(1, 2));
        let world = world_with(&[body.clone()]);

        let report = world.do_update(0.025);
        assert_eq!(report.outcome, FrameOutcome::Stepped);
        assert_eq!(report.substeps, 2);
        assert_eq!(body.lock().advances, 2);
        assert!((world.remainder() - 0.005).abs() < 1e-6);
        assert_eq!(world.tick(), 2);

        let metrics = world.metrics();
        assert_eq!(metrics.frames, 1);
        assert_eq!(metrics.substeps, 2);
    }

    #[test]
    fn hitch_sequence_matches_formula() {
        let world = PhysicsWorld::new(
            test_config().with_time_tick(1.0 / 60.0).with_max_substeps(4),
        )
        .unwrap();
        let counts: Vec<u32> = [0.016, 0.016, 0.200, 0.016]
            .into_iter()
            .map(|delta| world.do_update(delta).substeps)
            .collect();
        assert_eq!(counts, vec![0, 1, 4, 0]);
        assert_eq!(world.metrics().clamped_frames, 1);
    }

    #[test]
    fn loading_suspend_resets_once_on_resume() {
        let body = scripted(ScriptedBody::new(1, 1));
        let world = world_with(&[body.clone()]);

        world.suspend(true).unwrap();
        assert!(world.is_suspended());
        assert!(world.resume().unwrap());
        assert_eq!(body.lock().resets, 1);
        assert!(!world.is_suspended());

        world.suspend(false).unwrap();
        assert!(!world.resume().unwrap());
        assert_eq!(body.lock().resets, 1);
    }

    #[test]
    fn suspended_frames_do_not_step() {
        let body = scripted(ScriptedBody::new(1, 1));
        let world = world_with(&[body.clone()]);
        world.suspend(false).unwrap();

        let report = world.do_update(0.05);
        assert_eq!(report.outcome, FrameOutcome::Suspended);
        assert_eq!(body.lock().advances, 0);
        assert_eq!(world.remainder(), 0.0);
    }

    #[test]
    fn suspend_until_finished_freezes_stepping() {
        let body = scripted(ScriptedBody::new(1, 1));
        let world = world_with(&[body.clone()]);

        let (inside, rejected) = world
            .suspend_until_finished(|| {
                let inside = world.do_update(0.05).outcome;
                let rejected = world.suspend(false).is_err() && world.resume().is_err();
                (inside, rejected)
            })
            .unwrap();
        assert_eq!(inside, FrameOutcome::Stasis);
        assert!(rejected);
        assert_eq!(body.lock().advances, 0);
        assert_eq!(world.suspension_state(), SuspensionState::Running);
        assert_eq!(world.do_update(0.01).substeps, 1);
    }

    #[test]
    fn translation_offset_round_trip_is_bit_identical() {
        let body = scripted(ScriptedBody::new(9, 3));
        let world = world_with(&[body.clone()]);
        body.lock()
            .translate(Vec3::new(12345.678, -0.1, 98765.43));
        let before = body.lock().transforms();

        world.set_viewer_position(Vec3::new(10000.1, 3.3, 99999.9));
        let offset = world.apply_translation_offset();
        assert_ne!(body.lock().transforms(), before);
        world.restore_translation_offset(offset);
        assert_eq!(body.lock().transforms(), before);
    }

    #[test]
    fn zero_translation_offset_is_a_no_op() {
        let body = scripted(ScriptedBody::new(2, 2));
        let world = world_with(&[body.clone()]);
        let before = body.lock().transforms();
        let offset = world.apply_translation_offset();
        assert_eq!(offset, Vec3::ZERO);
        world.restore_translation_offset(offset);
        assert_eq!(body.lock().transforms(), before);
    }

    #[test]
    fn stepping_under_offset_moves_back_to_world_space() {
        let body = scripted(ScriptedBody::new(1, 1));
        let world = PhysicsWorld::new(test_config().with_translation_offset(true)).unwrap();
        world.add_skinned_mesh_system(body.clone()).unwrap();
        world.set_viewer_position(Vec3::new(100.0, 0.0, 0.0));
        let start = body.lock().transforms()[0].translation;

        world.do_update(0.025);
        let end = body.lock().transforms()[0].translation;
        assert!((end.x - (start.x + 0.02)).abs() < 1e-4);
        assert!((end.z - start.z).abs() < 1e-4);
    }

    #[test]
    fn rejected_delta_is_not_recorded_as_an_interval() {
        let world = world_with(&[]);
        world.do_update(-1.0);
        world.do_update(f32::NAN);
        let metrics = world.metrics();
        assert_eq!(metrics.frames, 0);
        assert_eq!(metrics.average_interval.get(), None);

        world.do_update(0.01);
        assert_eq!(world.metrics().frames, 1);
    }

    #[test]
    fn offset_restore_skips_systems_added_after_apply() {
        let early = scripted(ScriptedBody::new(1, 1));
        let world = world_with(&[early.clone()]);
        world.set_viewer_position(Vec3::new(1000.0, 0.0, 0.0));
        let early_before = early.lock().transforms();

        let offset = world.apply_translation_offset();
        let late = scripted(ScriptedBody::new(2, 1));
        world.add_skinned_mesh_system(late.clone()).unwrap();
        let late_before = late.lock().transforms();
        // Force the generation-mismatch path.
        world.generation.fetch_add(1, Ordering::AcqRel);
        world.restore_translation_offset(offset);

        assert_eq!(late.lock().transforms(), late_before);
        assert_eq!(early.lock().transforms(), early_before);
    }

    #[test]
    fn public_offset_calls_wait_for_an_in_flight_frame() {
        let body = scripted(ScriptedBody::new(1, 1));
        body.lock().delay = std::time::Duration::from_millis(20);
        let world = Arc::new(world_with(&[body.clone()]));
        world.set_viewer_position(Vec3::new(500.0, 0.0, 0.0));

        let pending = world.spawn_update(0.035);
        while body.lock().advances == 0 {
            std::thread::yield_now();
        }
        let offset = world.apply_translation_offset();
        assert_eq!(body.lock().advances, 3);
        let x = body.lock().transforms()[0].translation.x;
        assert!((x - (0.03 - 500.0)).abs() < 1e-3);

        world.restore_translation_offset(offset);
        assert_eq!(pending.join().substeps, 3);
        let x = body.lock().transforms()[0].translation.x;
        assert!((x - 0.03).abs() < 1e-3);
    }

    #[test]
    fn bad_delta_is_rejected_without_failing_the_frame_loop() {
        let body = scripted(ScriptedBody::new(1, 1));
        let world = world_with(&[body.clone()]);
        assert_eq!(world.do_update(-1.0).outcome, FrameOutcome::Rejected);
        assert_eq!(world.do_update(f32::NAN).outcome, FrameOutcome::Rejected);
        assert_eq!(world.do_update(0.01).substeps, 1);
    }

    #[test]
    fn diverging_system_is_reported_and_held() {
        let a = scripted(ScriptedBody::new(1, 2));
        let b = scripted(ScriptedBody::new(2, 2).failing_on(1));
        let c = scripted(ScriptedBody::new(3, 2));
        let world = world_with(&[a.clone(), b.clone(), c.clone()]);
        let b_before = b.lock().transforms();

        let report = world.do_update(0.01);
        assert_eq!(report.faults, vec![SystemKey(2)]);
        assert_eq!(world.faulted_systems(), vec![SystemKey(2)]);
        assert_eq!(b.lock().transforms(), b_before);
        assert_eq!(a.lock().advances, 1);
        assert_eq!(c.lock().advances, 1);
        assert_eq!(world.metrics().faults, 1);

        world.reset_systems();
        assert!(world.faulted_systems().is_empty());
        assert_eq!(world.remainder(), 0.0);
    }

    #[test]
    fn registry_mutation_through_facade() {
        let a = scripted(ScriptedBody::new(1, 1));
        let b = scripted(ScriptedBody::new(2, 1));
        let world = world_with(&[a.clone(), b.clone()]);

        let handle: SharedBody = a.clone();
        assert!(world.remove_skinned_mesh_system(&handle));
        assert!(world.remove_system_by_node(SystemKey(2)));
        assert!(world.systems().is_empty());

        world.add_skinned_mesh_system(a.clone()).unwrap();
        assert!(matches!(
            world.add_skinned_mesh_system(a),
            Err(StepError::IllegalState(_))
        ));
    }

    #[test]
    fn inactive_systems_are_skipped_after_update_active_state() {
        let a = scripted(ScriptedBody::new(1, 1));
        let b = scripted(ScriptedBody::new(2, 1));
        let world = world_with(&[a.clone(), b.clone()]);
        b.lock().wants = false;

        assert_eq!(world.update_active_state(), 1);
        world.do_update(0.01);
        assert_eq!(a.lock().advances, 1);
        assert_eq!(b.lock().advances, 0);
    }

    #[derive(Debug)]
    struct FixedOcclusion(f32);

    impl WindOcclusion for FixedOcclusion {
        fn obstruction_distance(&self, _origin: Vec3, _direction: Vec3) -> Option<f32> {
            Some(self.0)
        }
    }

    #[test]
    fn wind_reaches_bodies_scaled_and_attenuated() {
        let body = scripted(ScriptedBody::new(1, 1));
        let world = world_with(&[body.clone()]);
        world.set_wind(Vec3::X, 3.0, 1);
        world.set_wind_occlusion(Some(Arc::new(FixedOcclusion(1525.0))));

        world.do_update(0.025);
        // strength 2 * attenuation 0.5, applied from the second sub-step on
        assert_eq!(body.lock().last_wind, Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(world.wind(), Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn disabled_wind_never_reaches_bodies() {
        let body = scripted(ScriptedBody::new(1, 1));
        let world = world_with(&[body.clone()]);
        let mut config = world.config();
        config.wind_enabled = false;
        world.set_config(config).unwrap();
        world.set_wind(Vec3::Y, 5.0, 1);

        world.do_update(0.025);
        assert_eq!(body.lock().last_wind, Vec3::ZERO);
    }

    #[test]
    fn set_config_validates() {
        let world = world_with(&[]);
        assert!(world.set_config(WorldConfig::default().with_max_substeps(0)).is_err());
        assert_eq!(world.config(), test_config());
    }

    #[test]
    fn shutdown_stops_everything() {
        let body = scripted(ScriptedBody::new(1, 1));
        let world = world_with(&[body.clone()]);
        world.shutdown();
        world.shutdown();

        assert!(world.is_shut_down());
        assert!(world.systems().is_empty());
        assert_eq!(world.do_update(0.05).outcome, FrameOutcome::Shutdown);
        assert!(world.add_skinned_mesh_system(body).is_err());
    }

    #[test]
    fn host_events_drive_the_world() {
        let body = scripted(ScriptedBody::new(1, 1));
        let world = Arc::new(world_with(&[body.clone()]));
        let mut bus = EventBus::new();
        world.attach(&mut bus);

        bus.dispatch(&HostEvent::Camera {
            position: Vec3::new(1.0, 2.0, 3.0),
        });
        assert_eq!(world.viewer_position(), Vec3::new(1.0, 2.0, 3.0));

        bus.dispatch(&HostEvent::Frame { delta: 0.035 });
        assert_eq!(body.lock().advances, 3);

        bus.dispatch(&HostEvent::Shutdown);
        assert!(world.is_shut_down());
    }

    #[test]
    fn dropped_world_ignores_events() {
        let world = Arc::new(world_with(&[]));
        let mut bus = EventBus::new();
        world.attach(&mut bus);
        drop(world);
        assert_eq!(bus.dispatch(&HostEvent::Frame { delta: 0.01 }), 1);
    }

    #[test]
    fn spawned_update_joins_with_report() {
        let body = scripted(ScriptedBody::new(1, 1));
        let world = Arc::new(world_with(&[body.clone()]));
        let pending = world.spawn_update(0.025);
        let report = pending.join();
        assert_eq!(report.outcome, FrameOutcome::Stepped);
        assert_eq!(report.substeps, 2);
        assert_eq!(body.lock().advances, 2);
    }

    #[test]
    fn global_world_is_created_once_and_torn_down() {
        let first = PhysicsWorld::global().unwrap();
        let second = PhysicsWorld::global().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        assert!(PhysicsWorld::teardown_global());
        assert!(first.is_shut_down());
        assert!(!PhysicsWorld::teardown_global());

        let fresh = PhysicsWorld::global().unwrap();
        assert!(!Arc::ptr_eq(&first, &fresh));
        assert!(PhysicsWorld::teardown_global());
    }
}
