use std::collections::HashMap;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use smp_core::{BodyError, StepContext, SystemKey, Transform};

use crate::clock::StepClock;
use crate::error::{StepError, StepResult};
use crate::registry::{SystemEntry, SystemRegistry};
use crate::scheduler::StepPlan;
use crate::wind::WindModel;

/// Per-frame inputs the runner hands to bodies besides the plan itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepEnv {
    /// Multiplier for the smoothed wind (strength times attenuation, 0 when
    /// wind is off).
    pub wind_scale: f32,
    /// Per-sub-step rotation limit in radians.
    pub rotation_limit: Option<f32>,
}

impl Default for StepEnv {
    fn default() -> Self {
        Self {
            wind_scale: 1.0,
            rotation_limit: None,
        }
    }
}

/// What happened while running a plan.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Sub-steps actually executed.
    pub substeps_run: u32,
    /// The gate closed before the plan finished.
    pub interrupted: bool,
    /// Systems that faulted this frame, with the reason.
    pub faults: Vec<(SystemKey, BodyError)>,
    /// Wall-clock time spent running.
    pub elapsed: Duration,
}

impl RunReport {
    /// Average wall-clock cost of one sub-step, if any ran.
    pub fn per_substep(&self) -> Option<Duration> {
        (self.substeps_run > 0).then(|| self.elapsed / self.substeps_run)
    }
}

/// Runs step plans on a bounded worker pool.
///
/// Sub-steps are sequential. Within a sub-step every steppable system
/// advances in parallel; the wind model then takes one sample. A system that
/// fails is put back to its transforms from the start of the frame, flagged
/// faulted and left out of later sub-steps, without disturbing its siblings.
#[derive(Debug)]
pub struct ConcurrentStepRunner {
    pool: rayon::ThreadPool,
}

impl ConcurrentStepRunner {
    /// Create a runner with `threads` workers (0 lets rayon decide).
    pub fn new(threads: usize) -> StepResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("smp-step-{i}"))
            .build()?;
        Ok(Self { pool })
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Queue `job` on the worker pool without waiting for it.
    pub fn spawn(&self, job: impl FnOnce() + Send + 'static) {
        self.pool.spawn(job);
    }

    /// Execute `plan`. `gate` is checked before each sub-step; once it
    /// returns false the remaining sub-steps are skipped.
    pub fn run(
        &self,
        plan: &StepPlan,
        registry: &SystemRegistry,
        wind: &mut WindModel,
        clock: &mut StepClock,
        env: StepEnv,
        gate: impl Fn() -> bool,
    ) -> RunReport {
        let started = Instant::now();
        let mut report = RunReport::default();
        if plan.substeps == 0 {
            return report;
        }

        let dt = plan.substep_duration;
        let baseline = registry.snapshot_transforms();

        for _ in 0..plan.substeps {
            if !gate() {
                report.interrupted = true;
                break;
            }
            let ctx = StepContext {
                dt,
                tick: clock.advance(dt),
                wind: wind.smoothed() * env.wind_scale,
                rotation_limit: env.rotation_limit,
            };
            let faults = registry.with_entries(|entries| {
                self.pool.install(|| {
                    entries
                        .par_iter()
                        .filter(|entry| entry.is_steppable())
                        .filter_map(|entry| advance_entry(entry, &ctx, &baseline))
                        .collect::<Vec<_>>()
                })
            });
            report.faults.extend(faults);
            wind.update(dt);
            report.substeps_run += 1;
        }

        report.elapsed = started.elapsed();
        report
    }
}

/// Advance one system by one sub-step, isolating any failure to it.
fn advance_entry(
    entry: &SystemEntry,
    ctx: &StepContext,
    baseline: &HashMap<SystemKey, Vec<Transform>>,
) -> Option<(SystemKey, BodyError)> {
    let key = entry.key();
    let mut body = entry.body().lock();
    // Systems registered mid-frame have no baseline; fall back to this sub-step.
    let fallback = (!baseline.contains_key(&key)).then(|| body.transforms());

    let outcome = body.advance(ctx).and_then(|()| {
        match body.transforms().iter().position(|t| !t.is_finite()) {
            Some(index) => Err(BodyError::InvalidTransform { index }),
            None => Ok(()),
        }
    });

    let error = outcome.err()?;
    if let Some(good) = baseline.get(&key).or(fallback.as_ref()) {
        body.set_transforms(good);
    }
    entry.mark_faulted();
    let fault = StepError::SimulationDivergence {
        key,
        source: error.clone(),
    };
    tracing::warn!(tick = ctx.tick, error = %fault, "system faulted, holding last good transforms");
    Some((key, error))
}
