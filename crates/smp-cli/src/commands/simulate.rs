use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smp_core::{SharedBody, Vec3, shared};
use smp_world::{FrameOutcome, FrameReport, PhysicsWorld};

use crate::demo::{DemoChain, tip_sway};

/// Frames between random wind gusts.
const GUST_EVERY: u64 = 30;
const CHAIN_BONES: usize = 6;
const CHAIN_SEGMENT: f32 = 0.25;

/// Options for `smp simulate`.
pub struct SimulateOptions {
    pub frames: u64,
    pub delta: f32,
    pub jitter: f32,
    pub hitch_every: u64,
    pub hitch: f32,
    pub systems: usize,
    pub seed: u64,
    pub config: Option<PathBuf>,
    pub suspend_at: Option<u64>,
    pub resume_at: Option<u64>,
    pub loading: bool,
    pub verbose: u8,
}

pub fn run(opts: &SimulateOptions) -> Result<(), String> {
    let config = super::load_config(opts.config.as_deref())?;
    let world =
        PhysicsWorld::new(config.clone()).map_err(|e| format!("cannot create world: {e}"))?;

    let bodies: Vec<SharedBody> = (0..opts.systems)
        .map(|i| {
            let anchor = Vec3::new(i as f32 * 2.0, 3.0, 0.0);
            shared(DemoChain::new(i as u64 + 1, anchor, CHAIN_BONES, CHAIN_SEGMENT))
        })
        .collect();
    for body in &bodies {
        world
            .add_skinned_mesh_system(body.clone())
            .map_err(|e| e.to_string())?;
    }

    tracing::info!(
        frames = opts.frames,
        systems = opts.systems,
        threads = config.worker_threads,
        "starting demo frame loop"
    );
    let mut rng = StdRng::seed_from_u64(opts.seed);
    let mut rows: Vec<(u64, f32, FrameReport)> = Vec::new();
    let mut max_sway = 0.0_f32;

    for frame in 0..opts.frames {
        if opts.suspend_at == Some(frame) {
            world.suspend(opts.loading).map_err(|e| e.to_string())?;
        }
        if opts.resume_at == Some(frame) {
            world.resume().map_err(|e| e.to_string())?;
        }
        if frame % GUST_EVERY == 0 {
            let angle = rng.random_range(0.0..std::f32::consts::TAU);
            let scale = rng.random_range(0.5..4.0);
            world.set_wind(
                Vec3::new(angle.cos(), 0.0, angle.sin()),
                scale,
                config.wind_smoothing_samples,
            );
        }

        let delta = frame_delta(opts, frame, &mut rng);
        let report = world.do_update(delta);
        for body in &bodies {
            max_sway = max_sway.max(tip_sway(&body.lock().transforms()));
        }
        rows.push((frame, delta, report));
    }

    // Header
    println!(
        "  {} {}",
        "Simulation".bold(),
        format!(
            "({} frames, {} systems, seed={}, {} workers)",
            opts.frames,
            opts.systems,
            opts.seed,
            config.worker_threads
        )
        .dimmed()
    );
    println!();

    if opts.verbose > 0 {
        print_frames(&rows);
    }

    let metrics = world.metrics();
    let count = |outcome: FrameOutcome| rows.iter().filter(|(_, _, r)| r.outcome == outcome).count();

    println!("  {}", "Summary".bold().underline());
    println!();
    println!(
        "  Frames        {} ({} stepped)",
        metrics.frames, metrics.stepped_frames
    );
    println!(
        "  Sub-steps     {} ({:.4}s tick, max {})",
        metrics.substeps, config.time_tick, config.max_substeps
    );
    println!("  Clamped       {}", metrics.clamped_frames);
    println!(
        "  Skipped       {} suspended, {} rejected",
        count(FrameOutcome::Suspended),
        count(FrameOutcome::Rejected)
    );
    let faults = if metrics.faults == 0 {
        "0".green().to_string()
    } else {
        metrics.faults.to_string().red().to_string()
    };
    println!("  Faults        {faults}");
    println!(
        "  Avg interval  {}",
        millis(metrics.average_interval.get())
    );
    println!(
        "  Avg step      {}",
        millis(metrics.average_processing.get())
    );
    println!(
        "  Simulated     {:.3}s",
        world.tick() as f32 * config.time_tick
    );
    println!("  Max tip sway  {max_sway:.3}");

    world.shutdown();
    Ok(())
}

fn frame_delta(opts: &SimulateOptions, frame: u64, rng: &mut StdRng) -> f32 {
    if opts.hitch_every > 0 && (frame + 1) % opts.hitch_every == 0 {
        return opts.hitch;
    }
    if opts.jitter > 0.0 {
        (opts.delta + rng.random_range(-opts.jitter..=opts.jitter)).max(0.0)
    } else {
        opts.delta
    }
}

fn print_frames(rows: &[(u64, f32, FrameReport)]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Frame", "Delta", "Outcome", "Sub-steps", "Plan", "Faults"]);

    for (frame, delta, report) in rows {
        let outcome = match report.outcome {
            FrameOutcome::Stepped => report.outcome.to_string().green(),
            FrameOutcome::Suspended | FrameOutcome::Stasis => report.outcome.to_string().yellow(),
            FrameOutcome::Rejected | FrameOutcome::Shutdown => report.outcome.to_string().red(),
        };
        let plan = report
            .plan
            .map_or_else(|| "--".to_string(), |plan| plan.to_string());
        let faults = if report.faults.is_empty() {
            String::new()
        } else {
            report
                .faults
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        table.add_row(vec![
            frame.to_string(),
            format!("{delta:.4}"),
            outcome.to_string(),
            report.substeps.to_string(),
            plan,
            faults,
        ]);
    }

    println!("{table}");
    println!();
}

fn millis(seconds: Option<f32>) -> String {
    match seconds {
        Some(s) => format!("{:.3} ms", s * 1000.0),
        None => "--".dimmed().to_string(),
    }
}
