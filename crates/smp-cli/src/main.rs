//! Demo driver for the skinned-mesh physics stepping core.

mod commands;
mod demo;

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::simulate::SimulateOptions;

#[derive(Parser)]
#[command(
    name = "smp",
    about = "Skinned-mesh physics stepping: run a synthetic frame loop or inspect step plans",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive a world of demo chains through a synthetic frame loop
    Simulate {
        /// Number of frames to run
        #[arg(short, long, default_value = "120")]
        frames: u64,

        /// Nominal frame delta in seconds
        #[arg(short, long, default_value = "0.016")]
        delta: f32,

        /// Random +/- jitter added to each frame delta, in seconds
        #[arg(long, default_value = "0.0")]
        jitter: f32,

        /// Insert a hitch every K frames (0 = never)
        #[arg(long, default_value = "0")]
        hitch_every: u64,

        /// Delta of a hitch frame in seconds
        #[arg(long, default_value = "0.25")]
        hitch: f32,

        /// Number of demo chains to register
        #[arg(long, default_value = "4")]
        systems: usize,

        /// RNG seed for jitter and wind gusts
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// JSON configuration file (missing fields use defaults)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Suspend before this frame
        #[arg(long)]
        suspend_at: Option<u64>,

        /// Resume before this frame
        #[arg(long)]
        resume_at: Option<u64>,

        /// Make the suspension a loading suspension (systems reset on resume)
        #[arg(long)]
        loading: bool,

        /// Print every frame; repeat to raise the log level
        #[arg(short, long, action = ArgAction::Count)]
        verbose: u8,
    },

    /// Print the sub-step plan for a sequence of frame deltas
    Plan {
        /// Frame deltas in seconds
        #[arg(required = true)]
        deltas: Vec<f32>,

        /// Fixed sub-step length in seconds (default: 1/60)
        #[arg(short, long)]
        tick: Option<f32>,

        /// Sub-step cap per frame (default: 4)
        #[arg(short, long)]
        max_substeps: Option<u32>,
    },

    /// Print the default configuration as JSON
    Config,
}

/// Log to stderr. `RUST_LOG` wins over the `-v` count.
fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 | 1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let verbosity = match &cli.command {
        Commands::Simulate { verbose, .. } => *verbose,
        _ => 0,
    };
    init_tracing(verbosity);

    let result = match cli.command {
        Commands::Simulate {
            frames,
            delta,
            jitter,
            hitch_every,
            hitch,
            systems,
            seed,
            config,
            suspend_at,
            resume_at,
            loading,
            verbose,
        } => commands::simulate::run(&SimulateOptions {
            frames,
            delta,
            jitter,
            hitch_every,
            hitch,
            systems,
            seed,
            config,
            suspend_at,
            resume_at,
            loading,
            verbose,
        }),
        Commands::Plan {
            deltas,
            tick,
            max_substeps,
        } => commands::plan::run(&deltas, tick, max_substeps),
        Commands::Config => commands::config::run(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
