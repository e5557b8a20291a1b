//! Frame-driven stepping core for skinned-mesh physics.
//!
//! A host calls [`PhysicsWorld::do_update`] once per rendered frame. The world
//! decides how many fixed sub-steps to run ([`scheduler`]), whether stepping
//! is allowed at all ([`suspension`]), fans each sub-step out over the
//! registered bodies on a worker pool ([`runner`]) and keeps a smoothed wind
//! force ([`wind`]). The bodies themselves are opaque; see `smp-core`.

/// Accumulated remainder and sub-step counter.
pub mod clock;
/// Flat configuration set with defaults.
pub mod config;
/// Error types for the stepping core.
pub mod error;
/// Host event kinds and the dispatch table that routes them.
pub mod event;
/// Rolling averages and counters published after each frame.
pub mod metrics;
/// The set of registered simulation bodies.
pub mod registry;
/// Executes a step plan over the registry on a worker pool.
pub mod runner;
/// Converts frame time into fixed sub-steps.
pub mod scheduler;
/// Suspend/resume/stasis gate.
pub mod suspension;
#[cfg(test)]
mod testing;
/// Smoothed, attenuated wind force.
pub mod wind;
/// The top-level facade the host talks to.
pub mod world;

/// Re-export of [`clock::StepClock`].
pub use clock::StepClock;
/// Re-export of [`config::WorldConfig`].
pub use config::WorldConfig;
/// Re-exports of [`error::StepError`] and [`error::StepResult`].
pub use error::{StepError, StepResult};
/// Re-exports of the host event types.
pub use event::{EventBus, EventKind, HostEvent};
/// Re-export of [`metrics::Metrics`].
pub use metrics::Metrics;
/// Re-export of [`registry::SystemRegistry`].
pub use registry::SystemRegistry;
/// Re-exports of the runner types.
pub use runner::{ConcurrentStepRunner, RunReport};
/// Re-exports of the scheduler types.
pub use scheduler::{StepParams, StepPlan, StepScheduler};
/// Re-exports of the suspension types.
pub use suspension::{SuspensionController, SuspensionState};
/// Re-exports of the wind types.
pub use wind::{WindModel, WindOcclusion};
/// Re-exports of the facade types.
pub use world::{FrameOutcome, FrameReport, PendingUpdate, PhysicsWorld};
