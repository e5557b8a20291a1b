//! Core types for the skinned-mesh physics stepping core.
//!
//! This crate defines the contract between the stepping core and the
//! mesh/skeleton provider: the [`SimulationBody`] trait, the per-sub-step
//! [`StepContext`], and the small value types they exchange. It carries no
//! scheduling logic; see `smp-world` for that.

/// The steppable body contract implemented by mesh/skeleton providers.
pub mod body;
/// Error types reported by simulation bodies.
pub mod error;
/// Stable identifiers for simulated systems.
pub mod key;
/// Bone transforms and rotation clamping.
pub mod transform;

/// Re-export body contract types.
pub use body::{SharedBody, SimulationBody, StepContext, shared};
/// Re-export error types.
pub use error::{BodyError, BodyResult};
/// Re-export the system key.
pub use key::SystemKey;
/// Re-export transform types.
pub use transform::{Transform, clamp_rotation};

/// Re-export of the vector math types used across the workspace.
pub use glam::{Quat, Vec3};
