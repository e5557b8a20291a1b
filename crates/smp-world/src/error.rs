use smp_core::{BodyError, SystemKey};

/// Alias for `Result<T, StepError>`.
pub type StepResult<T> = Result<T, StepError>;

/// Errors raised by the stepping core.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// Bad scheduler or configuration input (negative/NaN time, non-positive tick).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation that the current state does not allow.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// A system's numeric state became invalid during a sub-step.
    #[error("system {key} diverged: {source}")]
    SimulationDivergence {
        /// The faulted system.
        key: SystemKey,
        /// What the body reported.
        source: BodyError,
    },

    /// The worker pool could not be created.
    #[error("worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}
