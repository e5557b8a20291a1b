/// Alias for `Result<T, BodyError>`.
pub type BodyResult<T> = Result<T, BodyError>;

/// Failures a simulation body can report while advancing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BodyError {
    /// The body's numeric state blew up (solver divergence, NaN velocities).
    #[error("simulation diverged: {0}")]
    Diverged(String),

    /// A bone transform is no longer finite.
    #[error("invalid transform at bone {index}")]
    InvalidTransform {
        /// Index of the offending bone.
        index: usize,
    },
}
