use thiserror::Error;

/// Errors surfaced by the trainer
///
/// Numerical degeneracy (e.g. zero advantage spread) is absorbed by epsilons and
/// never reported here.
#[derive(Debug, Error)]
pub enum TrulyPpoError {
    /// A host-side vector does not have the length the consumer expects
    #[error("dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Reading tensor data back to the host failed
    #[error("failed to read tensor data: {0}")]
    TensorRead(String),

    /// Missing checkpoint artifact, schema mismatch or recorder failure
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TrulyPpoError>;
