use thiserror::Error;

use crate::types::IdentityKey;

/// Failures surfaced by the search path.
///
/// Storage and binaries wrap these in `anyhow`; callers that need to branch on
/// the kind can `downcast_ref::<Error>()`.
#[derive(Debug, Error)]
pub enum Error {
    /// Dimension mismatch, missing model, unusable tables. Fatal at start-up.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Search index holds no vectors")]
    EmptyIndex,

    /// Rejected before any computation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A candidate has no paired vector in the snapshot.
    #[error("No vector stored for course {key}")]
    IndexConsistency { key: IdentityKey },

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self { Self::Configuration(msg.into()) }

    pub fn invalid(msg: impl Into<String>) -> Self { Self::InvalidArgument(msg.into()) }
}

pub type Result<T> = std::result::Result<T, Error>;
