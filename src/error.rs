//! Error taxonomy for the clustering engine.
//!
//! Every failure here reflects bad configuration or a genuine numeric or
//! data pathology, never a transient fault, so nothing is retried.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Invalid parameter combination, raised before any computation.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A documented but unimplemented option was selected.
    #[error("unsupported option: {0}")]
    Unsupported(&'static str),

    /// Emission estimation needs at least one observation.
    #[error("cannot estimate emissions for an empty cluster")]
    EmptyCluster,

    /// A log likelihood or distance came out non-finite. Fatal for the
    /// affected pair or cluster: the modeling assumptions are violated.
    #[error("non-finite {0}")]
    NumericInstability(String),

    /// A clustering cut failed to produce exactly k non-empty groups.
    #[error("requested {k} clusters but the cut produced {got}")]
    ClusterCardinality { k: usize, got: usize },

    /// A trained model violates the probability distribution invariants.
    #[error("invalid hidden markov model: {0}")]
    InvalidModel(String),
}
