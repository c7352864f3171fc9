//! Error types for the simplifier.

/// Result type for simplifier operations.
pub type LodResult<T> = Result<T, LodError>;

/// Caller contract violations reported by [`ProgressiveLod`](crate::ProgressiveLod).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LodError {
    /// `preserve_topology` decides which edges become candidates, so it is
    /// fixed once candidates exist.
    #[error("preserve_topology cannot change after precomputation")]
    TopologyPolicyLocked,
}
