//! Engine error taxonomy

use thiserror::Error;

/// All failures the engine surfaces to its callers.
///
/// Configuration and rule errors are raised once at construction; the hot
/// paths (drawing, classification) operate on validated snapshots and do
/// not fail. Invariant violations abort the affected computation only.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A weight table failed validation
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A rule or punishment failed validation
    #[error("invalid rule: {0}")]
    InvalidRule(String),

    /// A caller passed an unusable argument (unknown id, zero samples, ...)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A probability report's total mass drifted outside tolerance
    #[error("probability mass {total} deviates from 1.0 beyond epsilon {epsilon}")]
    ProbabilityInvariantViolation { total: f64, epsilon: f64 },
}
