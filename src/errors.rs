use thiserror::Error;

/// Failures of a single enumeration, estimation or matching call. None of
/// them leave partial results behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoiseCorrectionError {
    /// Invalid or self-inconsistent configuration, e.g. a zero trigger data
    /// cardinality or a navigation source expiring within 7 days.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Rank outside of `[0, C(domain, k))`.
    #[error("Rank {rank} is out of range for {k}-combinations over {domain} elements")]
    InvalidRange { rank: u64, k: usize, domain: usize },

    /// An observation that is not part of the declared output space.
    #[error("Output {0} is not part of the output space")]
    UnknownOutput(String),
}

pub type Result<T, E = NoiseCorrectionError> = std::result::Result<T, E>;
