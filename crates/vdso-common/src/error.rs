use thiserror::Error;

/// Harness error types covering the fatal, top-level tier.
///
/// Every variant terminates the run: there is no per-comparison retry, and
/// individual fast-path/slow-path mismatches are counted on the run context
/// instead of surfacing here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HarnessError {
    /// Configuration or initialization error.
    #[error("configuration error: {0}")]
    Config(String),

    /// CPU affinity query failed or yielded an empty set.
    #[error("cpu affinity error: {0}")]
    Affinity(String),

    /// Signal handler installation or POSIX timer setup failed.
    #[error("timer error: {0}")]
    Timer(String),

    /// Requested API name has no registered test suite.
    #[error("unknown test suite '{0}' specified")]
    UnknownApi(String),

    /// Requested test-type name has no registered execution mode.
    #[error("unknown test function '{0}' specified")]
    UnknownTestType(String),
}

/// Convenience type alias for harness operations.
pub type HarnessResult<T> = Result<T, HarnessError>;
