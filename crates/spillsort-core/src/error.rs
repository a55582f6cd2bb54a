use thiserror::Error;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("field '{0}' not found in row")]
    FieldNotFound(String),

    #[error("memory probe failed: {0}")]
    Probe(String),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),
}
