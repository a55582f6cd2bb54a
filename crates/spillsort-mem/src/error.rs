use thiserror::Error;

/// Result type local to spillsort-mem.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("spill storage error: {0}")]
    Storage(String),

    #[error("unsupported codec: {0}")]
    CodecUnsupported(String),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("checksum mismatch for segment '{0}'")]
    ChecksumMismatch(String),

    #[error("memory probe error: {0}")]
    Probe(String),

    #[error(transparent)]
    Core(#[from] spillsort_core::error::Error),
}
