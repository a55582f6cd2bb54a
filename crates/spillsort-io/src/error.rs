use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid cache configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Mem(#[from] spillsort_mem::error::Error),
}
