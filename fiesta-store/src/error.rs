use fiesta_solc::error::SolcError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    /// Reading a cache record or parsing its output failed
    #[error(transparent)]
    Solc(#[from] SolcError),
    #[error("{0} can not be represented as a count")]
    Count(i64),
}
