use crate::cache::Strategy;
use std::{io, path::PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SolcError>;

/// Various error types
#[derive(Debug, Error)]
pub enum SolcError {
    /// The dataset root itself can not be read, fatal for a run
    #[error("dataset root \"{}\" is not readable: {source}", path.display())]
    DatasetIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// An artifact whose `metadata.json` is missing or unusable
    #[error("malformed metadata at \"{}\": {reason}", path.display())]
    MalformedMetadata { path: PathBuf, reason: String },
    #[error("no solc binary available for version {0}")]
    MissingCompilerBinary(String),
    #[error("strategy `{tag}` failed: {reason}")]
    CompileStrategyFailed { tag: Strategy, reason: String },
    #[error("all compile strategies failed for {hash}: {reasons}")]
    AllStrategiesFailed { hash: String, reasons: String },
    #[error("artifact {hash} is pinned to {expected} but the engine was loaded for {loaded}")]
    VersionMismatch { hash: String, expected: String, loaded: String },
    /// Internal solc error
    #[error("Solc Error: {0}")]
    SolcError(String),
    /// Deserialization error
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    /// Filesystem IO error
    #[error(transparent)]
    Io(#[from] SolcIoError),
    /// Failed to download a compiler binary
    #[error(transparent)]
    Fetch(#[from] reqwest::Error),
    /// General purpose message
    #[error("{0}")]
    Message(String),
}

impl SolcError {
    pub(crate) fn io(err: io::Error, path: impl Into<PathBuf>) -> Self {
        SolcIoError::new(err, path).into()
    }
    pub(crate) fn solc(msg: impl Into<String>) -> Self {
        SolcError::SolcError(msg.into())
    }
    pub(crate) fn msg(msg: impl Into<String>) -> Self {
        SolcError::Message(msg.into())
    }
    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        SolcError::MalformedMetadata { path: path.into(), reason: reason.to_string() }
    }
}

#[derive(Debug, Error)]
#[error("\"{}\": {io}", self.path.display())]
pub struct SolcIoError {
    io: io::Error,
    path: PathBuf,
}

impl SolcIoError {
    pub fn new(io: io::Error, path: impl Into<PathBuf>) -> Self {
        Self { io, path: path.into() }
    }

    /// The path the failed operation was performed on
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn kind(&self) -> io::ErrorKind {
        self.io.kind()
    }
}

impl From<SolcIoError> for io::Error {
    fn from(err: SolcIoError) -> Self {
        err.io
    }
}
