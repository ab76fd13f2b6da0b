//! Fiesta Config
//!
//! Read from `fiesta.toml` in the working directory, or from the file given with `--config`.
//! Every key is optional, flags and `FIESTA_*` environment variables take precedence.

use eyre::WrapErr;
use fiesta_solc::{
    install::{BINARIES_URL, DEFAULT_PLATFORM},
    DatasetConfig, DEFAULT_JOBS,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Fiesta Configuration Filename
pub const CONFIG_FILE: &str = "fiesta.toml";

/// Fiesta Configuration
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FiestaConfig {
    /// Dataset root with the shard prefix directories
    pub dataset: PathBuf,
    /// Directory of the `solc-<version>` binaries
    pub bin_dir: PathBuf,
    /// The signature database
    pub database: PathBuf,
    /// Number of compile workers
    pub jobs: usize,
    /// Platform of the binary list, e.g. `linux-amd64` or `macosx-amd64`
    pub platform: String,
    pub binaries_url: String,
}

impl Default for FiestaConfig {
    fn default() -> Self {
        Self {
            dataset: PathBuf::from("smart-contract-fiesta/organized_contracts"),
            bin_dir: PathBuf::from(".solc"),
            database: PathBuf::from(fiesta_store::DATABASE_FILE),
            jobs: DEFAULT_JOBS,
            platform: DEFAULT_PLATFORM.to_string(),
            binaries_url: BINARIES_URL.to_string(),
        }
    }
}

impl FiestaConfig {
    /// Loads the config file.
    ///
    /// An explicitly given file must exist, a missing default file yields the defaults.
    pub fn load(path: Option<&Path>) -> eyre::Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None if Path::new(CONFIG_FILE).exists() => PathBuf::from(CONFIG_FILE),
            None => return Ok(Self::default()),
        };
        let content = std::fs::read_to_string(&path)
            .wrap_err_with(|| format!("failed to read config \"{}\"", path.display()))?;
        let config = Self::parse(&content)
            .wrap_err_with(|| format!("invalid config \"{}\"", path.display()))?;
        tracing::debug!("loaded config \"{}\"", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> eyre::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn dataset_config(&self) -> DatasetConfig {
        DatasetConfig::builder()
            .root(&self.dataset)
            .bin_dir(&self.bin_dir)
            .jobs(self.jobs)
            .build()
    }
}
