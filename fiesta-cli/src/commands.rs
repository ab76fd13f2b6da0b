//! Fiesta Subcommands
//!
//! The phases are meant to run in order: `fetch-binaries`, `compile`, then `extract-abi` to
//! rebuild the signature database from the cache records. `stats`, `export-selectors` and
//! `compare` only read.

mod compare;
mod compile;
mod export;
mod extract;
mod fetch;
mod stats;

use self::{
    compare::CompareCmd, compile::CompileCmd, export::ExportCmd, extract::ExtractCmd,
    fetch::FetchCmd, stats::StatsCmd,
};
use crate::config::FiestaConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Runs a subcommand against the loaded configuration
pub trait Cmd {
    fn run(self, config: FiestaConfig) -> eyre::Result<()>;
}

/// Fiesta Subcommands
#[derive(Debug, Subcommand)]
pub enum FiestaCmd {
    /// Download the solc binary of every version used by the dataset
    FetchBinaries(FetchCmd),
    /// Compile all artifacts without a valid cache record
    Compile(CompileCmd),
    /// Index the cache records of all artifacts into the signature database
    ExtractAbi(ExtractCmd),
    /// Print shard sizes and the most frequent versions and selectors
    Stats(StatsCmd),
    /// Write the sorted list of unique selectors as json
    ExportSelectors(ExportCmd),
    /// Compare two selector lists
    Compare(CompareCmd),
}

impl Cmd for FiestaCmd {
    fn run(self, config: FiestaConfig) -> eyre::Result<()> {
        match self {
            FiestaCmd::FetchBinaries(cmd) => cmd.run(config),
            FiestaCmd::Compile(cmd) => cmd.run(config),
            FiestaCmd::ExtractAbi(cmd) => cmd.run(config),
            FiestaCmd::Stats(cmd) => cmd.run(config),
            FiestaCmd::ExportSelectors(cmd) => cmd.run(config),
            FiestaCmd::Compare(cmd) => cmd.run(config),
        }
    }
}

/// Batch compile a verified contract dataset and index its function signatures
#[derive(Debug, Parser)]
#[command(author, about, version)]
pub struct EntryPoint {
    #[command(subcommand)]
    cmd: FiestaCmd,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Use the specified config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Dataset root, overrides the config file
    #[arg(long, global = true, env = "FIESTA_DATASET")]
    pub dataset: Option<PathBuf>,

    /// Directory of the solc binaries, overrides the config file
    #[arg(long, global = true, env = "FIESTA_BIN_DIR")]
    pub bin_dir: Option<PathBuf>,

    /// Signature database, overrides the config file
    #[arg(long, global = true, env = "FIESTA_DB")]
    pub db: Option<PathBuf>,
}

impl EntryPoint {
    /// Loads the config file and applies the command line overrides
    pub fn config(&self) -> eyre::Result<FiestaConfig> {
        let mut config = FiestaConfig::load(self.config.as_deref())?;
        if let Some(dataset) = &self.dataset {
            config.dataset = dataset.clone();
        }
        if let Some(bin_dir) = &self.bin_dir {
            config.bin_dir = bin_dir.clone();
        }
        if let Some(db) = &self.db {
            config.database = db.clone();
        }
        Ok(config)
    }

    pub fn run(self) -> eyre::Result<()> {
        let config = self.config()?;
        self.cmd.run(config)
    }
}
