//! `export-selectors` subcommand

use super::Cmd;
use crate::config::FiestaConfig;
use clap::Parser;
use eyre::WrapErr;
use fiesta_store::SignatureStore;
use std::path::PathBuf;

/// `export-selectors` subcommand
#[derive(Debug, Clone, Parser)]
pub struct ExportCmd {
    /// Where to write the json array
    #[arg(default_value = "sighashes.json")]
    pub out: PathBuf,
}

impl Cmd for ExportCmd {
    fn run(self, config: FiestaConfig) -> eyre::Result<()> {
        if !config.database.exists() {
            eyre::bail!("no database at \"{}\", run `extract-abi` first", config.database.display())
        }
        let store = SignatureStore::open(&config.database)?;
        let selectors = store.unique_selectors()?;
        let json = serde_json::to_string_pretty(&selectors)?;
        std::fs::write(&self.out, json)
            .wrap_err_with(|| format!("failed to write \"{}\"", self.out.display()))?;
        println!("{} selectors written to \"{}\"", selectors.len(), self.out.display());
        Ok(())
    }
}
