//! `extract-abi` subcommand

use super::Cmd;
use crate::config::FiestaConfig;
use clap::Parser;
use eyre::WrapErr;
use fiesta_solc::{Inventory, SolcVersion};
use fiesta_store::{Indexed, SignatureStore};
use yansi::Paint;

/// `extract-abi` subcommand
#[derive(Debug, Clone, Parser)]
pub struct ExtractCmd {
    /// Only index artifacts whose hash starts with this prefix
    #[arg(long)]
    pub prefix: Option<String>,
}

impl Cmd for ExtractCmd {
    fn run(self, config: FiestaConfig) -> eyre::Result<()> {
        let inventory = Inventory::read(&config.dataset)?.filtered(None, self.prefix.as_deref());
        let store = SignatureStore::open(&config.database).wrap_err_with(|| {
            format!("failed to open database \"{}\"", config.database.display())
        })?;

        let (mut indexed, mut skipped) = (0, 0);
        let mut failed = inventory.malformed().len();
        for artifact in inventory.artifacts() {
            print!(
                "{} {} {} {} ",
                Paint::magenta(artifact.short_hash()),
                Paint::cyan(&artifact.name),
                SolcVersion::new(&artifact.version).short(),
                Paint::new("|").dimmed()
            );
            match store.index_artifact(artifact) {
                Ok(Indexed::Recorded(selectors)) => {
                    indexed += 1;
                    println!("{selectors} selectors {}", Paint::green("✓"));
                }
                Ok(Indexed::NotCompiled) => {
                    skipped += 1;
                    println!("{}", Paint::yellow("not compiled"));
                }
                Err(err) => {
                    failed += 1;
                    tracing::debug!("failed to index {}: {err}", artifact.hash);
                    println!("{}", Paint::red(format!("{err} ⨯")));
                }
            }
        }
        println!(
            "{} indexed, {} not compiled, {} failed",
            Paint::green(indexed),
            Paint::yellow(skipped),
            Paint::red(failed)
        );
        Ok(())
    }
}
