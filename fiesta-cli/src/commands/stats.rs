//! `stats` subcommand

use super::Cmd;
use crate::config::FiestaConfig;
use clap::Parser;
use fiesta_core::utils::selector_hex;
use fiesta_solc::{dataset::shard_counts, SolcVersion};
use fiesta_store::SignatureStore;
use yansi::Paint;

/// Shards printed per line
const SHARDS_PER_LINE: usize = 8;

/// `stats` subcommand
#[derive(Debug, Clone, Parser)]
pub struct StatsCmd {
    /// Number of versions and selectors to list
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

impl Cmd for StatsCmd {
    fn run(self, config: FiestaConfig) -> eyre::Result<()> {
        let shards = shard_counts(&config.dataset)?;
        for line in shard_lines(&shards) {
            println!("{line}");
        }
        let total: usize = shards.iter().map(|(_, count)| count).sum();
        println!("Total Bytecode Hashes: {}", Paint::blue(total));

        if !config.database.exists() {
            tracing::debug!("no database at \"{}\"", config.database.display());
            return Ok(())
        }
        let store = SignatureStore::open(&config.database)?;
        println!("\nIndexed contracts: {}", Paint::blue(store.contract_count()?));

        println!("\nTop {} versions", self.top);
        for (version, count) in store.version_frequency(Some(self.top))? {
            println!("{:>8} {}", Paint::magenta(count), SolcVersion::new(version).short());
        }

        println!("\nTop {} selectors", self.top);
        for (signature, count) in store.selector_frequency(Some(self.top))? {
            println!(
                "{:>8} {} {signature}",
                Paint::magenta(count),
                Paint::new(selector_hex(&signature)).dimmed()
            );
        }
        Ok(())
    }
}

/// Renders `prefix count` pairs, [`SHARDS_PER_LINE`] per line
fn shard_lines(shards: &[(String, usize)]) -> Vec<String> {
    shards
        .chunks(SHARDS_PER_LINE)
        .map(|chunk| {
            chunk
                .iter()
                .map(|(prefix, count)| format!("{prefix} {}", Paint::magenta(count)))
                .collect::<Vec<_>>()
                .join(&Paint::new(" | ").dimmed().to_string())
        })
        .collect()
}
