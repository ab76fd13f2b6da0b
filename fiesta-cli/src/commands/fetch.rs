//! `fetch-binaries` subcommand

use super::Cmd;
use crate::config::FiestaConfig;
use clap::Parser;
use fiesta_solc::{
    install::{install, HttpBinarySource, Installed},
    Inventory, SolcVersion,
};
use std::io::Write;
use yansi::Paint;

/// `fetch-binaries` subcommand
#[derive(Debug, Clone, Parser)]
pub struct FetchCmd {
    /// Only fetch this version
    #[arg(long = "version", value_name = "VERSION")]
    pub solc_version: Option<String>,
}

impl Cmd for FetchCmd {
    fn run(self, config: FiestaConfig) -> eyre::Result<()> {
        println!("Collecting solc version info...");
        let inventory =
            Inventory::read(&config.dataset)?.filtered(self.solc_version.as_deref(), None);
        if !inventory.malformed().is_empty() {
            println!("{} artifacts with malformed metadata", Paint::red(inventory.malformed().len()));
        }
        let mut versions = inventory.workloads();
        versions.sort_by_cached_key(|(version, _)| SolcVersion::new(version));
        println!("Total solc versions: {}", Paint::blue(versions.len()));

        let source = HttpBinarySource::new(&config.binaries_url, &config.platform);
        let (mut fetched, mut failed) = (0, 0);
        for (version, count) in versions {
            print!(
                "Fetching solc {} (used by {})... ",
                Paint::cyan(&version),
                Paint::magenta(format!("{count} contracts"))
            );
            let _ = std::io::stdout().flush();
            match install(&source, &config.bin_dir, &version) {
                Ok(Installed::Fetched(_)) => {
                    fetched += 1;
                    println!("{} {}", Paint::yellow("fetch"), Paint::green("✓"));
                }
                Ok(Installed::Cached(_)) => {
                    println!("{} {}", Paint::yellow("cached"), Paint::green("✓"));
                }
                Err(err) => {
                    failed += 1;
                    println!("{}", Paint::red(format!("{err} ⨯")));
                }
            }
        }
        println!("{fetched} fetched, {failed} failed");
        Ok(())
    }
}
