//! `compile` subcommand

use super::Cmd;
use crate::config::FiestaConfig;
use clap::Parser;
use eyre::WrapErr;
use fiesta_solc::{report::TallyReporter, Project};
use fiesta_store::SignatureStore;
use std::sync::Arc;

/// `compile` subcommand
#[derive(Debug, Clone, Parser)]
pub struct CompileCmd {
    /// Only compile artifacts pinned to exactly this version
    #[arg(long = "version", value_name = "VERSION")]
    pub solc_version: Option<String>,

    /// Only compile artifacts whose hash starts with this prefix
    #[arg(long)]
    pub prefix: Option<String>,

    /// Number of workers, overrides the config file
    #[arg(short, long, env = "FIESTA_JOBS")]
    pub jobs: Option<usize>,
}

impl Cmd for CompileCmd {
    fn run(self, mut config: FiestaConfig) -> eyre::Result<()> {
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        if config.jobs == 0 {
            tracing::warn!("no workers configured, nothing will be compiled");
        }
        let store = SignatureStore::open(&config.database).wrap_err_with(|| {
            format!("failed to open database \"{}\"", config.database.display())
        })?;
        let project = Project::builder()
            .config(config.dataset_config())
            .sink(Arc::new(store))
            .reporter(Arc::new(TallyReporter::default()))
            .build();

        let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
        let summary =
            rt.block_on(project.compile(self.solc_version.as_deref(), self.prefix.as_deref()))?;
        if summary.has_failures() {
            tracing::warn!("{} artifacts failed", summary.failed.len());
        }
        Ok(())
    }
}
