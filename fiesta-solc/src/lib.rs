#![doc = include_str!("../README.md")]

pub mod abi;
pub mod artifacts;
pub use artifacts::{CompilerInput, CompilerOutput};

pub mod balance;
pub use balance::{partition, Queue};

pub mod cache;
pub use cache::{ensure_compiled, Compiled, CompiledOutput, Strategy};

mod config;
pub use config::{DatasetConfig, DatasetConfigBuilder, DEFAULT_JOBS};

pub mod dataset;
pub use dataset::{ContractArtifact, Inventory};

pub mod engine;
pub use engine::{BinDirLoader, CompilerEngine, EngineCache, EngineLoader, Solc};

pub mod error;
pub mod install;

pub mod pool;
pub use pool::{OutputSink, WorkerPool};

pub mod report;
pub use report::{Outcome, ProgressEvent, Reporter, RunSummary};

mod version;
pub use version::SolcVersion;

use error::Result;
use std::{fmt, sync::Arc};

/// A compile run over a dataset
///
/// # Example
///
/// ```no_run
/// use fiesta_solc::{DatasetConfig, Project};
/// # async fn demo() -> fiesta_solc::error::Result<()> {
/// let project = Project::builder().config(DatasetConfig::new("organized_contracts")).build();
/// let summary = project.compile(None, None).await?;
/// println!("{summary}");
/// # Ok(())
/// # }
/// ```
pub struct Project {
    pub config: DatasetConfig,
    pool: WorkerPool,
}

impl Project {
    pub fn builder() -> ProjectBuilder {
        ProjectBuilder::default()
    }

    /// Reads the inventory of the whole dataset
    pub fn inventory(&self) -> Result<Inventory> {
        Inventory::read(&self.config.root)
    }

    /// Splits the workloads of `inventory` across the configured number of workers
    pub fn plan(&self, inventory: &Inventory) -> Vec<Queue> {
        partition(inventory.workloads(), self.config.jobs)
    }

    /// Compiles every artifact matching the optional exact `version` and `hash_prefix`.
    ///
    /// Only an unreadable dataset root is an error, every other failure is part of the summary.
    /// Malformed artifacts are not part of any queue and are accounted as failures up front.
    pub async fn compile(
        &self,
        version: Option<&str>,
        hash_prefix: Option<&str>,
    ) -> Result<RunSummary> {
        let inventory = self.inventory()?.filtered(version, hash_prefix);
        // a malformed artifact has no known version, it only matches an unfiltered version
        let prefix = hash_prefix.map(str::to_lowercase);
        let malformed: Vec<_> = inventory
            .malformed()
            .iter()
            .map(|err| (malformed_hash(err), report::Failure::from(err)))
            .filter(|(hash, _)| {
                version.is_none() &&
                    prefix.as_deref().map_or(true, |p| hash.to_lowercase().starts_with(p))
            })
            .collect();

        let queues = self.plan(&inventory);
        tracing::debug!(
            "compiling {} artifacts on {} workers, makespan {}",
            inventory.len(),
            queues.len(),
            balance::makespan(&queues)
        );
        let mut summary = self.pool.run(queues, Arc::new(inventory)).await;
        summary.failed.extend(malformed);
        Ok(summary)
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project").field("config", &self.config).field("pool", &self.pool).finish()
    }
}

/// The name a skipped artifact is reported under: its hash directory, or the shard directory if
/// the whole shard could not be read
fn malformed_hash(err: &error::SolcError) -> String {
    let dir = match err {
        // a metadata file or a hash directory with an unusable name
        error::SolcError::MalformedMetadata { path, .. } => {
            if path.file_name().map_or(false, |name| name == dataset::METADATA_FILE) {
                path.parent()
            } else {
                Some(path.as_path())
            }
        }
        error::SolcError::Io(err) => Some(err.path()),
        _ => None,
    };
    dir.and_then(|dir| dir.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| err.to_string())
}

#[derive(Default)]
pub struct ProjectBuilder {
    config: Option<DatasetConfig>,
    loader: Option<Arc<dyn EngineLoader>>,
    sink: Option<Arc<dyn OutputSink>>,
    reporter: Option<Arc<dyn Reporter>>,
}

impl ProjectBuilder {
    #[must_use]
    pub fn config(mut self, config: DatasetConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the engine loader, defaults to a [`BinDirLoader`] over the configured `bin_dir`
    #[must_use]
    pub fn loader(mut self, loader: Arc<dyn EngineLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn build(self) -> Project {
        let Self { config, loader, sink, reporter } = self;
        let config = config.unwrap_or_else(|| DatasetConfig::builder().build());
        let loader = loader.unwrap_or_else(|| Arc::new(BinDirLoader::new(&config.bin_dir)));

        let mut pool = WorkerPool::builder();
        if let Some(sink) = sink {
            pool = pool.sink(sink);
        }
        if let Some(reporter) = reporter {
            pool = pool.reporter(reporter);
        }
        Project { config, pool: pool.build(loader) }
    }
}
