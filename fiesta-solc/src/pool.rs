//! Concurrent compilation of partitioned queues
//!
//! Every [`Queue`] is drained by its own worker on tokio's blocking thread pool. A worker owns its
//! [`EngineCache`], processes its versions in queue order and the artifacts of a version in
//! inventory order, one at a time. Outcomes are streamed to the coordinating task as
//! [`ProgressEvent`]s and folded into a [`RunSummary`].

use crate::{
    artifacts::CompilerOutput,
    balance::Queue,
    cache::{ensure_compiled, Compiled, Strategy},
    dataset::{ContractArtifact, Inventory},
    engine::{EngineCache, EngineLoader},
    report::{Failure, FailureKind, NoReporter, Outcome, ProgressEvent, Reporter, RunSummary},
};
use std::{error::Error, fmt, sync::Arc};
use tokio::sync::mpsc::{self, UnboundedSender};

/// Receives the output of every freshly compiled artifact
pub trait OutputSink: Send + Sync {
    fn write(
        &self,
        artifact: &ContractArtifact,
        tag: Strategy,
        output: &CompilerOutput,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Runs one worker per queue, see [module level docs](self)
pub struct WorkerPool {
    loader: Arc<dyn EngineLoader>,
    sink: Option<Arc<dyn OutputSink>>,
    reporter: Arc<dyn Reporter>,
}

impl WorkerPool {
    pub fn new(loader: Arc<dyn EngineLoader>) -> Self {
        Self::builder().build(loader)
    }

    pub fn builder() -> WorkerPoolBuilder {
        WorkerPoolBuilder::default()
    }

    /// Drains all `queues` concurrently and returns once every worker is done.
    ///
    /// Failures are accounted per artifact and never stop a run. A worker that panics is counted
    /// in [`RunSummary::aborted_workers`], the events it sent before are kept.
    pub async fn run(&self, queues: Vec<Queue>, inventory: Arc<Inventory>) -> RunSummary {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut handles = Vec::with_capacity(queues.len());
        for (index, queue) in queues.into_iter().enumerate() {
            let worker = Worker {
                index,
                queue,
                inventory: Arc::clone(&inventory),
                loader: Arc::clone(&self.loader),
                sink: self.sink.clone(),
                events: tx.clone(),
            };
            handles.push(tokio::task::spawn_blocking(move || worker.drain()));
        }
        // the channel closes once the last worker drops its sender
        drop(tx);

        let mut summary = RunSummary::default();
        while let Some(event) = rx.recv().await {
            self.reporter.on_event(&event);
            summary.record(&event);
        }

        for (index, handle) in handles.into_iter().enumerate() {
            if let Err(err) = handle.await {
                tracing::error!("worker {index} aborted: {err}");
                summary.aborted_workers += 1;
            }
        }
        self.reporter.on_finish(&summary);
        summary
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool").field("sink", &self.sink.is_some()).finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct WorkerPoolBuilder {
    sink: Option<Arc<dyn OutputSink>>,
    reporter: Option<Arc<dyn Reporter>>,
}

impl WorkerPoolBuilder {
    /// Every fresh compile output is handed to `sink`
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

    pub fn build(self, loader: Arc<dyn EngineLoader>) -> WorkerPool {
        WorkerPool {
            loader,
            sink: self.sink,
            reporter: self.reporter.unwrap_or_else(|| Arc::new(NoReporter::default())),
        }
    }
}

struct Worker {
    index: usize,
    queue: Queue,
    inventory: Arc<Inventory>,
    loader: Arc<dyn EngineLoader>,
    sink: Option<Arc<dyn OutputSink>>,
    events: UnboundedSender<ProgressEvent>,
}

impl Worker {
    #[tracing::instrument(skip_all, name = "worker", fields(index = self.index))]
    fn drain(self) {
        tracing::debug!("draining {} versions, {} artifacts", self.queue.len(), self.queue.weight);
        let mut engines = EngineCache::new(Arc::clone(&self.loader));
        for version in &self.queue.versions {
            for artifact in self.inventory.get(version) {
                let outcome = self.process(&mut engines, version, artifact);
                let event = ProgressEvent {
                    worker: self.index,
                    version: version.clone(),
                    hash: artifact.hash.clone(),
                    outcome,
                };
                if self.events.send(event).is_err() {
                    tracing::warn!("coordinator is gone, stopping");
                    return
                }
            }
        }
    }

    fn process(
        &self,
        engines: &mut EngineCache,
        version: &str,
        artifact: &ContractArtifact,
    ) -> Outcome {
        let engine = match engines.get(version) {
            Ok(engine) => engine,
            Err(err) => return Outcome::Failed(err.into()),
        };
        match ensure_compiled(artifact, engine) {
            Ok(Compiled::Cached(record)) => Outcome::Cached { tag: record.tag },
            Ok(Compiled::Fresh(record)) => match self.persist(artifact, record.tag, &record.raw) {
                Ok(()) => Outcome::Compiled { tag: record.tag },
                Err(failure) => Outcome::Failed(failure),
            },
            Err(err) => {
                tracing::debug!("{}: {err}", artifact.hash);
                Outcome::Failed(err.into())
            }
        }
    }

    fn persist(&self, artifact: &ContractArtifact, tag: Strategy, raw: &str) -> Result<(), Failure> {
        let Some(sink) = &self.sink else { return Ok(()) };
        let persistence = |err: &dyn fmt::Display| {
            tracing::error!("failed to persist {}: {err}", artifact.hash);
            Failure::new(FailureKind::PersistenceWrite, err.to_string())
        };
        let output: CompilerOutput = serde_json::from_str(raw).map_err(|err| persistence(&err))?;
        sink.write(artifact, tag, &output).map_err(|err| persistence(&err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{engine::CompilerEngine, error::Result as SolcResult, error::SolcError};
    use pretty_assertions::assert_eq;
    use std::{path::Path, sync::Mutex};

    const OUTPUT: &str = r#"{"contracts":{"main.sol":{"C":{"abi":[]}}}}"#;

    struct Fixed(String);

    impl CompilerEngine for Fixed {
        fn version(&self) -> &str {
            &self.0
        }
        fn compile(&self, _: &str) -> SolcResult<String> {
            Ok(OUTPUT.to_string())
        }
    }

    struct Loader;

    impl EngineLoader for Loader {
        fn load(&self, version: &str) -> SolcResult<Box<dyn CompilerEngine>> {
            if version == "v0.0.0" {
                return Err(SolcError::MissingCompilerBinary(version.to_string()))
            }
            Ok(Box::new(Fixed(version.to_string())))
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl OutputSink for Recorder {
        fn write(
            &self,
            artifact: &ContractArtifact,
            _: Strategy,
            _: &CompilerOutput,
        ) -> std::result::Result<(), Box<dyn Error + Send + Sync>> {
            if artifact.hash == "ee01" {
                return Err("database is locked".into())
            }
            self.0.lock().unwrap().push(artifact.hash.clone());
            Ok(())
        }
    }

    fn inventory(root: &Path, artifacts: &[(&str, &str)]) -> Inventory {
        let mut inventory = Inventory::default();
        for (hash, version) in artifacts {
            let dir = root.join(hash);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("main.sol"), "contract C {}").unwrap();
            inventory.insert(ContractArtifact {
                hash: hash.to_string(),
                name: "C".to_string(),
                version: version.to_string(),
                dir,
            });
        }
        inventory
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn drains_all_queues() {
        let tmp = tempfile::tempdir().unwrap();
        let inventory = Arc::new(inventory(
            tmp.path(),
            &[("aa01", "v1"), ("aa02", "v1"), ("bb01", "v2"), ("cc01", "v0.0.0"), ("ee01", "v2")],
        ));
        let queues = crate::balance::partition(inventory.workloads(), 2);
        let sink = Arc::new(Recorder::default());
        let pool = WorkerPool::builder().sink(sink.clone()).build(Arc::new(Loader));

        let summary = pool.run(queues.clone(), Arc::clone(&inventory)).await;
        assert_eq!(summary.compiled, 3);
        assert_eq!(summary.cached, 0);
        assert_eq!(
            summary.failures_by_kind(),
            [(FailureKind::MissingCompilerBinary, 1), (FailureKind::PersistenceWrite, 1)]
                .into_iter()
                .collect()
        );
        assert_eq!(summary.aborted_workers, 0);
        let mut written = sink.0.lock().unwrap().clone();
        written.sort();
        assert_eq!(written, vec!["aa01", "aa02", "bb01"]);

        // records are written even when the sink fails, so the rerun only hits the cache
        let summary = pool.run(queues, inventory).await;
        assert_eq!(summary.compiled, 0);
        assert_eq!(summary.cached, 4);
        assert_eq!(summary.failed.len(), 1);
    }

    #[tokio::test]
    async fn no_queues_no_events() {
        let pool = WorkerPool::new(Arc::new(Loader));
        let summary = pool.run(Vec::new(), Arc::new(Inventory::default())).await;
        assert_eq!(summary, RunSummary::default());
    }
}
