//! Progress events of a compile run and their aggregation

use crate::{cache::Strategy, dataset::short_hash, error::SolcError};
use std::{
    collections::BTreeMap,
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
};
use yansi::Paint;

/// The outcome of processing one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The artifact was compiled in this run
    Compiled { tag: Strategy },
    /// A valid cache record existed, nothing was compiled
    Cached { tag: Strategy },
    Failed(Failure),
}

/// The categories of per artifact failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FailureKind {
    MalformedMetadata,
    MissingCompilerBinary,
    AllStrategiesFailed,
    VersionMismatch,
    PersistenceWrite,
    Io,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::MalformedMetadata => "malformed metadata",
            FailureKind::MissingCompilerBinary => "missing compiler binary",
            FailureKind::AllStrategiesFailed => "all strategies failed",
            FailureKind::VersionMismatch => "version mismatch",
            FailureKind::PersistenceWrite => "persistence write",
            FailureKind::Io => "io",
        };
        f.write_str(s)
    }
}

/// A failed artifact: the category and the rendered error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

impl From<&SolcError> for Failure {
    fn from(err: &SolcError) -> Self {
        let kind = match err {
            SolcError::MalformedMetadata { .. } => FailureKind::MalformedMetadata,
            SolcError::MissingCompilerBinary(_) => FailureKind::MissingCompilerBinary,
            SolcError::CompileStrategyFailed { .. } | SolcError::AllStrategiesFailed { .. } => {
                FailureKind::AllStrategiesFailed
            }
            SolcError::VersionMismatch { .. } => FailureKind::VersionMismatch,
            _ => FailureKind::Io,
        };
        Failure::new(kind, err.to_string())
    }
}

impl From<SolcError> for Failure {
    fn from(err: SolcError) -> Self {
        Failure::from(&err)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Emitted by a worker for every artifact it processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Index of the worker, equal to the index of its queue
    pub worker: usize,
    pub version: String,
    pub hash: String,
    pub outcome: Outcome,
}

/// Trait representing the callbacks invoked while a run progresses.
///
/// A `Reporter` is entirely passive and only listens to incoming events. Events of a single worker
/// arrive in the order that worker processed its artifacts, there is no order across workers.
pub trait Reporter: Send + Sync + 'static {
    /// Invoked for every processed artifact
    fn on_event(&self, _event: &ProgressEvent) {}

    /// Invoked once after every worker finished
    fn on_finish(&self, _summary: &RunSummary) {}
}

/// A no-op [`Reporter`] that does nothing.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoReporter(());

impl Reporter for NoReporter {}

/// A [`Reporter`] that prints a running tally of done, skipped and failed artifacts to `stdout`
#[derive(Debug, Default)]
pub struct TallyReporter {
    done: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

impl TallyReporter {
    /// `(done, skipped, failed)` so far
    pub fn tally(&self) -> (usize, usize, usize) {
        (
            self.done.load(Ordering::Relaxed),
            self.skipped.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
        )
    }
}

impl Reporter for TallyReporter {
    fn on_event(&self, event: &ProgressEvent) {
        let status = match &event.outcome {
            Outcome::Compiled { tag } => {
                self.done.fetch_add(1, Ordering::Relaxed);
                Paint::green(format!("compiled `{tag}`"))
            }
            Outcome::Cached { tag } => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
                Paint::cyan(format!("cached `{tag}`"))
            }
            Outcome::Failed(failure) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                Paint::red(failure.kind.to_string())
            }
        };
        let (done, skipped, failed) = self.tally();
        println!(
            "[{}] {} {} {status} ({} done, {} skipped, {} failed)",
            event.worker,
            crate::version::SolcVersion::new(&event.version).short(),
            short_hash(&event.hash),
            Paint::green(done),
            Paint::cyan(skipped),
            Paint::red(failed),
        );
    }

    fn on_finish(&self, summary: &RunSummary) {
        println!("{summary}");
    }
}

/// The aggregated outcomes of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub compiled: usize,
    pub cached: usize,
    /// Every failed artifact, in the order the events arrived
    pub failed: Vec<(String, Failure)>,
    /// Number of compiled or cached artifacts per winning strategy
    pub by_tag: BTreeMap<Strategy, usize>,
    /// Workers that terminated abnormally, their remaining artifacts are not accounted for
    pub aborted_workers: usize,
}

impl RunSummary {
    /// Accounts for a single event
    pub fn record(&mut self, event: &ProgressEvent) {
        match &event.outcome {
            Outcome::Compiled { tag } => {
                self.compiled += 1;
                *self.by_tag.entry(*tag).or_default() += 1;
            }
            Outcome::Cached { tag } => {
                self.cached += 1;
                *self.by_tag.entry(*tag).or_default() += 1;
            }
            Outcome::Failed(failure) => self.failed.push((event.hash.clone(), failure.clone())),
        }
    }

    /// Number of processed artifacts
    pub fn total(&self) -> usize {
        self.compiled + self.cached + self.failed.len()
    }

    /// Number of failures per kind
    pub fn failures_by_kind(&self) -> BTreeMap<FailureKind, usize> {
        let mut kinds = BTreeMap::new();
        for (_, failure) in &self.failed {
            *kinds.entry(failure.kind).or_default() += 1;
        }
        kinds
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty() || self.aborted_workers > 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} artifacts: {} compiled, {} cached, {} failed",
            self.total(),
            Paint::green(self.compiled),
            Paint::cyan(self.cached),
            Paint::red(self.failed.len())
        )?;
        for (tag, count) in &self.by_tag {
            writeln!(f, "  `{tag}`: {count}")?;
        }
        for (kind, count) in self.failures_by_kind() {
            writeln!(f, "  {}: {count}", Paint::red(kind))?;
        }
        if self.aborted_workers > 0 {
            writeln!(f, "  {} worker(s) aborted", Paint::red(self.aborted_workers))?;
        }
        Ok(())
    }
}
