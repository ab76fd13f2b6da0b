//! End to end runs over on-disk datasets with in-process engines

use fiesta_solc::{
    cache::OUTPUT_FILE,
    error::{Result, SolcError},
    report::{FailureKind, TallyReporter},
    CompilerEngine, DatasetConfig, EngineLoader, Outcome, ProgressEvent, Project, Reporter,
    Strategy,
};
use pretty_assertions::assert_eq;
use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

const OUTPUT: &str = r#"{"contracts":{"main.sol":{"Token":{"abi":[
    {"type":"function","name":"transfer","inputs":[{"name":"to","type":"address"},{"name":"v","type":"uint256"}]}
]}}}}"#;

/// Fails every input containing `broken`, answers everything else with [`OUTPUT`]
struct MockEngine {
    version: String,
    invocations: Arc<AtomicUsize>,
}

impl CompilerEngine for MockEngine {
    fn version(&self) -> &str {
        &self.version
    }

    fn compile(&self, input: &str) -> Result<String> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if input.contains("broken") {
            return Err(SolcError::SolcError("segmentation fault".to_string()))
        }
        Ok(OUTPUT.to_string())
    }
}

#[derive(Default)]
struct MockLoader {
    invocations: Arc<AtomicUsize>,
    loads: Mutex<HashMap<String, usize>>,
}

impl MockLoader {
    fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

impl EngineLoader for MockLoader {
    fn load(&self, version: &str) -> Result<Box<dyn CompilerEngine>> {
        *self.loads.lock().unwrap().entry(version.to_string()).or_default() += 1;
        if version.contains("missing") {
            return Err(SolcError::MissingCompilerBinary(version.to_string()))
        }
        Ok(Box::new(MockEngine {
            version: version.to_string(),
            invocations: Arc::clone(&self.invocations),
        }))
    }
}

/// Keeps every event in arrival order
#[derive(Default)]
struct EventLog(Mutex<Vec<ProgressEvent>>);

impl Reporter for EventLog {
    fn on_event(&self, event: &ProgressEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

struct Dataset {
    _tmp: tempfile::TempDir,
    root: PathBuf,
}

impl Dataset {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("organized_contracts");
        fs::create_dir_all(&root).unwrap();
        Self { _tmp: tmp, root }
    }

    fn dir(&self, hash: &str) -> PathBuf {
        self.root.join(&hash[..2]).join(hash)
    }

    fn add(&self, hash: &str, version: &str, source: &str) -> &Self {
        let dir = self.dir(hash);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("metadata.json"),
            format!(r#"{{"ContractName":"Token","CompilerVersion":"{version}"}}"#),
        )
        .unwrap();
        fs::write(dir.join("main.sol"), source).unwrap();
        self
    }

    fn record(&self, hash: &str) -> Option<String> {
        fs::read_to_string(self.dir(hash).join(OUTPUT_FILE)).ok()
    }

    fn project(&self, loader: Arc<MockLoader>, jobs: usize) -> Project {
        Project::builder()
            .config(DatasetConfig::builder().root(&self.root).jobs(jobs).build())
            .loader(loader)
            .build()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn second_run_is_a_no_op() {
    let dataset = Dataset::new();
    dataset
        .add("aa01", "v0.8.7", "contract Token {}")
        .add("aa02", "v0.8.7", "contract Token {}")
        .add("bb01", "v0.4.24", "contract Token {}");
    let loader = Arc::new(MockLoader::default());
    let project = dataset.project(Arc::clone(&loader), 2);

    let first = project.compile(None, None).await.unwrap();
    assert_eq!(first.compiled, 3);
    assert_eq!(first.by_tag, BTreeMap::from([(Strategy::Sol, 3)]));
    assert_eq!(loader.invocations(), 3);
    let records: Vec<_> = ["aa01", "aa02", "bb01"].map(|h| dataset.record(h).unwrap()).into();
    assert!(records.iter().all(|r| r.starts_with("//sol\n")));

    let second = project.compile(None, None).await.unwrap();
    assert_eq!(second.compiled, 0);
    assert_eq!(second.cached, 3);
    assert_eq!(loader.invocations(), 3);
    let again: Vec<_> = ["aa01", "aa02", "bb01"].map(|h| dataset.record(h).unwrap()).into();
    assert_eq!(records, again);
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_artifact_does_not_stop_its_queue() {
    let dataset = Dataset::new();
    dataset
        .add("aa01", "v0.8.7", "contract Token {}")
        .add("aa02", "v0.8.7", "contract broken {")
        .add("aa03", "v0.8.7", "contract Token {}");
    let loader = Arc::new(MockLoader::default());
    let log = Arc::new(EventLog::default());
    let project = Project::builder()
        .config(DatasetConfig::builder().root(&dataset.root).jobs(1).build())
        .loader(loader.clone())
        .reporter(log.clone())
        .build();

    let summary = project.compile(None, None).await.unwrap();
    assert_eq!(summary.compiled, 2);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, "aa02");
    assert_eq!(summary.failed[0].1.kind, FailureKind::AllStrategiesFailed);
    assert!(dataset.record("aa02").is_none());

    // a single worker reports in inventory order
    let hashes: Vec<_> = log.0.lock().unwrap().iter().map(|e| e.hash.clone()).collect();
    assert_eq!(hashes, vec!["aa01", "aa02", "aa03"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_binary_fails_each_artifact_of_the_version() {
    let dataset = Dataset::new();
    dataset
        .add("aa01", "v0.5.0-missing", "contract Token {}")
        .add("bb01", "v0.5.0-missing", "contract Token {}")
        .add("cc01", "v0.8.7", "contract Token {}");
    let loader = Arc::new(MockLoader::default());
    let project = dataset.project(Arc::clone(&loader), 1);

    let summary = project.compile(None, None).await.unwrap();
    assert_eq!(summary.compiled, 1);
    assert_eq!(
        summary.failures_by_kind(),
        BTreeMap::from([(FailureKind::MissingCompilerBinary, 2)])
    );
    // loaded once per worker, remembered afterwards
    assert_eq!(loader.loads.lock().unwrap()["v0.5.0-missing"], 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn unrecognized_record_is_recompiled() {
    let dataset = Dataset::new();
    dataset.add("aa01", "v0.8.7", "contract Token {}");
    fs::write(dataset.dir("aa01").join(OUTPUT_FILE), format!("//vyper\n{OUTPUT}")).unwrap();
    let loader = Arc::new(MockLoader::default());

    let summary = dataset.project(Arc::clone(&loader), 4).compile(None, None).await.unwrap();
    assert_eq!(summary.compiled, 1);
    assert_eq!(loader.invocations(), 1);
    assert_eq!(dataset.record("aa01").unwrap(), format!("//sol\n{OUTPUT}"));
}

#[tokio::test(flavor = "multi_thread")]
async fn filters_by_version_and_prefix() {
    let dataset = Dataset::new();
    dataset
        .add("aa01", "v0.8.7", "contract Token {}")
        .add("ab01", "v0.8.7", "contract Token {}")
        .add("aa02", "v0.6.12", "contract Token {}");
    fs::create_dir_all(dataset.dir("ff01")).unwrap();
    let loader = Arc::new(MockLoader::default());
    let project = dataset.project(Arc::clone(&loader), 2);

    let summary = project.compile(Some("v0.8.7"), Some("aa")).await.unwrap();
    assert_eq!((summary.compiled, summary.failed.len()), (1, 0));

    let summary = project.compile(None, Some("ff")).await.unwrap();
    assert_eq!(summary.compiled, 0);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, "ff01");
    assert_eq!(summary.failed[0].1.kind, FailureKind::MalformedMetadata);
}

#[tokio::test]
async fn unreadable_root_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let project = Project::builder()
        .config(DatasetConfig::new(tmp.path().join("nope")))
        .loader(Arc::new(MockLoader::default()))
        .reporter(Arc::new(TallyReporter::default()))
        .build();
    let err = project.compile(None, None).await.unwrap_err();
    assert!(matches!(err, SolcError::DatasetIo { .. }));
}

#[test]
fn events_carry_their_outcome() {
    let event = ProgressEvent {
        worker: 3,
        version: "v0.8.7".to_string(),
        hash: "aa01".to_string(),
        outcome: Outcome::Cached { tag: Strategy::Json },
    };
    let log = EventLog::default();
    log.on_event(&event);
    assert_eq!(log.0.lock().unwrap()[0], event);
}
