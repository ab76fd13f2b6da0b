//! Per artifact compile cache
//!
//! A compiled artifact has an `output.jsonc` next to its sources. The first line of that file is a
//! `//<tag>` comment naming the [`Strategy`] that produced the output, the rest is the compiler
//! output exactly as the engine returned it. An artifact whose record has a recognized tag and a
//! non-empty `contracts` section is done and is never compiled again.

use crate::{
    artifacts::{CompilerInput, CompilerOutput},
    dataset::{ContractArtifact, SOURCE_FILE},
    engine::CompilerEngine,
    error::{Result, SolcError},
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    str::FromStr,
};

/// The file name of the cache record
pub const OUTPUT_FILE: &str = "output.jsonc";

/// Matches the tag line of a cache record: `//sol` or `//json`
static RE_OUTPUT_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^//(?P<tag>sol|json)\r?\n").expect("valid regex"));

/// The ways a compiler invocation can be assembled for an artifact, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Strategy {
    /// Single file input built from `main.sol`, selecting only the ABI
    Sol,
    /// The ready made standard json input stored in `contract.json`
    Json,
}

impl Strategy {
    /// All strategies in the order they are tried
    pub const ALL: [Strategy; 2] = [Strategy::Sol, Strategy::Json];

    pub fn tag(&self) -> &'static str {
        match self {
            Strategy::Sol => "sol",
            Strategy::Json => "json",
        }
    }

    /// Builds the standard json input for `artifact`
    pub fn input(&self, artifact: &ContractArtifact) -> Result<String> {
        match self {
            Strategy::Sol => {
                let path = artifact.source_file();
                let content = read_to_string(&path)?;
                Ok(serde_json::to_string(&CompilerInput::single_file(SOURCE_FILE, content))?)
            }
            Strategy::Json => read_to_string(artifact.input_file()),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "sol" => Ok(Strategy::Sol),
            "json" => Ok(Strategy::Json),
            s => Err(format!("unknown compile strategy `{s}`")),
        }
    }
}

/// A persisted compile result: the winning strategy and the raw compiler output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledOutput {
    pub tag: Strategy,
    pub raw: String,
}

impl CompiledOutput {
    pub fn new(tag: Strategy, raw: impl Into<String>) -> Self {
        Self { tag, raw: raw.into() }
    }

    /// Location of the cache record of the artifact stored in `dir`
    pub fn path(dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join(OUTPUT_FILE)
    }

    /// Parses a cache record, `None` if the tag line is missing or not recognized
    pub fn parse(content: &str) -> Option<Self> {
        let caps = RE_OUTPUT_TAG.captures(content)?;
        let tag = caps.name("tag")?.as_str().parse().ok()?;
        let header = caps.get(0)?.end();
        Some(Self { tag, raw: content[header..].to_string() })
    }

    /// Reads the cache record of the artifact in `dir`.
    ///
    /// Returns `None` if there is no record, it is not valid utf-8 or its tag is not recognized.
    #[tracing::instrument(skip_all, name = "compiled-output::read")]
    pub fn read(dir: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = Self::path(dir);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(SolcError::io(err, path)),
        };
        let Ok(content) = String::from_utf8(bytes) else {
            tracing::trace!("undecodable cache record at \"{}\"", path.display());
            return Ok(None)
        };
        let record = Self::parse(&content);
        if record.is_none() {
            tracing::trace!("unrecognized cache record at \"{}\"", path.display());
        }
        Ok(record)
    }

    /// Writes the record next to the artifact.
    ///
    /// The record is written to a temporary file first and then renamed, so an interrupted write
    /// never leaves a partial record behind.
    pub fn write(&self, dir: impl AsRef<Path>) -> Result<()> {
        let path = Self::path(dir);
        let tmp = path.with_extension("jsonc.tmp");
        let content = format!("//{}\n{}", self.tag, self.raw);
        fs::write(&tmp, content).map_err(|err| SolcError::io(err, &tmp))?;
        fs::rename(&tmp, &path).map_err(|err| SolcError::io(err, &path))?;
        tracing::trace!("wrote cache record \"{}\"", path.display());
        Ok(())
    }

    /// The parsed compiler output
    pub fn output(&self) -> Result<CompilerOutput> {
        Ok(serde_json::from_str(&self.raw)?)
    }

    /// Whether this record marks the artifact as done: a well formed output with contracts
    pub fn is_done(&self) -> bool {
        self.output().map(|output| !output.is_empty()).unwrap_or_default()
    }
}

/// A single strategy tried for an artifact
#[derive(Debug)]
pub struct CompileAttempt {
    pub strategy: Strategy,
    pub result: Result<String>,
}

impl CompileAttempt {
    /// Builds the input for `strategy` and invokes `engine` with it
    pub fn run(
        artifact: &ContractArtifact,
        engine: &dyn CompilerEngine,
        strategy: Strategy,
    ) -> Self {
        let result = strategy
            .input(artifact)
            .and_then(|input| engine.compile(&input))
            .map_err(|err| SolcError::CompileStrategyFailed {
                tag: strategy,
                reason: err.to_string(),
            });
        Self { strategy, result }
    }

    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Tries the strategies in [`Strategy::ALL`] order and stops after the first one that succeeds
pub fn compile_attempts(
    artifact: &ContractArtifact,
    engine: &dyn CompilerEngine,
) -> Vec<CompileAttempt> {
    let mut attempts = Vec::with_capacity(Strategy::ALL.len());
    for strategy in Strategy::ALL {
        let attempt = CompileAttempt::run(artifact, engine, strategy);
        let done = attempt.succeeded();
        if let Err(err) = &attempt.result {
            tracing::trace!("{}: {err}", artifact.hash);
        }
        attempts.push(attempt);
        if done {
            break
        }
    }
    attempts
}

/// How [`ensure_compiled`] produced its output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compiled {
    /// A valid record already existed, the engine was not invoked
    Cached(CompiledOutput),
    /// The artifact was compiled and the record written
    Fresh(CompiledOutput),
}

impl Compiled {
    pub fn output(&self) -> &CompiledOutput {
        match self {
            Compiled::Cached(out) | Compiled::Fresh(out) => out,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Compiled::Cached(_))
    }
}

/// Compiles `artifact` with `engine` unless a valid record already exists.
///
/// The strategies are tried in [`Strategy::ALL`] order, the first one whose invocation succeeds
/// is persisted. If all of them fail no record is written, so a later run retries the artifact.
///
/// Fails with [`SolcError::VersionMismatch`] if `engine` was loaded for a different version than
/// the one the artifact is pinned to.
pub fn ensure_compiled(artifact: &ContractArtifact, engine: &dyn CompilerEngine) -> Result<Compiled> {
    if artifact.version != engine.version() {
        return Err(SolcError::VersionMismatch {
            hash: artifact.hash.clone(),
            expected: artifact.version.clone(),
            loaded: engine.version().to_string(),
        })
    }

    if let Some(record) = CompiledOutput::read(&artifact.dir)? {
        if record.is_done() {
            tracing::trace!("{} already compiled with `{}`", artifact.hash, record.tag);
            return Ok(Compiled::Cached(record))
        }
    }

    let mut attempts = compile_attempts(artifact, engine);
    // only the last attempt can be a success
    match attempts.pop() {
        Some(CompileAttempt { strategy, result: Ok(raw) }) => {
            let record = CompiledOutput::new(strategy, raw);
            record.write(&artifact.dir)?;
            tracing::debug!("compiled {} with `{strategy}`", artifact.hash);
            return Ok(Compiled::Fresh(record))
        }
        Some(failed) => attempts.push(failed),
        None => {}
    }

    let reasons = attempts
        .iter()
        .filter_map(|attempt| attempt.result.as_ref().err())
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    Err(SolcError::AllStrategiesFailed { hash: artifact.hash.clone(), reasons })
}

fn read_to_string(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path).map_err(|err| SolcError::io(err, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::INPUT_FILE;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const OUTPUT: &str = r#"{"contracts":{"main.sol":{"Token":{"abi":[{"type":"function","name":"totalSupply","inputs":[]}]}}}}"#;

    /// Answers every input with `reply`, `None` fails the invocation
    struct MockEngine {
        version: String,
        reply: Box<dyn Fn(&str) -> Option<String> + Send>,
        calls: AtomicUsize,
    }

    impl MockEngine {
        fn new(version: &str, reply: impl Fn(&str) -> Option<String> + Send + 'static) -> Self {
            Self { version: version.to_string(), reply: Box::new(reply), calls: AtomicUsize::new(0) }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl CompilerEngine for MockEngine {
        fn version(&self) -> &str {
            &self.version
        }

        fn compile(&self, input: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.reply)(input).ok_or_else(|| SolcError::solc("engine crashed"))
        }
    }

    fn artifact(dir: &Path, source: Option<&str>, input: Option<&str>) -> ContractArtifact {
        if let Some(source) = source {
            fs::write(dir.join(SOURCE_FILE), source).unwrap();
        }
        if let Some(input) = input {
            fs::write(dir.join(INPUT_FILE), input).unwrap();
        }
        ContractArtifact {
            hash: "aa01".to_string(),
            name: "Token".to_string(),
            version: "v0.8.7".to_string(),
            dir: dir.to_path_buf(),
        }
    }

    #[test]
    fn compiles_once_and_then_reuses_record() {
        let tmp = tempfile::tempdir().unwrap();
        let artifact = artifact(tmp.path(), Some("contract Token {}"), None);
        let engine = MockEngine::new("v0.8.7", |input| {
            assert!(input.contains(r#""outputSelection":{"*":{"*":["abi"]}}"#));
            Some(OUTPUT.to_string())
        });

        let first = ensure_compiled(&artifact, &engine).unwrap();
        assert_eq!(first, Compiled::Fresh(CompiledOutput::new(Strategy::Sol, OUTPUT)));
        assert_eq!(engine.calls(), 1);
        let written = fs::read(CompiledOutput::path(tmp.path())).unwrap();

        let second = ensure_compiled(&artifact, &engine).unwrap();
        assert!(second.is_cached());
        assert_eq!(second.output(), first.output());
        assert_eq!(engine.calls(), 1);
        assert_eq!(fs::read(CompiledOutput::path(tmp.path())).unwrap(), written);
    }

    #[test]
    fn falls_back_to_precompiled_input() {
        let tmp = tempfile::tempdir().unwrap();
        let artifact = artifact(tmp.path(), Some("contract Token {"), Some(r#"{"language":"Solidity"}"#));
        let engine = MockEngine::new("v0.8.7", |input| {
            input.starts_with(r#"{"language":"Solidity"}"#).then(|| OUTPUT.to_string())
        });

        let compiled = ensure_compiled(&artifact, &engine).unwrap();
        assert_eq!(compiled.output().tag, Strategy::Json);
        assert_eq!(engine.calls(), 2);
        assert_eq!(
            fs::read_to_string(CompiledOutput::path(tmp.path())).unwrap(),
            format!("//json\n{OUTPUT}")
        );
    }

    #[test]
    fn attempts_stop_at_first_success() {
        let tmp = tempfile::tempdir().unwrap();
        let artifact = artifact(tmp.path(), Some("contract Token {"), Some("{}"));
        let engine = MockEngine::new("v0.8.7", |input| (input == "{}").then(|| OUTPUT.to_string()));

        let attempts = compile_attempts(&artifact, &engine);
        let outcomes: Vec<_> = attempts.iter().map(|a| (a.strategy, a.succeeded())).collect();
        assert_eq!(outcomes, vec![(Strategy::Sol, false), (Strategy::Json, true)]);
        assert_eq!(attempts[1].result.as_deref().unwrap(), OUTPUT);
        assert!(matches!(
            attempts[0].result,
            Err(SolcError::CompileStrategyFailed { tag: Strategy::Sol, .. })
        ));

        let engine = MockEngine::new("v0.8.7", |_| Some(OUTPUT.to_string()));
        let attempts = compile_attempts(&artifact, &engine);
        assert_eq!(attempts.len(), 1);
        assert!(attempts[0].succeeded());
    }

    #[test]
    fn missing_source_skips_to_next_strategy() {
        let tmp = tempfile::tempdir().unwrap();
        let artifact = artifact(tmp.path(), None, Some("{}"));
        let engine = MockEngine::new("v0.8.7", |_| Some(OUTPUT.to_string()));

        let compiled = ensure_compiled(&artifact, &engine).unwrap();
        assert_eq!(compiled.output().tag, Strategy::Json);
        assert_eq!(engine.calls(), 1);
    }

    #[test]
    fn all_strategies_failing_leaves_no_record() {
        let tmp = tempfile::tempdir().unwrap();
        let artifact = artifact(tmp.path(), Some("contract A {}"), Some("{}"));
        let engine = MockEngine::new("v0.8.7", |_| None);

        let err = ensure_compiled(&artifact, &engine).unwrap_err();
        assert!(matches!(err, SolcError::AllStrategiesFailed { ref hash, .. } if hash == "aa01"));
        assert_eq!(engine.calls(), 2);
        assert!(!CompiledOutput::path(tmp.path()).exists());
    }

    #[test]
    fn compiler_errors_count_as_invocation_success() {
        let tmp = tempfile::tempdir().unwrap();
        let artifact = artifact(tmp.path(), Some("contract A {"), Some("{}"));
        let errors = r#"{"errors":[{"severity":"error","type":"ParserError","message":"expected }"}]}"#;
        let engine = MockEngine::new("v0.8.7", move |_| Some(errors.to_string()));

        let compiled = ensure_compiled(&artifact, &engine).unwrap();
        assert_eq!(compiled, Compiled::Fresh(CompiledOutput::new(Strategy::Sol, errors)));
        assert_eq!(engine.calls(), 1);
        // without contracts the record does not count as done
        assert!(!compiled.output().is_done());
        assert!(!ensure_compiled(&artifact, &engine).unwrap().is_cached());
        assert_eq!(engine.calls(), 2);
    }

    #[test]
    fn unrecognized_tag_triggers_recompilation() {
        let tmp = tempfile::tempdir().unwrap();
        let artifact = artifact(tmp.path(), Some("contract Token {}"), None);
        let engine = MockEngine::new("v0.8.7", |_| Some(OUTPUT.to_string()));

        for stale in [format!("//vy\n{OUTPUT}"), OUTPUT.to_string(), String::new()] {
            fs::write(CompiledOutput::path(tmp.path()), stale).unwrap();
            assert!(CompiledOutput::read(tmp.path()).unwrap().is_none());
            assert!(!ensure_compiled(&artifact, &engine).unwrap().is_cached());
        }
        assert_eq!(engine.calls(), 3);
    }

    #[test]
    fn undecodable_record_triggers_recompilation() {
        let tmp = tempfile::tempdir().unwrap();
        let artifact = artifact(tmp.path(), Some("contract Token {}"), None);
        let engine = MockEngine::new("v0.8.7", |_| Some(OUTPUT.to_string()));

        fs::write(CompiledOutput::path(tmp.path()), b"//sol\n{\"contracts\":\xff\xfe").unwrap();
        assert!(CompiledOutput::read(tmp.path()).unwrap().is_none());

        let compiled = ensure_compiled(&artifact, &engine).unwrap();
        assert_eq!(compiled, Compiled::Fresh(CompiledOutput::new(Strategy::Sol, OUTPUT)));
        assert_eq!(engine.calls(), 1);
        assert_eq!(
            fs::read_to_string(CompiledOutput::path(tmp.path())).unwrap(),
            format!("//sol\n{OUTPUT}")
        );
    }

    #[test]
    fn rejects_foreign_versions() {
        let tmp = tempfile::tempdir().unwrap();
        let artifact = artifact(tmp.path(), Some("contract Token {}"), None);
        let engine = MockEngine::new("v0.4.24", |_| Some(OUTPUT.to_string()));

        let err = ensure_compiled(&artifact, &engine).unwrap_err();
        assert!(matches!(err, SolcError::VersionMismatch { .. }));
        assert_eq!(engine.calls(), 0);
    }

    #[test]
    fn parses_records() {
        let record = CompiledOutput::parse("//sol\r\n{}").unwrap();
        assert_eq!(record, CompiledOutput::new(Strategy::Sol, "{}"));
        assert!(CompiledOutput::parse("// sol\n{}").is_none());
        assert_eq!("json".parse::<Strategy>().unwrap(), Strategy::Json);
        assert!("vy".parse::<Strategy>().is_err());
    }
}
