//! Compiler engines and the per worker engine registry

use crate::error::{Result, SolcError};
use std::{
    collections::{hash_map::Entry, HashMap, HashSet},
    fmt,
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
    sync::Arc,
};

/// Something that turns a standard json input into a standard json output
///
/// Engines are used by a single worker at a time and are not required to be `Sync`.
pub trait CompilerEngine: Send {
    /// The version this engine was loaded for
    fn version(&self) -> &str;

    /// Compiles the standard json `input` and returns the raw standard json output.
    ///
    /// An `Err` means the invocation itself failed. Errors reported by the compiler inside a
    /// well formed output are part of the `Ok` value.
    fn compile(&self, input: &str) -> Result<String>;
}

/// Produces engines for versions
pub trait EngineLoader: Send + Sync {
    /// Fails with [`SolcError::MissingCompilerBinary`] if there is no engine for `version`
    fn load(&self, version: &str) -> Result<Box<dyn CompilerEngine>>;
}

/// The file name of the binary for `version`
pub fn binary_file_name(version: &str) -> String {
    format!("solc-{version}")
}

/// A native `solc` executable, invoked with `--standard-json`
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Solc {
    /// Path to the `solc` executable
    pub solc: PathBuf,
    /// The version this executable was installed as
    pub version: String,
}

impl Solc {
    pub fn new(path: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Solc { solc: path.into(), version: version.into() }
    }

    /// Run `solc --standard-json` and return its raw stdout
    pub fn compile_output(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.solc)
            .arg("--standard-json")
            .stdin(Stdio::piped())
            .stderr(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|err| SolcError::io(err, &self.solc))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input).map_err(|err| SolcError::io(err, &self.solc))?;
        }
        compile_output(child.wait_with_output().map_err(|err| SolcError::io(err, &self.solc))?)
    }
}

impl CompilerEngine for Solc {
    fn version(&self) -> &str {
        &self.version
    }

    fn compile(&self, input: &str) -> Result<String> {
        let output = self.compile_output(input.as_bytes())?;
        let output =
            String::from_utf8(output).map_err(|_| SolcError::solc("output is not valid utf-8"))?;
        // anything that is not a json object is a broken invocation, e.g. a usage message
        match serde_json::from_str::<serde_json::Value>(&output) {
            Ok(serde_json::Value::Object(_)) => Ok(output),
            _ => Err(SolcError::solc(format!(
                "unexpected output: {}",
                output.lines().next().unwrap_or_default()
            ))),
        }
    }
}

impl fmt::Display for Solc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.solc.display(), self.version)
    }
}

fn compile_output(output: Output) -> Result<Vec<u8>> {
    if output.status.success() {
        Ok(output.stdout)
    } else {
        Err(SolcError::solc(String::from_utf8_lossy(&output.stderr).to_string()))
    }
}

/// Loads native `solc` binaries from a directory, see [`binary_file_name`]
#[derive(Debug, Clone)]
pub struct BinDirLoader {
    bin_dir: PathBuf,
}

impl BinDirLoader {
    pub fn new(bin_dir: impl Into<PathBuf>) -> Self {
        Self { bin_dir: bin_dir.into() }
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }
}

impl EngineLoader for BinDirLoader {
    fn load(&self, version: &str) -> Result<Box<dyn CompilerEngine>> {
        let path = self.bin_dir.join(binary_file_name(version));
        if !path.is_file() {
            tracing::debug!("no binary at \"{}\"", path.display());
            return Err(SolcError::MissingCompilerBinary(version.to_string()))
        }
        Ok(Box::new(Solc::new(path, version)))
    }
}

/// Lazily loaded engines of a single worker, keyed by version
///
/// A version is loaded on first use and reused afterwards. A version that failed to load is
/// remembered and not attempted again.
pub struct EngineCache {
    loader: Arc<dyn EngineLoader>,
    engines: HashMap<String, Box<dyn CompilerEngine>>,
    failed: HashSet<String>,
}

impl EngineCache {
    pub fn new(loader: Arc<dyn EngineLoader>) -> Self {
        Self { loader, engines: HashMap::new(), failed: HashSet::new() }
    }

    /// Returns the engine for `version`, loading it if necessary
    pub fn get(&mut self, version: &str) -> Result<&dyn CompilerEngine> {
        if self.failed.contains(version) {
            return Err(SolcError::MissingCompilerBinary(version.to_string()))
        }
        match self.engines.entry(version.to_string()) {
            Entry::Occupied(entry) => Ok(&**entry.into_mut()),
            Entry::Vacant(entry) => {
                tracing::trace!("loading engine for {version}");
                match self.loader.load(version) {
                    Ok(engine) => Ok(&**entry.insert(engine)),
                    Err(err) => {
                        tracing::warn!("failed to load engine {version}: {err}");
                        self.failed.insert(version.to_string());
                        Err(err)
                    }
                }
            }
        }
    }

    /// Number of successfully loaded engines
    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

impl fmt::Debug for EngineCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineCache")
            .field("engines", &self.engines.keys().collect::<Vec<_>>())
            .field("failed", &self.failed)
            .finish()
    }
}
