//! Retrieval of compiler binaries into the local binary directory

use crate::{
    engine::binary_file_name,
    error::{Result, SolcError},
};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// The default location of the official solc builds
pub const BINARIES_URL: &str = "https://binaries.soliditylang.org";

/// The default platform of the binary list
pub const DEFAULT_PLATFORM: &str = "linux-amd64";

/// Something that yields the executable bytes of a compiler version
pub trait BinarySource {
    /// Returns `None` if the source has no binary for `version`
    fn fetch(&self, version: &str) -> Result<Option<Vec<u8>>>;
}

/// Downloads binaries from `<base_url>/<platform>/solc-<platform>-<version>`
#[derive(Debug, Clone)]
pub struct HttpBinarySource {
    client: reqwest::blocking::Client,
    base_url: String,
    platform: String,
}

impl HttpBinarySource {
    pub fn new(base_url: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: base_url.into(),
            platform: platform.into(),
        }
    }

    /// The download location of `version`
    pub fn url(&self, version: &str) -> String {
        format!(
            "{}/{platform}/solc-{platform}-{version}",
            self.base_url.trim_end_matches('/'),
            platform = self.platform
        )
    }
}

impl Default for HttpBinarySource {
    fn default() -> Self {
        Self::new(BINARIES_URL, DEFAULT_PLATFORM)
    }
}

impl BinarySource for HttpBinarySource {
    fn fetch(&self, version: &str) -> Result<Option<Vec<u8>>> {
        let url = self.url(version);
        tracing::trace!("fetching {url}");
        let response = self.client.get(&url).send()?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!("no binary at {url}");
            return Ok(None)
        }
        let bytes = response.error_for_status()?.bytes()?;
        Ok(Some(bytes.to_vec()))
    }
}

/// How [`install`] provided a binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Installed {
    /// Downloaded in this call
    Fetched(PathBuf),
    /// The binary already existed locally
    Cached(PathBuf),
}

impl Installed {
    pub fn path(&self) -> &Path {
        match self {
            Installed::Fetched(path) | Installed::Cached(path) => path,
        }
    }
}

/// Makes the binary for `version` available in `bin_dir`.
///
/// An existing binary is never fetched again. Fails with
/// [`SolcError::MissingCompilerBinary`] if `source` has no binary for `version`.
#[tracing::instrument(skip(source, bin_dir))]
pub fn install(source: &dyn BinarySource, bin_dir: &Path, version: &str) -> Result<Installed> {
    let file_name = binary_file_name(version);
    let path = bin_dir.join(&file_name);
    if path.is_file() {
        return Ok(Installed::Cached(path))
    }
    let Some(bytes) = source.fetch(version)? else {
        return Err(SolcError::MissingCompilerBinary(version.to_string()))
    };
    if bytes.is_empty() {
        return Err(SolcError::msg(format!("empty binary for {version}")))
    }

    fs::create_dir_all(bin_dir).map_err(|err| SolcError::io(err, bin_dir))?;
    let tmp = bin_dir.join(format!("{file_name}.download"));
    fs::write(&tmp, &bytes).map_err(|err| SolcError::io(err, &tmp))?;
    set_executable(&tmp)?;
    fs::rename(&tmp, &path).map_err(|err| SolcError::io(err, &path))?;
    tracing::debug!("installed {version} at \"{}\"", path.display());
    Ok(Installed::Fetched(path))
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(|err| SolcError::io(err, path))
}

#[cfg(not(unix))]
fn set_executable(_: &Path) -> Result<()> {
    Ok(())
}
