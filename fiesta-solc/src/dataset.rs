//! Discovery of contract artifacts in a sharded dataset
//!
//! The dataset is laid out as `<root>/<prefix>/<hash>/` where every hash directory holds
//!    - `metadata.json` with the contract name and the pinned compiler version
//!    - `main.sol`, the flattened source, and/or `contract.json`, a ready standard json input
//!    - `output.jsonc` once the artifact was compiled, see [`crate::cache`]

use crate::{
    error::{Result, SolcError},
    version::SolcVersion,
};
use rayon::prelude::*;
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

pub const METADATA_FILE: &str = "metadata.json";
pub const SOURCE_FILE: &str = "main.sol";
pub const INPUT_FILE: &str = "contract.json";

/// The parts of `metadata.json` we care about
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContractMetadata {
    pub contract_name: String,
    pub compiler_version: String,
}

impl ContractMetadata {
    pub fn read(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join(METADATA_FILE);
        let content = fs::read(&path).map_err(|err| SolcError::malformed(&path, err))?;
        let metadata: ContractMetadata =
            serde_json::from_slice(&content).map_err(|err| SolcError::malformed(&path, err))?;
        if metadata.compiler_version.trim().is_empty() {
            return Err(SolcError::malformed(&path, "empty `CompilerVersion`"))
        }
        Ok(metadata)
    }
}

/// A contract in the dataset, identified by the hash of its bytecode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractArtifact {
    pub hash: String,
    pub name: String,
    pub version: String,
    /// The directory holding all files of this artifact
    pub dir: PathBuf,
}

impl ContractArtifact {
    /// Reads the artifact stored in `dir`, the hash is the directory name
    pub fn read(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let hash = dir
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| SolcError::malformed(&dir, "directory name is not a valid hash"))?;
        let ContractMetadata { contract_name, compiler_version } = ContractMetadata::read(&dir)?;
        Ok(Self { hash, name: contract_name, version: compiler_version, dir })
    }

    pub fn source_file(&self) -> PathBuf {
        self.dir.join(SOURCE_FILE)
    }

    pub fn input_file(&self) -> PathBuf {
        self.dir.join(INPUT_FILE)
    }

    pub fn solc_version(&self) -> SolcVersion {
        SolcVersion::new(&self.version)
    }

    /// `0x12..cdef` style abbreviation used in progress output
    pub fn short_hash(&self) -> String {
        short_hash(&self.hash)
    }
}

pub fn short_hash(hash: &str) -> String {
    match (hash.get(..4), hash.get(hash.len().saturating_sub(4)..)) {
        (Some(head), Some(tail)) if hash.len() > 10 => format!("{head}..{tail}"),
        _ => hash.to_string(),
    }
}

/// All artifacts of the dataset grouped by their pinned compiler version
#[derive(Debug, Default)]
pub struct Inventory {
    versions: BTreeMap<String, Vec<ContractArtifact>>,
    malformed: Vec<SolcError>,
}

impl Inventory {
    /// Walks the dataset at `root` and groups all artifacts by version.
    ///
    /// Artifacts with unusable metadata and shards that can not be read are skipped and kept in
    /// [`Inventory::malformed`]. Only an unreadable root is an error.
    #[tracing::instrument(skip_all, fields(root = %root.as_ref().display()))]
    pub fn read(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        fs::read_dir(root)
            .map_err(|source| SolcError::DatasetIo { path: root.to_path_buf(), source })?;

        let (dirs, unreadable) = artifact_dirs(root);
        tracing::trace!("found {} artifact directories", dirs.len());

        let artifacts: Vec<_> = dirs.into_par_iter().map(ContractArtifact::read).collect();

        let mut inventory = Inventory { malformed: unreadable, ..Default::default() };
        for artifact in artifacts {
            match artifact {
                Ok(artifact) => inventory.insert(artifact),
                Err(err) => {
                    tracing::warn!("skipping artifact: {err}");
                    inventory.malformed.push(err);
                }
            }
        }
        tracing::debug!(
            "inventory of {} artifacts across {} versions, {} malformed",
            inventory.len(),
            inventory.versions.len(),
            inventory.malformed.len()
        );
        Ok(inventory)
    }

    /// Appends the artifact to the list of its version
    pub fn insert(&mut self, artifact: ContractArtifact) {
        self.versions.entry(artifact.version.clone()).or_default().push(artifact);
    }

    /// All artifacts pinned to `version`, in discovery order
    pub fn get(&self, version: &str) -> &[ContractArtifact] {
        self.versions.get(version).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.versions.keys().map(String::as_str)
    }

    /// Iterate over all artifacts, grouped by version
    pub fn artifacts(&self) -> impl Iterator<Item = &ContractArtifact> {
        self.versions.values().flatten()
    }

    /// `(version, weight)` pairs where the weight is the number of artifacts of that version
    pub fn workloads(&self) -> Vec<(String, usize)> {
        self.versions.iter().map(|(version, artifacts)| (version.clone(), artifacts.len())).collect()
    }

    /// Retains only the artifacts matching the optional exact version and hash prefix
    #[must_use]
    pub fn filtered(mut self, version: Option<&str>, hash_prefix: Option<&str>) -> Self {
        if let Some(version) = version {
            self.versions.retain(|v, _| v == version);
        }
        if let Some(prefix) = hash_prefix {
            let prefix = prefix.to_lowercase();
            for artifacts in self.versions.values_mut() {
                artifacts.retain(|a| a.hash.to_lowercase().starts_with(&prefix));
            }
            self.versions.retain(|_, artifacts| !artifacts.is_empty());
        }
        self
    }

    /// The errors of all artifacts that were skipped, including unreadable shards
    pub fn malformed(&self) -> &[SolcError] {
        &self.malformed
    }

    /// Total number of usable artifacts
    pub fn len(&self) -> usize {
        self.versions.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// Returns all `<root>/<prefix>/<hash>` directories, sorted by prefix then hash, and the errors of
/// all entries that could not be read
pub fn artifact_dirs(root: &Path) -> (Vec<PathBuf>, Vec<SolcError>) {
    let mut dirs = Vec::new();
    let mut errors = Vec::new();
    for entry in WalkDir::new(root).min_depth(2).max_depth(2).sort_by_file_name() {
        match entry {
            Ok(entry) if entry.file_type().is_dir() => dirs.push(entry.into_path()),
            Ok(_) => {}
            Err(err) => {
                tracing::warn!("failed to read dataset entry: {err}");
                let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                errors.push(SolcError::io(io::Error::from(err), path));
            }
        }
    }
    (dirs, errors)
}

/// Number of artifact directories per shard prefix, sorted by prefix
pub fn shard_counts(root: impl AsRef<Path>) -> Result<Vec<(String, usize)>> {
    let root = root.as_ref();
    let shards = fs::read_dir(root)
        .map_err(|source| SolcError::DatasetIo { path: root.to_path_buf(), source })?;
    let mut counts = Vec::new();
    for shard in shards {
        let shard = shard.map_err(|err| SolcError::io(err, root))?;
        let path = shard.path();
        if !shard.file_type().map_err(|err| SolcError::io(err, &path))?.is_dir() {
            continue
        }
        let mut count = 0;
        for entry in fs::read_dir(&path).map_err(|err| SolcError::io(err, &path))? {
            let entry = entry.map_err(|err| SolcError::io(err, &path))?;
            if entry.file_type().map_err(|err| SolcError::io(err, entry.path()))?.is_dir() {
                count += 1;
            }
        }
        counts.push((shard.file_name().to_string_lossy().into_owned(), count));
    }
    counts.sort();
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn artifact(root: &Path, hash: &str, metadata: &str) {
        let dir = root.join(&hash[..2]).join(hash);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(METADATA_FILE), metadata).unwrap();
    }

    fn meta(name: &str, version: &str) -> String {
        format!(r#"{{"ContractName":"{name}","CompilerVersion":"{version}","Runs":200}}"#)
    }

    #[test]
    fn groups_by_version_in_sorted_order() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        artifact(root, "bb02", &meta("B2", "v0.8.7"));
        artifact(root, "aa01", &meta("A1", "v0.8.7"));
        artifact(root, "aa00", &meta("A0", "v0.4.24"));
        artifact(root, "bb01", &meta("B1", "v0.8.7"));
        artifact(root, "cc00", "{ not json");
        fs::write(root.join("README"), "stray").unwrap();

        let inventory = Inventory::read(root).unwrap();
        assert_eq!(inventory.len(), 4);
        assert_eq!(inventory.malformed().len(), 1);
        assert!(matches!(inventory.malformed()[0], SolcError::MalformedMetadata { .. }));

        let hashes: Vec<_> = inventory.get("v0.8.7").iter().map(|a| a.hash.as_str()).collect();
        assert_eq!(hashes, vec!["aa01", "bb01", "bb02"]);
        assert_eq!(inventory.get("v0.8.7")[0].name, "A1");
        assert_eq!(
            inventory.workloads(),
            vec![("v0.4.24".to_string(), 1), ("v0.8.7".to_string(), 3)]
        );
        assert!(inventory.get("v0.5.0").is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn unreadable_shard_is_reported() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        artifact(root, "aa01", &meta("A1", "v0.8.7"));
        artifact(root, "bb01", &meta("B1", "v0.8.7"));
        let shard = root.join("bb");
        fs::set_permissions(&shard, fs::Permissions::from_mode(0o000)).unwrap();
        let readable = fs::read_dir(&shard).is_ok();
        let inventory = Inventory::read(root);
        let counts = shard_counts(root);
        fs::set_permissions(&shard, fs::Permissions::from_mode(0o755)).unwrap();
        if readable {
            // permissions are not enforced for this user
            return
        }

        let inventory = inventory.unwrap();
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory.malformed().len(), 1);
        match &inventory.malformed()[0] {
            SolcError::Io(err) => assert_eq!(err.path(), shard.as_path()),
            err => panic!("unexpected error {err}"),
        }
        assert!(counts.is_err());
    }

    #[test]
    fn unreadable_root_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Inventory::read(tmp.path().join("missing")).unwrap_err();
        assert!(matches!(err, SolcError::DatasetIo { .. }));
    }

    #[test]
    fn can_filter_inventory() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        artifact(root, "aa01", &meta("A1", "v0.8.7"));
        artifact(root, "ab01", &meta("B1", "v0.8.7"));
        artifact(root, "aa02", &meta("A2", "v0.6.12"));

        let inventory = Inventory::read(root).unwrap().filtered(None, Some("AA"));
        assert_eq!(inventory.len(), 2);

        let inventory = Inventory::read(root).unwrap().filtered(Some("v0.8.7"), Some("ab"));
        let hashes: Vec<_> = inventory.artifacts().map(|a| a.hash.as_str()).collect();
        assert_eq!(hashes, vec!["ab01"]);
        assert_eq!(inventory.versions().collect::<Vec<_>>(), vec!["v0.8.7"]);
    }

    #[test]
    fn counts_shards() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        artifact(root, "aa01", &meta("A1", "v0.8.7"));
        artifact(root, "aa02", &meta("A2", "v0.8.7"));
        artifact(root, "0b01", &meta("B1", "v0.8.7"));
        assert_eq!(
            shard_counts(root).unwrap(),
            vec![("0b".to_string(), 1), ("aa".to_string(), 2)]
        );
    }

    #[test]
    fn abbreviates_hashes() {
        assert_eq!(
            short_hash("0x00000000219ab540356cbb839cbe05303d7705fa00000000219ab540356cbb83"),
            "0x00..bb83"
        );
        assert_eq!(short_hash("aa01"), "aa01");
    }
}
