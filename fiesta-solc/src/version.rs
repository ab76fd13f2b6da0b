//! Compiler version strings as they are pinned in the dataset

use semver::Version;
use std::{cmp::Ordering, fmt};

/// A pinned compiler version, e.g. `v0.8.7+commit.e28d00a7`
///
/// The string is kept verbatim because it doubles as the key of the local binary file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SolcVersion(String);

impl SolcVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The version without the `commit.` marker: `v0.8.7+e28d00a7`
    pub fn short(&self) -> String {
        self.0.replace("commit.", "")
    }

    /// Parses the version as semver, `None` for non solc versions like `vyper:0.3.1`
    pub fn semver(&self) -> Option<Version> {
        Version::parse(self.0.trim_start_matches('v')).ok()
    }
}

impl AsRef<str> for SolcVersion {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SolcVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialOrd for SolcVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Semver versions first in ascending order, everything else after that by name
impl Ord for SolcVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.semver(), other.semver()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}
