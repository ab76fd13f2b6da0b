use std::path::PathBuf;

/// Number of workers used when nothing else is configured
pub const DEFAULT_JOBS: usize = 8;

/// Where the dataset lives, where compiler binaries are kept and how many workers to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetConfig {
    /// Dataset root, containing the shard prefix directories
    pub root: PathBuf,
    /// Directory holding the `solc-<version>` binaries
    pub bin_dir: PathBuf,
    /// Number of parallel workers, `k`
    pub jobs: usize,
}

impl DatasetConfig {
    /// Creates a new config for the dataset at `root` with default settings
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::builder().root(root).build()
    }

    pub fn builder() -> DatasetConfigBuilder {
        DatasetConfigBuilder::default()
    }

    /// Returns the path of the binary for the given version
    pub fn binary(&self, version: &str) -> PathBuf {
        self.bin_dir.join(crate::engine::binary_file_name(version))
    }
}

#[derive(Debug, Clone, Default)]
pub struct DatasetConfigBuilder {
    root: Option<PathBuf>,
    bin_dir: Option<PathBuf>,
    jobs: Option<usize>,
}

impl DatasetConfigBuilder {
    #[must_use]
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    #[must_use]
    pub fn bin_dir(mut self, bin_dir: impl Into<PathBuf>) -> Self {
        self.bin_dir = Some(bin_dir.into());
        self
    }

    #[must_use]
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    pub fn build(self) -> DatasetConfig {
        let Self { root, bin_dir, jobs } = self;
        DatasetConfig {
            root: root.unwrap_or_else(|| PathBuf::from("smart-contract-fiesta/organized_contracts")),
            bin_dir: bin_dir.unwrap_or_else(|| PathBuf::from(".solc")),
            jobs: jobs.unwrap_or(DEFAULT_JOBS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let config = DatasetConfig::new("/data");
        assert_eq!(config.root, PathBuf::from("/data"));
        assert_eq!(config.bin_dir, PathBuf::from(".solc"));
        assert_eq!(config.jobs, DEFAULT_JOBS);

        let config = DatasetConfig::builder().bin_dir("/bins").jobs(3).build();
        assert_eq!(config.jobs, 3);
        assert_eq!(
            config.binary("v0.8.7+commit.e28d00a7"),
            PathBuf::from("/bins/solc-v0.8.7+commit.e28d00a7")
        );
    }
}
