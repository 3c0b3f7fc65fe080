//! Repository configuration: where cache entries live on this machine.
//!
//! A repository root carries an `mds.yml` describing ordered local cache
//! roots and optional remote roots. Relative paths resolve against the
//! repository root.

use std::fs;
use std::path::{Path, PathBuf};

use mds_core::{ErrorInfo, MdsError};
use serde::{Deserialize, Serialize};

/// File name of the repository configuration.
pub const CONFIG_FILE: &str = "mds.yml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CacheLocations {
    local: Vec<PathBuf>,
    #[serde(default)]
    remote: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct RepositoryConfig {
    cache: CacheLocations,
}

/// Resolved repository: the config file plus the root it was found under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    root: PathBuf,
    config: RepositoryConfig,
}

impl Repository {
    /// Loads the repository configuration from `<root>/mds.yml`.
    pub fn from_root(root: impl Into<PathBuf>) -> Result<Self, MdsError> {
        let root = root.into();
        let config_path = root.join(CONFIG_FILE);
        let text = fs::read_to_string(&config_path).map_err(|err| {
            MdsError::Storage(
                ErrorInfo::new("mds_cache.repo_config", err.to_string())
                    .with_context("path", config_path.display().to_string())
                    .with_hint("a repository root must contain an mds.yml"),
            )
        })?;
        let config: RepositoryConfig = serde_yaml::from_str(&text).map_err(|err| {
            MdsError::Serde(
                ErrorInfo::new("mds_cache.repo_parse", err.to_string())
                    .with_context("path", config_path.display().to_string()),
            )
        })?;
        if config.cache.local.is_empty() {
            return Err(MdsError::Storage(
                ErrorInfo::new(
                    "mds_cache.repo_local",
                    "repository declares no local cache roots",
                )
                .with_context("path", config_path.display().to_string()),
            ));
        }
        Ok(Self { root, config })
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Ordered local cache roots, resolved against the repository root.
    pub fn local_roots(&self) -> Vec<PathBuf> {
        self.config
            .cache
            .local
            .iter()
            .map(|path| self.resolve(path))
            .collect()
    }

    /// Remote cache roots, resolved against the repository root.
    pub fn remote_roots(&self) -> Vec<PathBuf> {
        self.config
            .cache
            .remote
            .iter()
            .map(|path| self.resolve(path))
            .collect()
    }
}
