//! Data directory layout and catalog loading.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use tracker_core::model::Catalog;

use crate::error::ConfigError;

/// Environment variable naming the data directory.
pub const DATA_DIR_ENV: &str = "TRACKER_DATA_DIR";

const DEFAULT_DATA_DIR: &str = "data";
const RAW_DIR: &str = "raw";
const STATE_DIR: &str = "state";
const STORE_FILE: &str = "tracker.sqlite3";
const CATALOG_FILE: &str = "catalog.json";

/// Root of the tracker's on-disk state.
///
/// ```text
/// <root>/raw/*.csv              list sources
/// <root>/state/tracker.sqlite3  tracker store
/// <root>/catalog.json           optional catalog override
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Pick the data directory: explicit flag, then `env`, then `./data`.
    #[must_use]
    pub fn resolve(flag: Option<PathBuf>, env: Option<OsString>) -> Self {
        let root = flag
            .or_else(|| env.filter(|v| !v.is_empty()).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        Self::new(root)
    }

    /// [`DataDir::resolve`] against the process environment.
    #[must_use]
    pub fn from_env(flag: Option<PathBuf>) -> Self {
        Self::resolve(flag, std::env::var_os(DATA_DIR_ENV))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn raw_dir(&self) -> PathBuf {
        self.root.join(RAW_DIR)
    }

    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR)
    }

    #[must_use]
    pub fn store_path(&self) -> PathBuf {
        self.state_dir().join(STORE_FILE)
    }

    #[must_use]
    pub fn catalog_path(&self) -> PathBuf {
        self.root.join(CATALOG_FILE)
    }

    /// Load `catalog.json` if present, otherwise the built-in catalog.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read`/`ConfigError::Parse` for an unreadable or
    /// malformed override and `ConfigError::Catalog` if validation fails.
    pub fn load_catalog(&self) -> Result<Catalog, ConfigError> {
        let path = self.catalog_path();
        let catalog = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            let catalog: Catalog =
                serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                    path: path.clone(),
                    source,
                })?;
            info!(path = %path.display(), lists = catalog.lists.len(), "using catalog override");
            catalog
        } else {
            debug!("using built-in catalog");
            Catalog::builtin()
        };
        catalog.validate()?;
        Ok(catalog)
    }
}
