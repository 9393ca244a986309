use std::sync::Arc;

use storage::repository::Storage;
use storage::sqlite::SqliteRepository;
use tracing::{info, warn};
use tracker_core::model::Catalog;

use crate::config::DataDir;
use crate::error::StartupError;
use crate::loader_service::LoaderService;
use crate::tracker_service::TrackerService;

/// How to treat a store file that does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// Create the state directory and database file (the `load` command).
    Create,
    /// Refuse to start without an existing store (the `session` command).
    RequireExisting,
}

/// Assembles the services for one command against a data directory.
#[derive(Clone)]
pub struct AppServices {
    catalog: Catalog,
    loader: Arc<LoaderService>,
    tracker: Arc<TrackerService>,
    repo: SqliteRepository,
}

impl AppServices {
    /// Open (and migrate) the store under `data`.
    ///
    /// # Errors
    ///
    /// Returns `StartupError::StoreUnavailable` when `mode` requires an
    /// existing store and none is found, `StartupError::Config` for catalog
    /// problems, and `StartupError::Sqlite` if the store cannot be opened.
    pub async fn open(data: &DataDir, mode: StoreMode) -> Result<Self, StartupError> {
        let catalog = data.load_catalog()?;

        let path = data.store_path();
        match mode {
            StoreMode::RequireExisting if !path.exists() => {
                return Err(StartupError::StoreUnavailable { path });
            }
            StoreMode::RequireExisting => {}
            StoreMode::Create => {
                let state = data.state_dir();
                std::fs::create_dir_all(&state)
                    .map_err(|source| StartupError::Io { path: state, source })?;
            }
        }

        let repo = SqliteRepository::open_file(&path).await?;
        let migrations = repo.migrate().await?;
        if migrations.legacy_tags_skipped > 0 {
            warn!(
                skipped = migrations.legacy_tags_skipped,
                "some legacy tags could not be migrated"
            );
        }
        info!(store = %path.display(), "opened tracker store");

        let storage = Storage::from_sqlite(repo.clone());
        let loader = Arc::new(LoaderService::new(
            catalog.clone(),
            data.raw_dir(),
            Arc::clone(&storage.loader),
        ));
        let tracker = Arc::new(TrackerService::from_storage(catalog.clone(), &storage));

        Ok(Self {
            catalog,
            loader,
            tracker,
            repo,
        })
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn loader(&self) -> Arc<LoaderService> {
        Arc::clone(&self.loader)
    }

    #[must_use]
    pub fn tracker(&self) -> Arc<TrackerService> {
        Arc::clone(&self.tracker)
    }

    /// Release the store connection.
    pub async fn close(&self) {
        self.repo.close().await;
    }
}
