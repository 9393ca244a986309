//! Shared error types for the services crate.

use std::path::PathBuf;

use thiserror::Error;

use storage::repository::{MissingReference, StorageError};
use storage::sqlite::SqliteInitError;
use tracker_core::model::{CatalogError, ListName, TagName};

/// Errors emitted by `TrackerService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrackerError {
    #[error("tag \"{0}\" already exists")]
    DuplicateTag(TagName),
    #[error("unknown list: {0}")]
    UnknownList(ListName),
    #[error("unknown intersection: {0}")]
    UnknownIntersection(String),
    #[error("{0}")]
    ReferentialViolation(MissingReference),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for TrackerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UnknownList(list) => Self::UnknownList(list),
            StorageError::ReferentialViolation(missing) => Self::ReferentialViolation(missing),
            other => Self::Storage(other),
        }
    }
}

/// Errors reading a single list source file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    #[error("cannot open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot read {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{} needs at least two columns (question number, problem name)", .path.display())]
    MissingColumns { path: PathBuf },
}

/// Errors that abort a load run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoaderError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors resolving the data directory or the catalog.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("cannot read catalog {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid catalog {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Errors raised while opening the store for a command.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StartupError {
    #[error("no tracker store at {}; run `tracker load` first", .path.display())]
    StoreUnavailable { path: PathBuf },
    #[error("cannot prepare {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracker_core::model::QuestionNumber;

    #[test]
    fn storage_errors_lift_into_tracker_variants() {
        let list = ListName::new("pinterest").unwrap();
        assert!(matches!(
            TrackerError::from(StorageError::UnknownList(list)),
            TrackerError::UnknownList(_)
        ));
        assert!(matches!(
            TrackerError::from(StorageError::ReferentialViolation(
                MissingReference::Question(QuestionNumber::new(7))
            )),
            TrackerError::ReferentialViolation(_)
        ));
        assert!(matches!(
            TrackerError::from(StorageError::Connection("gone".into())),
            TrackerError::Storage(_)
        ));
    }
}
