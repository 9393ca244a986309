use std::path::PathBuf;
use std::sync::Arc;

use storage::repository::{ListLoadRepository, LoadedList, ReconcileReport, TableCount};
use tracing::{info, warn};
use tracker_core::model::{Catalog, ListName};

use crate::error::LoaderError;
use crate::source::read_list_file;

/// What happened to one catalog list during a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    Loaded {
        list: ListName,
        entries: usize,
        skipped_rows: usize,
        duplicates: usize,
    },
    /// The source could not be read; stored entries were left as they were.
    Skipped { list: ListName, reason: String },
}

/// Result of a load run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub sources: Vec<SourceOutcome>,
    pub reconcile: ReconcileReport,
    pub counts: Vec<TableCount>,
}

impl LoadReport {
    #[must_use]
    pub fn skipped_sources(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| matches!(s, SourceOutcome::Skipped { .. }))
            .count()
    }
}

/// Rebuilds problem lists from their CSV sources and reconciles tracker state.
#[derive(Clone)]
pub struct LoaderService {
    catalog: Catalog,
    raw_dir: PathBuf,
    loader: Arc<dyn ListLoadRepository>,
}

impl LoaderService {
    #[must_use]
    pub fn new(
        catalog: Catalog,
        raw_dir: impl Into<PathBuf>,
        loader: Arc<dyn ListLoadRepository>,
    ) -> Self {
        Self {
            catalog,
            raw_dir: raw_dir.into(),
            loader,
        }
    }

    /// Read every catalog source and reconcile the store in one transaction.
    ///
    /// Missing or unreadable sources are logged and skipped; the lists they
    /// back keep their previously stored entries.
    ///
    /// # Errors
    ///
    /// Returns `LoaderError::Storage` if reconciliation fails. Nothing is
    /// written in that case.
    pub async fn run(&self) -> Result<LoadReport, LoaderError> {
        info!(raw_dir = %self.raw_dir.display(), lists = self.catalog.lists.len(), "loading problem lists");

        let mut sources = Vec::with_capacity(self.catalog.lists.len());
        let mut loaded = Vec::new();
        for spec in &self.catalog.lists {
            let path = self.raw_dir.join(&spec.file);
            match read_list_file(&path) {
                Ok(parsed) => {
                    info!(list = %spec.name, file = %spec.file, entries = parsed.entries.len(), "read list source");
                    sources.push(SourceOutcome::Loaded {
                        list: spec.name.clone(),
                        entries: parsed.entries.len(),
                        skipped_rows: parsed.skipped_rows,
                        duplicates: parsed.duplicates,
                    });
                    loaded.push(LoadedList {
                        name: spec.name.clone(),
                        display_name: spec.display_name.clone(),
                        source_file: spec.file.clone(),
                        entries: parsed.entries,
                    });
                }
                Err(err) => {
                    warn!(list = %spec.name, error = %err, "skipping list source");
                    sources.push(SourceOutcome::Skipped {
                        list: spec.name.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        let reconcile = self
            .loader
            .reconcile(&loaded, &self.catalog.list_names())
            .await?;
        info!(
            questions = reconcile.questions,
            created = reconcile.statuses_created,
            dropped = reconcile.statuses_dropped,
            lists_removed = reconcile.lists_removed,
            "reconciled tracker state"
        );

        let counts = self.loader.table_counts().await?;
        for count in &counts {
            info!(table = %count.table, rows = count.rows, "table summary");
        }

        Ok(LoadReport {
            sources,
            reconcile,
            counts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use storage::repository::{InMemoryRepository, ProblemListRepository};
    use tracker_core::model::ListSpec;

    fn catalog(names: &[&str]) -> Catalog {
        Catalog {
            lists: names
                .iter()
                .map(|n| ListSpec::csv(ListName::new(*n).unwrap(), n.to_uppercase()))
                .collect(),
            intersections: Vec::new(),
        }
    }

    #[tokio::test]
    async fn missing_sources_are_reported_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.csv"), "q,name\n1,One\n2,Two\n").unwrap();

        let repo = InMemoryRepository::new();
        let service = LoaderService::new(catalog(&["a", "b"]), tmp.path(), Arc::new(repo.clone()));
        let report = service.run().await.unwrap();

        assert_eq!(report.skipped_sources(), 1);
        assert_eq!(report.reconcile.statuses_created, 2);
        assert!(matches!(
            &report.sources[1],
            SourceOutcome::Skipped { list, .. } if list.as_str() == "b"
        ));

        let summaries = repo.list_summaries().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].display_name, "A");
    }

    #[tokio::test]
    async fn counts_follow_reconcile() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.csv"), "q,name\n1,One\n1,Dup\nx,Bad\n").unwrap();

        let service = LoaderService::new(
            catalog(&["a"]),
            tmp.path(),
            Arc::new(InMemoryRepository::new()),
        );
        let report = service.run().await.unwrap();

        assert_eq!(
            report.sources,
            vec![SourceOutcome::Loaded {
                list: ListName::new("a").unwrap(),
                entries: 1,
                skipped_rows: 1,
                duplicates: 1,
            }]
        );
        let counts: Vec<(&str, u64)> = report
            .counts
            .iter()
            .map(|c| (c.table.as_str(), c.rows))
            .collect();
        assert_eq!(
            counts,
            vec![("a", 1), ("question_status", 1), ("tags", 0), ("question_tags", 0)]
        );
    }
}
