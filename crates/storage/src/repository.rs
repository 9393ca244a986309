use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracker_core::model::{
    ListEntry, ListName, ListSummary, ProblemRow, QuestionNumber, QuestionStatus, TagName,
};

/// A row the store refused to link because its target does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingReference {
    Question(QuestionNumber),
    Tag(TagName),
}

impl fmt::Display for MissingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingReference::Question(q) => write!(f, "question {q} is not tracked"),
            MissingReference::Tag(tag) => write!(f, "tag \"{tag}\" does not exist"),
        }
    }
}

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("conflict")]
    Conflict,

    #[error("unknown problem list: {0}")]
    UnknownList(ListName),

    #[error("referential violation: {0}")]
    ReferentialViolation(MissingReference),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Parsed contents of one source file, ready to replace the stored list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedList {
    pub name: ListName,
    pub display_name: String,
    pub source_file: String,
    pub entries: Vec<ListEntry>,
}

/// What a reconciliation run changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub lists_replaced: usize,
    pub lists_removed: usize,
    pub questions: usize,
    pub statuses_created: usize,
    pub statuses_dropped: usize,
    pub assignments_dropped: usize,
}

/// Row count of one stored table (or one problem list).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCount {
    pub table: String,
    pub rows: u64,
}

impl TableCount {
    #[must_use]
    pub fn new(table: impl Into<String>, rows: u64) -> Self {
        Self {
            table: table.into(),
            rows,
        }
    }
}

/// Read access to loaded problem lists, enriched with status and tags.
#[async_trait]
pub trait ProblemListRepository: Send + Sync {
    /// Loaded lists with their entry counts, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn list_summaries(&self) -> Result<Vec<ListSummary>, StorageError>;

    /// Every entry of `list` joined with its status and tags, ordered by
    /// question number.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::UnknownList` if the list was never loaded.
    async fn problems(&self, list: &ListName) -> Result<Vec<ProblemRow>, StorageError>;

    /// Entries of `left` whose question number also appears in `right`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::UnknownList` if either list was never loaded.
    async fn intersection(
        &self,
        left: &ListName,
        right: &ListName,
    ) -> Result<Vec<ProblemRow>, StorageError>;
}

#[async_trait]
pub trait StatusRepository: Send + Sync {
    /// Insert the status or overwrite both mutable fields.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the status cannot be stored.
    async fn upsert_status(&self, status: &QuestionStatus) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn get_status(
        &self,
        question: QuestionNumber,
    ) -> Result<Option<QuestionStatus>, StorageError>;
}

#[async_trait]
pub trait TagRepository: Send + Sync {
    /// All tags in ascending order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn list_tags(&self) -> Result<Vec<TagName>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the tag already exists.
    async fn insert_tag(&self, tag: &TagName) -> Result<(), StorageError>;

    /// Remove the tag and every assignment referencing it. Returns the number
    /// of assignments removed; deleting an absent tag removes nothing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn delete_tag(&self, tag: &TagName) -> Result<u64, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn tags_for_question(&self, question: QuestionNumber)
    -> Result<Vec<TagName>, StorageError>;

    /// Replace every assignment of `question` with `tags`, atomically.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ReferentialViolation` (and changes nothing) if the
    /// question has no status row or any tag does not exist.
    async fn replace_question_tags(
        &self,
        question: QuestionNumber,
        tags: &[TagName],
    ) -> Result<(), StorageError>;
}

/// Write side used by the loader.
#[async_trait]
pub trait ListLoadRepository: Send + Sync {
    /// Replace the given lists, drop lists not in `retained`, and bring
    /// question statuses in line with the resulting question universe.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any step fails; nothing is applied in that case.
    async fn reconcile(
        &self,
        loaded: &[LoadedList],
        retained: &[ListName],
    ) -> Result<ReconcileReport, StorageError>;

    /// Row counts for every list and the status/tag tables.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn table_counts(&self) -> Result<Vec<TableCount>, StorageError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    lists: BTreeMap<ListName, MemoryList>,
    statuses: BTreeMap<QuestionNumber, QuestionStatus>,
    tags: BTreeSet<TagName>,
    assignments: BTreeSet<(QuestionNumber, TagName)>,
}

#[derive(Debug, Default)]
struct MemoryList {
    display_name: String,
    entries: BTreeMap<QuestionNumber, String>,
}

impl MemoryState {
    fn list(&self, name: &ListName) -> Result<&MemoryList, StorageError> {
        self.lists
            .get(name)
            .ok_or_else(|| StorageError::UnknownList(name.clone()))
    }

    fn enrich(&self, question: QuestionNumber, problem_name: &str) -> ProblemRow {
        let mut row = ProblemRow::from_entry(ListEntry::new(question, problem_name));
        if let Some(status) = self.statuses.get(&question) {
            row = row.with_status(status);
        }
        row.tags = self.tags_of(question);
        row
    }

    fn tags_of(&self, question: QuestionNumber) -> Vec<TagName> {
        self.assignments
            .iter()
            .filter(|(q, _)| *q == question)
            .map(|(_, tag)| tag.clone())
            .collect()
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl ProblemListRepository for InMemoryRepository {
    async fn list_summaries(&self) -> Result<Vec<ListSummary>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .lists
            .iter()
            .map(|(name, list)| ListSummary {
                name: name.clone(),
                display_name: list.display_name.clone(),
                total: u32::try_from(list.entries.len()).unwrap_or(u32::MAX),
            })
            .collect())
    }

    async fn problems(&self, list: &ListName) -> Result<Vec<ProblemRow>, StorageError> {
        let guard = self.lock()?;
        let stored = guard.list(list)?;
        Ok(stored
            .entries
            .iter()
            .map(|(q, name)| guard.enrich(*q, name))
            .collect())
    }

    async fn intersection(
        &self,
        left: &ListName,
        right: &ListName,
    ) -> Result<Vec<ProblemRow>, StorageError> {
        let guard = self.lock()?;
        let left_list = guard.list(left)?;
        let right_list = guard.list(right)?;
        Ok(left_list
            .entries
            .iter()
            .filter(|(q, _)| right_list.entries.contains_key(q))
            .map(|(q, name)| guard.enrich(*q, name))
            .collect())
    }
}

#[async_trait]
impl StatusRepository for InMemoryRepository {
    async fn upsert_status(&self, status: &QuestionStatus) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.statuses.insert(status.question_number, *status);
        Ok(())
    }

    async fn get_status(
        &self,
        question: QuestionNumber,
    ) -> Result<Option<QuestionStatus>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.statuses.get(&question).copied())
    }
}

#[async_trait]
impl TagRepository for InMemoryRepository {
    async fn list_tags(&self) -> Result<Vec<TagName>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.tags.iter().cloned().collect())
    }

    async fn insert_tag(&self, tag: &TagName) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard.tags.insert(tag.clone()) {
            Ok(())
        } else {
            Err(StorageError::Conflict)
        }
    }

    async fn delete_tag(&self, tag: &TagName) -> Result<u64, StorageError> {
        let mut guard = self.lock()?;
        let before = guard.assignments.len();
        guard.assignments.retain(|(_, t)| t != tag);
        let removed = before - guard.assignments.len();
        guard.tags.remove(tag);
        Ok(removed as u64)
    }

    async fn tags_for_question(
        &self,
        question: QuestionNumber,
    ) -> Result<Vec<TagName>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.tags_of(question))
    }

    async fn replace_question_tags(
        &self,
        question: QuestionNumber,
        tags: &[TagName],
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.statuses.contains_key(&question) {
            return Err(StorageError::ReferentialViolation(
                MissingReference::Question(question),
            ));
        }
        if let Some(missing) = tags.iter().find(|tag| !guard.tags.contains(*tag)) {
            return Err(StorageError::ReferentialViolation(MissingReference::Tag(
                missing.clone(),
            )));
        }
        guard.assignments.retain(|(q, _)| *q != question);
        for tag in tags {
            guard.assignments.insert((question, tag.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl ListLoadRepository for InMemoryRepository {
    async fn reconcile(
        &self,
        loaded: &[LoadedList],
        retained: &[ListName],
    ) -> Result<ReconcileReport, StorageError> {
        let mut guard = self.lock()?;
        let mut report = ReconcileReport::default();

        for list in loaded {
            let mut entries = BTreeMap::new();
            for entry in &list.entries {
                entries
                    .entry(entry.question_number)
                    .or_insert_with(|| entry.problem_name.clone());
            }
            guard.lists.insert(
                list.name.clone(),
                MemoryList {
                    display_name: list.display_name.clone(),
                    entries,
                },
            );
            report.lists_replaced += 1;
        }

        let before = guard.lists.len();
        guard.lists.retain(|name, _| retained.contains(name));
        report.lists_removed = before - guard.lists.len();

        let universe: BTreeSet<QuestionNumber> = guard
            .lists
            .values()
            .flat_map(|list| list.entries.keys().copied())
            .collect();
        report.questions = universe.len();

        let stale: Vec<QuestionNumber> = guard
            .statuses
            .keys()
            .filter(|q| !universe.contains(q))
            .copied()
            .collect();
        for question in stale {
            let before = guard.assignments.len();
            guard.assignments.retain(|(q, _)| *q != question);
            report.assignments_dropped += before - guard.assignments.len();
            guard.statuses.remove(&question);
            report.statuses_dropped += 1;
        }

        for question in universe {
            if !guard.statuses.contains_key(&question) {
                guard
                    .statuses
                    .insert(question, QuestionStatus::pending(question));
                report.statuses_created += 1;
            }
        }

        Ok(report)
    }

    async fn table_counts(&self) -> Result<Vec<TableCount>, StorageError> {
        let guard = self.lock()?;
        let mut counts: Vec<TableCount> = guard
            .lists
            .iter()
            .map(|(name, list)| TableCount::new(name.as_str(), list.entries.len() as u64))
            .collect();
        counts.push(TableCount::new("question_status", guard.statuses.len() as u64));
        counts.push(TableCount::new("tags", guard.tags.len() as u64));
        counts.push(TableCount::new(
            "question_tags",
            guard.assignments.len() as u64,
        ));
        Ok(counts)
    }
}

/// Aggregates the tracker repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub lists: Arc<dyn ProblemListRepository>,
    pub statuses: Arc<dyn StatusRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub loader: Arc<dyn ListLoadRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            lists: Arc::new(repo.clone()),
            statuses: Arc::new(repo.clone()),
            tags: Arc::new(repo.clone()),
            loader: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(value: &str) -> ListName {
        ListName::new(value).unwrap()
    }

    fn tag(value: &str) -> TagName {
        TagName::new(value).unwrap()
    }

    fn loaded(list: &str, numbers: &[u32]) -> LoadedList {
        LoadedList {
            name: name(list),
            display_name: list.to_uppercase(),
            source_file: format!("{list}.csv"),
            entries: numbers
                .iter()
                .map(|n| ListEntry::new(QuestionNumber::new(*n), format!("Problem {n}")))
                .collect(),
        }
    }

    #[tokio::test]
    async fn reconcile_creates_pending_statuses() {
        let repo = InMemoryRepository::new();
        let report = repo
            .reconcile(&[loaded("a", &[1, 2]), loaded("b", &[2, 3])], &[name("a"), name("b")])
            .await
            .unwrap();
        assert_eq!(report.questions, 3);
        assert_eq!(report.statuses_created, 3);

        let status = repo.get_status(QuestionNumber::new(3)).await.unwrap();
        assert_eq!(status, Some(QuestionStatus::pending(QuestionNumber::new(3))));
    }

    #[tokio::test]
    async fn replace_tags_rejects_unknown_tag_without_changes() {
        let repo = InMemoryRepository::new();
        repo.reconcile(&[loaded("a", &[1])], &[name("a")])
            .await
            .unwrap();
        repo.insert_tag(&tag("dp")).await.unwrap();
        let q = QuestionNumber::new(1);
        repo.replace_question_tags(q, &[tag("dp")]).await.unwrap();

        let err = repo
            .replace_question_tags(q, &[tag("graph")])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::ReferentialViolation(MissingReference::Tag(_))
        ));
        assert_eq!(repo.tags_for_question(q).await.unwrap(), vec![tag("dp")]);
    }

    #[tokio::test]
    async fn intersection_keeps_left_names() {
        let repo = InMemoryRepository::new();
        let mut right = loaded("b", &[2, 3, 4]);
        right.entries[0].problem_name = "Other name".into();
        repo.reconcile(&[loaded("a", &[1, 2, 3]), right], &[name("a"), name("b")])
            .await
            .unwrap();

        let rows = repo.intersection(&name("a"), &name("b")).await.unwrap();
        let numbers: Vec<u32> = rows.iter().map(|r| r.question_number.value()).collect();
        assert_eq!(numbers, vec![2, 3]);
        assert_eq!(rows[0].problem_name, "Problem 2");
    }
}
