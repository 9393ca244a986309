use std::collections::BTreeSet;
use std::sync::Arc;

use storage::repository::{ProblemListRepository, StatusRepository, Storage, StorageError, TagRepository};
use tracing::debug;
use tracker_core::model::{
    Catalog, Difficulty, IntersectionSpec, ListName, ListSummary, Metrics, ProblemRow,
    QuestionNumber, QuestionStatus, TagName,
};

use crate::error::TrackerError;

/// Query and update surface used by the interactive session.
#[derive(Clone)]
pub struct TrackerService {
    catalog: Catalog,
    lists: Arc<dyn ProblemListRepository>,
    statuses: Arc<dyn StatusRepository>,
    tags: Arc<dyn TagRepository>,
}

impl TrackerService {
    #[must_use]
    pub fn new(
        catalog: Catalog,
        lists: Arc<dyn ProblemListRepository>,
        statuses: Arc<dyn StatusRepository>,
        tags: Arc<dyn TagRepository>,
    ) -> Self {
        Self {
            catalog,
            lists,
            statuses,
            tags,
        }
    }

    #[must_use]
    pub fn from_storage(catalog: Catalog, storage: &Storage) -> Self {
        Self::new(
            catalog,
            Arc::clone(&storage.lists),
            Arc::clone(&storage.statuses),
            Arc::clone(&storage.tags),
        )
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Tag names in ascending order, preceded by an empty "no filter" option.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Storage` if repository access fails.
    pub async fn list_tags(&self) -> Result<Vec<String>, TrackerError> {
        let tags = self.tags.list_tags().await?;
        Ok(std::iter::once(String::new())
            .chain(tags.into_iter().map(TagName::into_inner))
            .collect())
    }

    /// Tag vocabulary in ascending order.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Storage` if repository access fails.
    pub async fn tags(&self) -> Result<Vec<TagName>, TrackerError> {
        Ok(self.tags.list_tags().await?)
    }

    /// Rows of one list joined with status and tags, by question number.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::UnknownList` if the list has not been loaded.
    pub async fn list_problems(&self, list: &ListName) -> Result<Vec<ProblemRow>, TrackerError> {
        let rows = self.lists.problems(list).await?;
        debug!(list = %list, rows = rows.len(), "listed problems");
        Ok(rows)
    }

    /// Questions present in both lists. Problem names come from `left`.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::UnknownList` if either list has not been loaded.
    pub async fn list_intersection(
        &self,
        left: &ListName,
        right: &ListName,
    ) -> Result<Vec<ProblemRow>, TrackerError> {
        let rows = self.lists.intersection(left, right).await?;
        debug!(left = %left, right = %right, rows = rows.len(), "listed intersection");
        Ok(rows)
    }

    /// Predefined intersections from the catalog.
    #[must_use]
    pub fn intersections(&self) -> &[IntersectionSpec] {
        &self.catalog.intersections
    }

    /// Resolve a predefined intersection by id and list its rows.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::UnknownIntersection` for an unknown id and
    /// `TrackerError::UnknownList` if one of its lists has not been loaded.
    pub async fn catalog_intersection(
        &self,
        id: &str,
    ) -> Result<(IntersectionSpec, Vec<ProblemRow>), TrackerError> {
        let spec = self
            .catalog
            .intersection(id)
            .cloned()
            .ok_or_else(|| TrackerError::UnknownIntersection(id.to_string()))?;
        let rows = self.list_intersection(&spec.left, &spec.right).await?;
        Ok((spec, rows))
    }

    #[must_use]
    pub fn compute_metrics(rows: &[ProblemRow]) -> Metrics {
        Metrics::from_rows(rows)
    }

    /// Current status of a question; untracked questions read as pending.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Storage` if repository access fails.
    pub async fn status(&self, question: QuestionNumber) -> Result<QuestionStatus, TrackerError> {
        Ok(self
            .statuses
            .get_status(question)
            .await?
            .unwrap_or_else(|| QuestionStatus::pending(question)))
    }

    /// Upsert a question's status. Saving the same values twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Storage` if persistence fails.
    pub async fn save_status(
        &self,
        question: QuestionNumber,
        done: bool,
        difficulty: Difficulty,
    ) -> Result<(), TrackerError> {
        self.statuses
            .upsert_status(&QuestionStatus::new(question, done, difficulty))
            .await?;
        debug!(%question, done, %difficulty, "saved status");
        Ok(())
    }

    /// Replace a question's tags with exactly `tags`. Duplicates collapse.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::ReferentialViolation` if the question is not
    /// tracked or a tag does not exist; nothing changes in that case.
    pub async fn set_tags_for_question(
        &self,
        question: QuestionNumber,
        tags: impl IntoIterator<Item = TagName>,
    ) -> Result<(), TrackerError> {
        let tags: Vec<TagName> = tags.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        self.tags.replace_question_tags(question, &tags).await?;
        debug!(%question, tags = tags.len(), "replaced question tags");
        Ok(())
    }

    /// Tags assigned to a question, ascending.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Storage` if repository access fails.
    pub async fn question_tags(&self, question: QuestionNumber) -> Result<Vec<TagName>, TrackerError> {
        Ok(self.tags.tags_for_question(question).await?)
    }

    /// Add a tag to the vocabulary.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::DuplicateTag` if the exact name already exists.
    pub async fn add_tag(&self, tag: TagName) -> Result<(), TrackerError> {
        match self.tags.insert_tag(&tag).await {
            Ok(()) => {
                debug!(%tag, "added tag");
                Ok(())
            }
            Err(StorageError::Conflict) => Err(TrackerError::DuplicateTag(tag)),
            Err(err) => Err(err.into()),
        }
    }

    /// Delete a tag and every assignment referencing it. Returns how many
    /// assignments were removed; an absent tag removes nothing.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Storage` if the delete fails.
    pub async fn delete_tag(&self, tag: &TagName) -> Result<u64, TrackerError> {
        let removed = self.tags.delete_tag(tag).await?;
        debug!(%tag, removed, "deleted tag");
        Ok(removed)
    }

    /// Loaded lists with their entry counts.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Storage` if repository access fails.
    pub async fn list_summaries(&self) -> Result<Vec<ListSummary>, TrackerError> {
        Ok(self.lists.list_summaries().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use storage::repository::LoadedList;
    use tracker_core::model::ListEntry;

    fn list(name: &str) -> ListName {
        ListName::new(name).unwrap()
    }

    fn tag(name: &str) -> TagName {
        TagName::new(name).unwrap()
    }

    fn q(n: u32) -> QuestionNumber {
        QuestionNumber::new(n)
    }

    async fn service() -> TrackerService {
        let storage = Storage::in_memory();
        let lists = [("a", vec![1, 2, 3]), ("b", vec![2, 3, 4])].map(|(name, numbers)| LoadedList {
            name: list(name),
            display_name: name.to_uppercase(),
            source_file: format!("{name}.csv"),
            entries: numbers
                .into_iter()
                .map(|n| ListEntry::new(q(n), format!("P{n}")))
                .collect(),
        });
        storage
            .loader
            .reconcile(&lists, &[list("a"), list("b")])
            .await
            .unwrap();

        let mut catalog = Catalog::builtin();
        catalog.intersections = vec![IntersectionSpec {
            id: "ab".into(),
            display_name: "A and B".into(),
            left: list("a"),
            right: list("b"),
        }];
        TrackerService::from_storage(catalog, &storage)
    }

    #[tokio::test]
    async fn list_tags_prepends_empty_option() {
        let service = service().await;
        assert_eq!(service.list_tags().await.unwrap(), vec![String::new()]);

        service.add_tag(tag("graph")).await.unwrap();
        service.add_tag(tag("dp")).await.unwrap();
        assert_eq!(service.list_tags().await.unwrap(), vec!["", "dp", "graph"]);
    }

    #[tokio::test]
    async fn duplicate_tag_is_rejected() {
        let service = service().await;
        service.add_tag(tag("dp")).await.unwrap();
        let err = service.add_tag(tag("dp")).await.unwrap_err();
        assert!(matches!(err, TrackerError::DuplicateTag(t) if t.as_str() == "dp"));
        assert_eq!(service.tags().await.unwrap(), vec![tag("dp")]);
    }

    #[tokio::test]
    async fn save_status_shows_in_listing() {
        let service = service().await;
        service.save_status(q(2), true, Difficulty::Medium).await.unwrap();
        service.save_status(q(2), true, Difficulty::Medium).await.unwrap();

        let rows = service.list_problems(&list("a")).await.unwrap();
        assert!(rows[1].done);
        assert_eq!(rows[1].difficulty, Difficulty::Medium);

        let metrics = TrackerService::compute_metrics(&rows);
        assert_eq!(metrics.completed, 1);
        assert!((metrics.percent_complete - 33.3).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn set_tags_collapses_duplicates_and_replaces() {
        let service = service().await;
        service.add_tag(tag("dp")).await.unwrap();
        service.add_tag(tag("graph")).await.unwrap();

        service
            .set_tags_for_question(q(3), [tag("graph"), tag("dp"), tag("dp")])
            .await
            .unwrap();
        assert_eq!(
            service.question_tags(q(3)).await.unwrap(),
            vec![tag("dp"), tag("graph")]
        );

        service.set_tags_for_question(q(3), [tag("dp")]).await.unwrap();
        let rows = service.list_problems(&list("b")).await.unwrap();
        assert_eq!(rows[1].tags_label(), "dp");

        let err = service
            .set_tags_for_question(q(3), [tag("nope")])
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::ReferentialViolation(_)));
    }

    #[tokio::test]
    async fn delete_tag_counts_removed_assignments() {
        let service = service().await;
        service.add_tag(tag("dp")).await.unwrap();
        service.set_tags_for_question(q(1), [tag("dp")]).await.unwrap();
        service.set_tags_for_question(q(4), [tag("dp")]).await.unwrap();

        assert_eq!(service.delete_tag(&tag("dp")).await.unwrap(), 2);
        assert_eq!(service.delete_tag(&tag("dp")).await.unwrap(), 0);
        service.add_tag(tag("dp")).await.unwrap();
        assert!(service.question_tags(q(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn catalog_intersection_resolves_by_id() {
        let service = service().await;
        let (spec, rows) = service.catalog_intersection("ab").await.unwrap();
        assert_eq!(spec.display_name, "A and B");
        let numbers: Vec<u32> = rows.iter().map(|r| r.question_number.value()).collect();
        assert_eq!(numbers, vec![2, 3]);

        assert!(matches!(
            service.catalog_intersection("zz").await.unwrap_err(),
            TrackerError::UnknownIntersection(_)
        ));
        assert!(matches!(
            service.list_problems(&list("pinterest")).await.unwrap_err(),
            TrackerError::UnknownList(_)
        ));
    }

    #[tokio::test]
    async fn status_of_untracked_question_is_pending() {
        let service = service().await;
        assert_eq!(
            service.status(q(77)).await.unwrap(),
            QuestionStatus::pending(q(77))
        );
    }
}
