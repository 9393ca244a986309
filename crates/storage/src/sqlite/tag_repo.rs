use tracker_core::model::{QuestionNumber, TagName};

use super::SqliteRepository;
use super::mapping::{db, question_to_i64, tag_from_string};
use crate::repository::{MissingReference, StorageError, TagRepository};

#[async_trait::async_trait]
impl TagRepository for SqliteRepository {
    async fn list_tags(&self) -> Result<Vec<TagName>, StorageError> {
        let names: Vec<String> = sqlx::query_scalar("SELECT tag_name FROM tags ORDER BY tag_name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;
        names.into_iter().map(tag_from_string).collect()
    }

    async fn insert_tag(&self, tag: &TagName) -> Result<(), StorageError> {
        let res = sqlx::query(
            "INSERT INTO tags (tag_name) VALUES (?1) ON CONFLICT(tag_name) DO NOTHING",
        )
        .bind(tag.as_str())
        .execute(&self.pool)
        .await
        .map_err(db)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }
        Ok(())
    }

    async fn delete_tag(&self, tag: &TagName) -> Result<u64, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db)?;

        let removed = sqlx::query("DELETE FROM question_tags WHERE tag_name = ?1")
            .bind(tag.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db)?
            .rows_affected();
        sqlx::query("DELETE FROM tags WHERE tag_name = ?1")
            .bind(tag.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db)?;

        tx.commit().await.map_err(db)?;
        Ok(removed)
    }

    async fn tags_for_question(
        &self,
        question: QuestionNumber,
    ) -> Result<Vec<TagName>, StorageError> {
        let names: Vec<String> = sqlx::query_scalar(
            r"
            SELECT tag_name FROM question_tags
            WHERE question_number = ?1
            ORDER BY tag_name ASC
            ",
        )
        .bind(question_to_i64(question))
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;
        names.into_iter().map(tag_from_string).collect()
    }

    async fn replace_question_tags(
        &self,
        question: QuestionNumber,
        tags: &[TagName],
    ) -> Result<(), StorageError> {
        let q = question_to_i64(question);
        // Dropping `tx` on an early return rolls everything back.
        let mut tx = self.pool.begin().await.map_err(db)?;

        let tracked = sqlx::query("SELECT 1 FROM question_status WHERE question_number = ?1")
            .bind(q)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db)?;
        if tracked.is_none() {
            return Err(StorageError::ReferentialViolation(
                MissingReference::Question(question),
            ));
        }

        sqlx::query("DELETE FROM question_tags WHERE question_number = ?1")
            .bind(q)
            .execute(&mut *tx)
            .await
            .map_err(db)?;

        for tag in tags {
            let exists = sqlx::query("SELECT 1 FROM tags WHERE tag_name = ?1")
                .bind(tag.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(db)?;
            if exists.is_none() {
                return Err(StorageError::ReferentialViolation(MissingReference::Tag(
                    tag.clone(),
                )));
            }

            sqlx::query(
                r"
                INSERT INTO question_tags (question_number, tag_name)
                VALUES (?1, ?2)
                ON CONFLICT(question_number, tag_name) DO NOTHING
                ",
            )
            .bind(q)
            .bind(tag.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db)?;
        }

        tx.commit().await.map_err(db)?;
        Ok(())
    }
}
