use tracker_core::model::{QuestionNumber, QuestionStatus};

use super::SqliteRepository;
use super::mapping::{db, map_status_row, question_to_i64};
use crate::repository::{StatusRepository, StorageError};

#[async_trait::async_trait]
impl StatusRepository for SqliteRepository {
    async fn upsert_status(&self, status: &QuestionStatus) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO question_status (question_number, done, difficulty)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(question_number) DO UPDATE SET
                done = excluded.done,
                difficulty = excluded.difficulty
            ",
        )
        .bind(question_to_i64(status.question_number))
        .bind(i64::from(status.done))
        .bind(status.difficulty.as_str())
        .execute(&self.pool)
        .await
        .map_err(db)?;

        Ok(())
    }

    async fn get_status(
        &self,
        question: QuestionNumber,
    ) -> Result<Option<QuestionStatus>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT question_number, done, difficulty
            FROM question_status
            WHERE question_number = ?1
            ",
        )
        .bind(question_to_i64(question))
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?;

        row.as_ref().map(map_status_row).transpose()
    }
}
