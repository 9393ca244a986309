use sqlx::Row;
use tracker_core::model::{ListName, ListSummary, ProblemRow};

use super::SqliteRepository;
use super::mapping::{attach_tags, db, list_name_from_string, map_problem_row, ser};
use crate::repository::{ProblemListRepository, StorageError};

impl SqliteRepository {
    async fn ensure_list(&self, list: &ListName) -> Result<(), StorageError> {
        let row = sqlx::query("SELECT 1 FROM problem_lists WHERE list_name = ?1")
            .bind(list.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        match row {
            Some(_) => Ok(()),
            None => Err(StorageError::UnknownList(list.clone())),
        }
    }

    /// Tag pairs for every question in `list`, ordered by tag name.
    async fn tags_in_list(&self, list: &ListName) -> Result<Vec<(i64, String)>, StorageError> {
        sqlx::query_as(
            r"
            SELECT qt.question_number, qt.tag_name
            FROM question_tags qt
            JOIN list_entries e ON e.question_number = qt.question_number
            WHERE e.list_name = ?1
            ORDER BY qt.question_number ASC, qt.tag_name ASC
            ",
        )
        .bind(list.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db)
    }
}

#[async_trait::async_trait]
impl ProblemListRepository for SqliteRepository {
    async fn list_summaries(&self) -> Result<Vec<ListSummary>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT p.list_name, p.display_name, COUNT(e.question_number) AS total
            FROM problem_lists p
            LEFT JOIN list_entries e ON e.list_name = p.list_name
            GROUP BY p.list_name, p.display_name
            ORDER BY p.list_name ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let total: i64 = row.try_get("total").map_err(ser)?;
            summaries.push(ListSummary {
                name: list_name_from_string(row.try_get("list_name").map_err(ser)?)?,
                display_name: row.try_get("display_name").map_err(ser)?,
                total: u32::try_from(total)
                    .map_err(|_| StorageError::Serialization("list size overflow".into()))?,
            });
        }
        Ok(summaries)
    }

    async fn problems(&self, list: &ListName) -> Result<Vec<ProblemRow>, StorageError> {
        self.ensure_list(list).await?;

        let rows = sqlx::query(
            r"
            SELECT
                e.question_number,
                e.problem_name,
                COALESCE(qs.done, 0) AS done,
                COALESCE(qs.difficulty, '') AS difficulty
            FROM list_entries e
            LEFT JOIN question_status qs ON qs.question_number = e.question_number
            WHERE e.list_name = ?1
            ORDER BY e.question_number ASC
            ",
        )
        .bind(list.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let mut problems = Vec::with_capacity(rows.len());
        for row in rows {
            problems.push(map_problem_row(&row)?);
        }
        attach_tags(&mut problems, self.tags_in_list(list).await?)?;
        Ok(problems)
    }

    async fn intersection(
        &self,
        left: &ListName,
        right: &ListName,
    ) -> Result<Vec<ProblemRow>, StorageError> {
        self.ensure_list(left).await?;
        self.ensure_list(right).await?;

        // (list_name, question_number) is the primary key, so the join yields
        // each shared question once.
        let rows = sqlx::query(
            r"
            SELECT
                a.question_number,
                a.problem_name,
                COALESCE(qs.done, 0) AS done,
                COALESCE(qs.difficulty, '') AS difficulty
            FROM list_entries a
            JOIN list_entries b
                ON b.question_number = a.question_number AND b.list_name = ?2
            LEFT JOIN question_status qs ON qs.question_number = a.question_number
            WHERE a.list_name = ?1
            ORDER BY a.question_number ASC
            ",
        )
        .bind(left.as_str())
        .bind(right.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let mut problems = Vec::with_capacity(rows.len());
        for row in rows {
            problems.push(map_problem_row(&row)?);
        }
        attach_tags(&mut problems, self.tags_in_list(left).await?)?;
        Ok(problems)
    }
}
