use std::collections::BTreeSet;

use sqlx::{Row, SqliteConnection};
use tracing::{debug, info, warn};
use tracker_core::model::ListName;

use super::SqliteRepository;
use super::mapping::{db, ser};
use crate::repository::{
    ListLoadRepository, LoadedList, ReconcileReport, StorageError, TableCount,
};

#[async_trait::async_trait]
impl ListLoadRepository for SqliteRepository {
    async fn reconcile(
        &self,
        loaded: &[LoadedList],
        retained: &[ListName],
    ) -> Result<ReconcileReport, StorageError> {
        let mut report = ReconcileReport::default();
        let mut tx = self.pool.begin().await.map_err(db)?;

        for list in loaded {
            replace_list(&mut *tx, list).await?;
            report.lists_replaced += 1;
        }
        report.lists_removed = remove_unlisted(&mut *tx, retained).await?;

        let universe: BTreeSet<i64> =
            sqlx::query_scalar::<_, i64>("SELECT DISTINCT question_number FROM list_entries")
                .fetch_all(&mut *tx)
                .await
                .map_err(db)?
                .into_iter()
                .collect();
        let existing: BTreeSet<i64> =
            sqlx::query_scalar::<_, i64>("SELECT question_number FROM question_status")
                .fetch_all(&mut *tx)
                .await
                .map_err(db)?
                .into_iter()
                .collect();
        report.questions = universe.len();

        for &question_number in existing.difference(&universe) {
            let dropped = sqlx::query("DELETE FROM question_tags WHERE question_number = ?1")
                .bind(question_number)
                .execute(&mut *tx)
                .await
                .map_err(db)?
                .rows_affected();
            if dropped > 0 {
                warn!(
                    question_number,
                    dropped, "question left every list; dropping its tag assignments"
                );
            }
            sqlx::query("DELETE FROM question_status WHERE question_number = ?1")
                .bind(question_number)
                .execute(&mut *tx)
                .await
                .map_err(db)?;
            report.assignments_dropped += usize::try_from(dropped).unwrap_or(usize::MAX);
            report.statuses_dropped += 1;
        }

        for &question_number in universe.difference(&existing) {
            sqlx::query(
                r"
                INSERT INTO question_status (question_number, done, difficulty)
                VALUES (?1, 0, '')
                ON CONFLICT(question_number) DO NOTHING
                ",
            )
            .bind(question_number)
            .execute(&mut *tx)
            .await
            .map_err(db)?;
            report.statuses_created += 1;
        }

        tx.commit().await.map_err(db)?;

        debug!(
            lists = report.lists_replaced,
            questions = report.questions,
            created = report.statuses_created,
            dropped = report.statuses_dropped,
            "reconciled question status"
        );
        Ok(report)
    }

    async fn table_counts(&self) -> Result<Vec<TableCount>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT p.list_name, COUNT(e.question_number) AS total
            FROM problem_lists p
            LEFT JOIN list_entries e ON e.list_name = p.list_name
            GROUP BY p.list_name
            ORDER BY p.list_name ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let mut counts = Vec::with_capacity(rows.len() + 3);
        for row in rows {
            let name: String = row.try_get("list_name").map_err(ser)?;
            let total: i64 = row.try_get("total").map_err(ser)?;
            counts.push(TableCount::new(name, u64::try_from(total).map_err(ser)?));
        }

        for table in ["question_status", "tags", "question_tags"] {
            // Table names come from the fixed list above.
            let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
                .fetch_one(&self.pool)
                .await
                .map_err(db)?;
            counts.push(TableCount::new(table, u64::try_from(total).map_err(ser)?));
        }
        Ok(counts)
    }
}

async fn replace_list(conn: &mut SqliteConnection, list: &LoadedList) -> Result<(), StorageError> {
    sqlx::query(
        r"
        INSERT INTO problem_lists (list_name, display_name, source_file)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(list_name) DO UPDATE SET
            display_name = excluded.display_name,
            source_file = excluded.source_file
        ",
    )
    .bind(list.name.as_str())
    .bind(list.display_name.as_str())
    .bind(list.source_file.as_str())
    .execute(&mut *conn)
    .await
    .map_err(db)?;

    sqlx::query("DELETE FROM list_entries WHERE list_name = ?1")
        .bind(list.name.as_str())
        .execute(&mut *conn)
        .await
        .map_err(db)?;

    for entry in &list.entries {
        sqlx::query(
            r"
            INSERT INTO list_entries (list_name, question_number, problem_name)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(list_name, question_number) DO NOTHING
            ",
        )
        .bind(list.name.as_str())
        .bind(i64::from(entry.question_number.value()))
        .bind(entry.problem_name.as_str())
        .execute(&mut *conn)
        .await
        .map_err(db)?;
    }

    debug!(list = %list.name, entries = list.entries.len(), "replaced list entries");
    Ok(())
}

async fn remove_unlisted(
    conn: &mut SqliteConnection,
    retained: &[ListName],
) -> Result<usize, StorageError> {
    let stored: Vec<String> = sqlx::query_scalar("SELECT list_name FROM problem_lists")
        .fetch_all(&mut *conn)
        .await
        .map_err(db)?;

    let mut removed = 0;
    for name in stored {
        if retained.iter().any(|keep| keep.as_str() == name) {
            continue;
        }
        sqlx::query("DELETE FROM list_entries WHERE list_name = ?1")
            .bind(name.as_str())
            .execute(&mut *conn)
            .await
            .map_err(db)?;
        sqlx::query("DELETE FROM problem_lists WHERE list_name = ?1")
            .bind(name.as_str())
            .execute(&mut *conn)
            .await
            .map_err(db)?;
        info!(list = %name, "removed list no longer in the catalog");
        removed += 1;
    }
    Ok(removed)
}
