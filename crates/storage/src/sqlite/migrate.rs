use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use super::SqliteInitError;

/// Outcome of `run_migrations`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub applied: Vec<i64>,
    pub legacy_tags_migrated: usize,
    pub legacy_tags_skipped: usize,
}

/// Runs every schema version not yet recorded in `schema_migrations`.
///
/// Version 1 creates the tracker schema. Version 2 upgrades stores written by
/// the single-tag tracker: the `question_status.tag` column is folded into
/// `tags`/`question_tags` and then dropped.
pub async fn run_migrations(pool: &SqlitePool) -> Result<MigrationReport, SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    async fn record(conn: &mut SqliteConnection, version: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(version)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    let mut report = MigrationReport::default();

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: tracker schema. Tables that already exist are left alone so
    // user-created tags survive.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;
        create_schema(&mut *tx).await?;
        record(&mut *tx, 1).await?;
        tx.commit().await?;
        report.applied.push(1);
    }

    // Version 2: legacy single-tag column.
    if !is_applied(pool, 2).await? {
        let mut tx = pool.begin().await?;
        let (migrated, skipped) = upgrade_legacy_status(&mut *tx).await?;
        record(&mut *tx, 2).await?;
        tx.commit().await?;
        report.applied.push(2);
        report.legacy_tags_migrated = migrated;
        report.legacy_tags_skipped = skipped;
    }

    if report.applied.is_empty() {
        debug!("schema is up to date");
    } else {
        info!(versions = ?report.applied, "applied schema migrations");
    }
    Ok(report)
}

async fn create_schema(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS problem_lists (
                list_name TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                source_file TEXT NOT NULL
            );
        ",
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS list_entries (
                list_name TEXT NOT NULL,
                question_number INTEGER NOT NULL CHECK (question_number >= 0),
                problem_name TEXT NOT NULL,
                PRIMARY KEY (list_name, question_number),
                FOREIGN KEY (list_name) REFERENCES problem_lists(list_name) ON DELETE CASCADE
            );
        ",
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS question_status (
                question_number INTEGER PRIMARY KEY,
                done INTEGER NOT NULL DEFAULT 0 CHECK (done IN (0, 1)),
                difficulty TEXT NOT NULL DEFAULT ''
                    CHECK (difficulty IN ('', 'Easy', 'Medium', 'Hard'))
            );
        ",
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS tags (
                tag_name TEXT PRIMARY KEY
            );
        ",
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS question_tags (
                question_number INTEGER NOT NULL,
                tag_name TEXT NOT NULL,
                PRIMARY KEY (question_number, tag_name),
                FOREIGN KEY (question_number) REFERENCES question_status(question_number),
                FOREIGN KEY (tag_name) REFERENCES tags(tag_name) ON DELETE CASCADE
            );
        ",
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_list_entries_question
                ON list_entries (question_number);
        ",
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_question_tags_tag
                ON question_tags (tag_name);
        ",
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Returns `(migrated, skipped)` legacy tag rows.
async fn upgrade_legacy_status(conn: &mut SqliteConnection) -> Result<(usize, usize), sqlx::Error> {
    let columns: Vec<String> =
        sqlx::query_scalar("SELECT name FROM pragma_table_info('question_status')")
            .fetch_all(&mut *conn)
            .await?;
    let has = |column: &str| columns.iter().any(|c| c == column);

    if has("difficulty") {
        let cleared = sqlx::query(
            r"
                UPDATE question_status SET difficulty = ''
                WHERE difficulty IS NULL OR difficulty NOT IN ('', 'Easy', 'Medium', 'Hard')
            ",
        )
        .execute(&mut *conn)
        .await?
        .rows_affected();
        if cleared > 0 {
            warn!(cleared, "cleared unrecognised difficulty values");
        }
    } else {
        info!("adding difficulty column to question_status");
        sqlx::query("ALTER TABLE question_status ADD COLUMN difficulty TEXT NOT NULL DEFAULT ''")
            .execute(&mut *conn)
            .await?;
    }
    sqlx::query("UPDATE question_status SET done = 0 WHERE done IS NULL")
        .execute(&mut *conn)
        .await?;

    if !has("tag") {
        return Ok((0, 0));
    }

    let rows: Vec<(i64, String)> = sqlx::query_as(
        r"
            SELECT question_number, TRIM(tag)
            FROM question_status
            WHERE tag IS NOT NULL AND TRIM(tag) <> ''
            ORDER BY question_number
        ",
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut migrated = 0;
    let mut skipped = 0;
    for (question_number, tag) in rows {
        match migrate_legacy_tag(conn, question_number, &tag).await {
            Ok(()) => migrated += 1,
            Err(err) => {
                warn!(question_number, tag = %tag, error = %err, "could not migrate legacy tag");
                skipped += 1;
            }
        }
    }

    sqlx::query("ALTER TABLE question_status DROP COLUMN tag")
        .execute(&mut *conn)
        .await?;
    info!(migrated, skipped, "folded legacy tag column into question_tags");

    Ok((migrated, skipped))
}

async fn migrate_legacy_tag(
    conn: &mut SqliteConnection,
    question_number: i64,
    tag: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO tags (tag_name) VALUES (?1) ON CONFLICT(tag_name) DO NOTHING")
        .bind(tag)
        .execute(&mut *conn)
        .await?;
    sqlx::query(
        r"
            INSERT INTO question_tags (question_number, tag_name)
            VALUES (?1, ?2)
            ON CONFLICT(question_number, tag_name) DO NOTHING
        ",
    )
    .bind(question_number)
    .bind(tag)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
