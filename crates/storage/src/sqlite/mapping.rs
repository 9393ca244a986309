use std::collections::BTreeMap;

use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tracker_core::model::{
    Difficulty, ListEntry, ListName, ProblemRow, QuestionNumber, QuestionStatus, TagName,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn db<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn question_to_i64(q: QuestionNumber) -> i64 {
    i64::from(q.value())
}

pub(crate) fn question_from_i64(v: i64) -> Result<QuestionNumber, StorageError> {
    u32::try_from(v)
        .map(QuestionNumber::new)
        .map_err(|_| StorageError::Serialization(format!("question_number out of range: {v}")))
}

pub(crate) fn parse_difficulty(s: &str) -> Result<Difficulty, StorageError> {
    match s {
        "" => Ok(Difficulty::Unset),
        "Easy" => Ok(Difficulty::Easy),
        "Medium" => Ok(Difficulty::Medium),
        "Hard" => Ok(Difficulty::Hard),
        _ => Err(StorageError::Serialization(format!(
            "invalid difficulty: {s}"
        ))),
    }
}

pub(crate) fn tag_from_string(s: String) -> Result<TagName, StorageError> {
    TagName::new(s).map_err(ser)
}

pub(crate) fn list_name_from_string(s: String) -> Result<ListName, StorageError> {
    ListName::new(s).map_err(ser)
}

/// Maps `question_number, problem_name, done, difficulty` columns; tags are
/// attached separately.
pub(crate) fn map_problem_row(row: &SqliteRow) -> Result<ProblemRow, StorageError> {
    let question = question_from_i64(row.try_get::<i64, _>("question_number").map_err(ser)?)?;
    let entry = ListEntry::new(question, row.try_get::<String, _>("problem_name").map_err(ser)?);
    let status = QuestionStatus::new(
        question,
        row.try_get::<i64, _>("done").map_err(ser)? != 0,
        parse_difficulty(&row.try_get::<String, _>("difficulty").map_err(ser)?)?,
    );
    Ok(ProblemRow::from_entry(entry).with_status(&status))
}

pub(crate) fn map_status_row(row: &SqliteRow) -> Result<QuestionStatus, StorageError> {
    Ok(QuestionStatus::new(
        question_from_i64(row.try_get::<i64, _>("question_number").map_err(ser)?)?,
        row.try_get::<i64, _>("done").map_err(ser)? != 0,
        parse_difficulty(&row.try_get::<String, _>("difficulty").map_err(ser)?)?,
    ))
}

/// Attach `(question_number, tag_name)` pairs, already ordered by tag name, to
/// the matching rows. Pairs for questions not in `rows` are ignored.
pub(crate) fn attach_tags(
    rows: &mut [ProblemRow],
    pairs: Vec<(i64, String)>,
) -> Result<(), StorageError> {
    let mut by_question: BTreeMap<QuestionNumber, Vec<TagName>> = BTreeMap::new();
    for (question, tag) in pairs {
        by_question
            .entry(question_from_i64(question)?)
            .or_default()
            .push(tag_from_string(tag)?);
    }
    for row in rows {
        if let Some(tags) = by_question.remove(&row.question_number) {
            row.tags = tags;
        }
    }
    Ok(())
}
