use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::QuestionNumber;
use crate::model::question::{Difficulty, QuestionStatus};
use crate::model::tag::TagName;

/// Separator used when tags are rendered as a single column.
pub const TAG_SEPARATOR: &str = "; ";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ListNameError {
    #[error("list name cannot be empty")]
    Empty,
    #[error("list name {0:?} may only contain lowercase ascii letters, digits and '_'")]
    InvalidCharacter(String),
}

/// Machine name of a problem list, e.g. `neetcode_150`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ListName(String);

impl ListName {
    /// Create a validated list name.
    ///
    /// # Errors
    ///
    /// Returns `ListNameError` if the name is empty or contains characters
    /// other than `[a-z0-9_]`.
    pub fn new(value: impl Into<String>) -> Result<Self, ListNameError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ListNameError::Empty);
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(ListNameError::InvalidCharacter(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ListName {
    type Error = ListNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ListName> for String {
    fn from(value: ListName) -> Self {
        value.0
    }
}

/// One row of a source list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    pub question_number: QuestionNumber,
    pub problem_name: String,
}

impl ListEntry {
    #[must_use]
    pub fn new(question_number: QuestionNumber, problem_name: impl Into<String>) -> Self {
        Self {
            question_number,
            problem_name: problem_name.into(),
        }
    }
}

/// A loaded list and how many entries it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSummary {
    pub name: ListName,
    pub display_name: String,
    pub total: u32,
}

/// A list entry enriched with the question's status and tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemRow {
    pub question_number: QuestionNumber,
    pub problem_name: String,
    pub done: bool,
    pub difficulty: Difficulty,
    /// Sorted ascending.
    pub tags: Vec<TagName>,
}

impl ProblemRow {
    /// Row for an entry whose question has no stored status yet.
    #[must_use]
    pub fn from_entry(entry: ListEntry) -> Self {
        Self {
            question_number: entry.question_number,
            problem_name: entry.problem_name,
            done: false,
            difficulty: Difficulty::Unset,
            tags: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: &QuestionStatus) -> Self {
        self.done = status.done;
        self.difficulty = status.difficulty;
        self
    }

    /// Tags joined into one display column; empty when untagged.
    #[must_use]
    pub fn tags_label(&self) -> String {
        self.tags
            .iter()
            .map(TagName::as_str)
            .collect::<Vec<_>>()
            .join(TAG_SEPARATOR)
    }
}
