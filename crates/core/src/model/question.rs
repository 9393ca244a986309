use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionNumber;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DifficultyError {
    #[error("unknown difficulty: {0:?} (expected Easy, Medium, Hard or empty)")]
    Unknown(String),
}

/// User-assigned difficulty of a problem.
///
/// `Unset` is persisted as the empty string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    #[default]
    #[serde(rename = "")]
    Unset,
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Unset,
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Unset => "",
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    #[must_use]
    pub fn is_set(self) -> bool {
        !matches!(self, Difficulty::Unset)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = DifficultyError;

    /// Parses the stored form as well as user input: matching is
    /// case-insensitive and `none`/`-` also clear the difficulty.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" | "none" | "-" => Ok(Difficulty::Unset),
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(DifficultyError::Unknown(trimmed.to_string())),
        }
    }
}

/// Mutable completion state of one question, shared by every list containing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionStatus {
    pub question_number: QuestionNumber,
    pub done: bool,
    pub difficulty: Difficulty,
}

impl QuestionStatus {
    #[must_use]
    pub fn new(question_number: QuestionNumber, done: bool, difficulty: Difficulty) -> Self {
        Self {
            question_number,
            done,
            difficulty,
        }
    }

    /// Status assigned to a question the first time it is seen.
    #[must_use]
    pub fn pending(question_number: QuestionNumber) -> Self {
        Self::new(question_number, false, Difficulty::Unset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_form_round_trips() {
        for difficulty in Difficulty::ALL {
            assert_eq!(difficulty.as_str().parse::<Difficulty>().unwrap(), difficulty);
        }
    }

    #[test]
    fn parse_accepts_user_spellings() {
        assert_eq!("medium".parse::<Difficulty>().unwrap(), Difficulty::Medium);
        assert_eq!(" HARD ".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert_eq!("none".parse::<Difficulty>().unwrap(), Difficulty::Unset);
    }

    #[test]
    fn parse_rejects_unknown_values() {
        let err = "trivial".parse::<Difficulty>().unwrap_err();
        assert_eq!(err, DifficultyError::Unknown("trivial".into()));
    }

    #[test]
    fn pending_status_is_not_done_and_unrated() {
        let status = QuestionStatus::pending(QuestionNumber::new(1));
        assert!(!status.done);
        assert_eq!(status.difficulty, Difficulty::Unset);
        assert!(!status.difficulty.is_set());
    }

    #[test]
    fn unset_serializes_as_empty_string() {
        let json = serde_json::to_string(&Difficulty::Unset).unwrap();
        assert_eq!(json, "\"\"");
    }
}
