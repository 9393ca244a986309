use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::list::ProblemRow;

/// Progress over a set of problem rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total: u32,
    pub completed: u32,
    /// Percentage in `[0, 100]`, rounded to one decimal place.
    pub percent_complete: f64,
}

impl Metrics {
    #[must_use]
    pub fn new(total: u32, completed: u32) -> Self {
        let percent_complete = if total == 0 {
            0.0
        } else {
            let raw = f64::from(completed) / f64::from(total) * 100.0;
            (raw * 10.0).round() / 10.0
        };
        Self {
            total,
            completed,
            percent_complete,
        }
    }

    #[must_use]
    pub fn from_rows(rows: &[ProblemRow]) -> Self {
        let total = u32::try_from(rows.len()).unwrap_or(u32::MAX);
        let completed = u32::try_from(rows.iter().filter(|row| row.done).count()).unwrap_or(u32::MAX);
        Self::new(total, completed)
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} completed ({:.1}%)",
            self.completed, self.total, self.percent_complete
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ListEntry, QuestionNumber};

    fn row(number: u32, done: bool) -> ProblemRow {
        let mut row = ProblemRow::from_entry(ListEntry::new(QuestionNumber::new(number), "p"));
        row.done = done;
        row
    }

    #[test]
    fn empty_rows_yield_zero_percent() {
        let metrics = Metrics::from_rows(&[]);
        assert_eq!(metrics.total, 0);
        assert_eq!(metrics.completed, 0);
        assert!(metrics.percent_complete.abs() < f64::EPSILON);
    }

    #[test]
    fn percent_is_rounded_to_one_decimal() {
        let metrics = Metrics::from_rows(&[row(1, true), row(2, false), row(3, false)]);
        assert_eq!(metrics.total, 3);
        assert_eq!(metrics.completed, 1);
        assert!((metrics.percent_complete - 33.3).abs() < 1e-9);
        assert_eq!(metrics.to_string(), "1/3 completed (33.3%)");
    }

    #[test]
    fn all_done_is_one_hundred_percent() {
        let metrics = Metrics::new(4, 4);
        assert!((metrics.percent_complete - 100.0).abs() < f64::EPSILON);
    }
}
