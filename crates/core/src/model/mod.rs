mod catalog;
mod ids;
mod list;
mod metrics;
mod question;
mod tag;

pub use catalog::{Catalog, CatalogError, IntersectionSpec, ListSpec};
pub use ids::QuestionNumber;
pub use list::{ListEntry, ListName, ListNameError, ListSummary, ProblemRow, TAG_SEPARATOR};
pub use metrics::Metrics;
pub use question::{Difficulty, DifficultyError, QuestionStatus};
pub use tag::{TagError, TagName};
