use thiserror::Error;

use crate::model::{CatalogError, DifficultyError, ListNameError, TagError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Tag(#[from] TagError),
    #[error(transparent)]
    ListName(#[from] ListNameError),
    #[error(transparent)]
    Difficulty(#[from] DifficultyError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
