use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::list::ListName;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("catalog must name at least one list")]
    NoLists,
    #[error("list {0} is declared more than once")]
    DuplicateList(ListName),
    #[error("intersection id {0:?} is declared more than once")]
    DuplicateIntersection(String),
    #[error("intersection {id:?} references unknown list {list}")]
    UnknownList { id: String, list: ListName },
    #[error("list {0} has an empty source file name")]
    EmptyFileName(ListName),
}

/// A named source list and the CSV file it is loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSpec {
    pub name: ListName,
    pub display_name: String,
    /// File name relative to the raw data directory.
    pub file: String,
}

impl ListSpec {
    /// Spec whose source file is `<name>.csv`.
    #[must_use]
    pub fn csv(name: ListName, display_name: impl Into<String>) -> Self {
        let file = format!("{name}.csv");
        Self {
            name,
            display_name: display_name.into(),
            file,
        }
    }
}

/// A predefined pair of lists to intersect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntersectionSpec {
    pub id: String,
    pub display_name: String,
    pub left: ListName,
    pub right: ListName,
}

/// Lists the loader knows about and the intersections offered to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub lists: Vec<ListSpec>,
    #[serde(default)]
    pub intersections: Vec<IntersectionSpec>,
}

impl Catalog {
    /// The lists and intersections shipped with the tracker.
    #[must_use]
    pub fn builtin() -> Self {
        let list = |name: &str, display: &str| {
            // Names below are static snake_case literals.
            ListName::new(name).map(|name| ListSpec::csv(name, display))
        };
        let lists: Vec<ListSpec> = [
            ("neetcode_150", "NeetCode 150"),
            ("neetcode_meta_list", "NeetCode Meta List"),
            ("leetcode_meta_3mo", "LeetCode Meta (3 months)"),
            ("adv_algo_questions", "Advanced Algorithms"),
            ("pinterest", "Pinterest"),
        ]
        .into_iter()
        .filter_map(|(name, display)| list(name, display).ok())
        .collect();

        let pair = |id: &str, display: &str, left: &str, right: &str| {
            Some(IntersectionSpec {
                id: id.to_string(),
                display_name: display.to_string(),
                left: ListName::new(left).ok()?,
                right: ListName::new(right).ok()?,
            })
        };
        let intersections = [
            pair(
                "adv_algo_neetcode_150",
                "Advanced Algorithms ∩ NeetCode 150",
                "adv_algo_questions",
                "neetcode_150",
            ),
            pair(
                "leetcode_meta_3mo_neetcode_meta",
                "LeetCode Meta (3mo) ∩ NeetCode Meta List",
                "leetcode_meta_3mo",
                "neetcode_meta_list",
            ),
            pair(
                "adv_algo_leetcode_meta_3mo",
                "Advanced Algorithms ∩ LeetCode Meta (3mo)",
                "adv_algo_questions",
                "leetcode_meta_3mo",
            ),
            pair(
                "adv_algo_neetcode_meta",
                "Advanced Algorithms ∩ NeetCode Meta List",
                "adv_algo_questions",
                "neetcode_meta_list",
            ),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self {
            lists,
            intersections,
        }
    }

    /// Check uniqueness and cross references.
    ///
    /// # Errors
    ///
    /// Returns the first `CatalogError` found.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.lists.is_empty() {
            return Err(CatalogError::NoLists);
        }

        let mut names = HashSet::new();
        for spec in &self.lists {
            if !names.insert(&spec.name) {
                return Err(CatalogError::DuplicateList(spec.name.clone()));
            }
            if spec.file.trim().is_empty() {
                return Err(CatalogError::EmptyFileName(spec.name.clone()));
            }
        }

        let mut ids = HashSet::new();
        for pair in &self.intersections {
            if !ids.insert(pair.id.as_str()) {
                return Err(CatalogError::DuplicateIntersection(pair.id.clone()));
            }
            for list in [&pair.left, &pair.right] {
                if !names.contains(list) {
                    return Err(CatalogError::UnknownList {
                        id: pair.id.clone(),
                        list: list.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn list(&self, name: &ListName) -> Option<&ListSpec> {
        self.lists.iter().find(|spec| &spec.name == name)
    }

    #[must_use]
    pub fn intersection(&self, id: &str) -> Option<&IntersectionSpec> {
        self.intersections.iter().find(|pair| pair.id == id)
    }

    #[must_use]
    pub fn list_names(&self) -> Vec<ListName> {
        self.lists.iter().map(|spec| spec.name.clone()).collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
