//! # Page Type Hierarchy
//!
//! Static parent/child rule table, keyed by page type.
//!
//! | Type            | allowed parents | allowed children |
//! |-----------------|-----------------|------------------|
//! | HomePage        | root only       | CategoryPage     |
//! | CategoryPage    | HomePage        | BaseArticlePage  |
//! | BaseArticlePage | CategoryPage    | none             |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// The closed set of concrete page kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PageType {
    #[serde(rename = "HomePage")]
    Home,
    #[serde(rename = "CategoryPage")]
    Category,
    #[serde(rename = "BaseArticlePage")]
    Article,
}

impl PageType {
    pub const ALL: [PageType; 3] = [PageType::Home, PageType::Category, PageType::Article];

    pub fn name(self) -> &'static str {
        match self {
            PageType::Home => "HomePage",
            PageType::Category => "CategoryPage",
            PageType::Article => "BaseArticlePage",
        }
    }

    /// Types this page may sit under. An empty slice means root only.
    pub fn allowed_parent_types(self) -> &'static [PageType] {
        match self {
            PageType::Home => &[],
            PageType::Category => &[PageType::Home],
            PageType::Article => &[PageType::Category],
        }
    }

    /// Types this page may contain. An empty slice marks a leaf type.
    pub fn allowed_child_types(self) -> &'static [PageType] {
        match self {
            PageType::Home => &[PageType::Category],
            PageType::Category => &[PageType::Article],
            PageType::Article => &[],
        }
    }

    pub fn is_leaf(self) -> bool {
        self.allowed_child_types().is_empty()
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PageType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        PageType::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| AppError::ValidationError(format!("unknown page type '{s}'")))
    }
}

/// True when a `child` page may be placed under `parent` (`None` = tree root).
///
/// Both sides of the table must agree: the parent must list the child type
/// and the child must list the parent type.
pub fn can_place(parent: Option<PageType>, child: PageType) -> bool {
    match parent {
        None => child.allowed_parent_types().is_empty(),
        Some(parent) => {
            parent.allowed_child_types().contains(&child)
                && child.allowed_parent_types().contains(&parent)
        }
    }
}

/// Same as [`can_place`] but reports the rejection as a `PlacementViolation`.
pub fn check_placement(parent: Option<PageType>, child: PageType) -> Result<()> {
    if can_place(parent, child) {
        Ok(())
    } else {
        Err(AppError::PlacementViolation { parent, child })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_table_pairs_are_placeable() {
        let allowed = [
            (PageType::Home, PageType::Category),
            (PageType::Category, PageType::Article),
        ];
        let mut rejected = 0;
        for parent in PageType::ALL {
            for child in PageType::ALL {
                let expected = allowed.contains(&(parent, child));
                assert_eq!(can_place(Some(parent), child), expected, "{parent} -> {child}");
                if !expected {
                    rejected += 1;
                    assert_eq!(
                        check_placement(Some(parent), child),
                        Err(AppError::PlacementViolation { parent: Some(parent), child })
                    );
                }
            }
        }
        assert_eq!(rejected, 7);
    }

    #[test]
    fn test_root_accepts_only_home() {
        assert!(can_place(None, PageType::Home));
        assert!(!can_place(None, PageType::Category));
        assert!(!can_place(None, PageType::Article));
    }

    #[test]
    fn test_rule_table_round_trips() {
        for t in PageType::ALL {
            for child in t.allowed_child_types() {
                assert!(child.allowed_parent_types().contains(&t));
            }
            for parent in t.allowed_parent_types() {
                assert!(parent.allowed_child_types().contains(&t));
            }
            assert_eq!(t.name().parse::<PageType>(), Ok(t));
        }
        assert!(PageType::Article.is_leaf());
        assert!("FolderPage".parse::<PageType>().is_err());
    }

    #[test]
    fn test_violation_message_names_both_sides() {
        let err = check_placement(None, PageType::Article).unwrap_err();
        assert_eq!(err.to_string(), "cannot place BaseArticlePage under the root");
        let err = check_placement(Some(PageType::Home), PageType::Home).unwrap_err();
        assert_eq!(err.to_string(), "cannot place HomePage under HomePage");
    }
}
