//! # Tag Associations
//!
//! Free-text labels bound to pages through owned join rows. Each taggable page
//! type has its own namespace; labels never cross namespaces.
//! Labels compare case-insensitively and keep the first spelling seen.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::hierarchy::PageType;

/// Tag namespace, one per page type that owns a tag association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagNamespace {
    Home,
    Article,
}

impl TagNamespace {
    /// Fails with `UnsupportedTagOperation` for page types that cannot be tagged.
    pub fn for_page_type(page_type: PageType) -> Result<Self> {
        match page_type {
            PageType::Home => Ok(TagNamespace::Home),
            PageType::Article => Ok(TagNamespace::Article),
            PageType::Category => Err(AppError::UnsupportedTagOperation(page_type)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TagNamespace::Home => "home",
            TagNamespace::Article => "article",
        }
    }
}

impl fmt::Display for TagNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trims a label and rejects empty ones.
pub fn normalize_label(raw: &str) -> Result<String> {
    let label = raw.trim();
    if label.is_empty() {
        return Err(AppError::ValidationError("tag label must not be empty".into()));
    }
    Ok(label.to_string())
}

/// Case-folded identity of a label within its namespace.
pub fn label_key(label: &str) -> String {
    label.trim().to_lowercase()
}

/// A deduplicated set of labels that remembers the first spelling of each.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(Vec<String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when a case variant of `label` is already present.
    pub fn insert(&mut self, label: &str) -> Result<bool> {
        let label = normalize_label(label)?;
        if self.contains(&label) {
            return Ok(false);
        }
        self.0.push(label);
        Ok(true)
    }

    pub fn remove(&mut self, label: &str) -> bool {
        let key = label_key(label);
        let before = self.0.len();
        self.0.retain(|l| label_key(l) != key);
        self.0.len() != before
    }

    pub fn contains(&self, label: &str) -> bool {
        let key = label_key(label);
        self.0.iter().any(|l| label_key(l) == key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Labels sorted case-insensitively.
    pub fn into_sorted(mut self) -> Vec<String> {
        self.0.sort_by_key(|l| label_key(l));
        self.0
    }

    /// Builds a set from editor input, collapsing case duplicates.
    pub fn from_labels<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = TagSet::new();
        for label in labels {
            set.insert(label.as_ref())?;
        }
        Ok(set)
    }
}
