//! # Domain Models
//!
//! These structs represent the nodes of the page tree and the image assets
//! they reference. We use UUID v7 for time-ordered, globally unique identification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::hierarchy::PageType;
use crate::stream::StreamBody;

pub type PageId = Uuid;
pub type ImageId = Uuid;

pub const TITLE_MAX_LEN: usize = 255;
pub const SLUG_MAX_LEN: usize = 255;
pub const CATEGORY_NAME_MAX_LEN: usize = 32;

/// Live pages are publicly visible; drafts are not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationState {
    #[default]
    Draft,
    Live,
}

/// Editorial priority of an article in listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum PromoteBoost {
    #[default]
    Default = 0,
    Standout = 1,
    Promote = 2,
    Advertise = 3,
}

impl PromoteBoost {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            PromoteBoost::Default => "default",
            PromoteBoost::Standout => "standout",
            PromoteBoost::Promote => "promote",
            PromoteBoost::Advertise => "advertise",
        }
    }
}

impl TryFrom<i64> for PromoteBoost {
    type Error = AppError;

    fn try_from(code: i64) -> Result<Self> {
        match code {
            0 => Ok(PromoteBoost::Default),
            1 => Ok(PromoteBoost::Standout),
            2 => Ok(PromoteBoost::Promote),
            3 => Ok(PromoteBoost::Advertise),
            other => Err(AppError::ValidationError(format!(
                "promote_boost must be between 0 and 3, got {other}"
            ))),
        }
    }
}

/// Root-adjacent landing page. Its only extra attribute is its tag set,
/// which lives in the tag association store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomePage {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPage {
    pub name: String,
}

/// Leaf content node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseArticlePage {
    pub intro: String,
    /// Rich-text markup
    pub banner: String,
    pub body: StreamBody,
    /// Deletion of the referenced image is restricted while this page exists
    pub feed_image: ImageId,
    #[serde(default)]
    pub promote_boost: PromoteBoost,
}

/// Per-type attributes of a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "page_type")]
pub enum PageKind {
    #[serde(rename = "HomePage")]
    Home(HomePage),
    #[serde(rename = "CategoryPage")]
    Category(CategoryPage),
    #[serde(rename = "BaseArticlePage")]
    Article(BaseArticlePage),
}

impl PageKind {
    pub fn page_type(&self) -> PageType {
        match self {
            PageKind::Home(_) => PageType::Home,
            PageKind::Category(_) => PageType::Category,
            PageKind::Article(_) => PageType::Article,
        }
    }

    /// Checks the type-specific required fields and length limits.
    pub fn validate(&self) -> Result<()> {
        match self {
            PageKind::Home(_) => Ok(()),
            PageKind::Category(c) => {
                require("name", &c.name)?;
                max_len("name", &c.name, CATEGORY_NAME_MAX_LEN)
            }
            PageKind::Article(a) => {
                require("intro", &a.intro)?;
                require("banner", &a.banner)
            }
        }
    }
}

/// A node of the page tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    /// `None` for pages sitting directly under the tree root
    pub parent_id: Option<PageId>,
    pub title: String,
    pub slug: String,
    pub state: PublicationState,
    pub created_at: DateTime<Utc>,
    pub first_published_at: Option<DateTime<Utc>>,
    pub last_published_at: Option<DateTime<Utc>>,
    pub kind: PageKind,
}

impl Page {
    /// A fresh draft, not yet placed in the tree.
    pub fn new(title: impl Into<String>, slug: impl Into<String>, kind: PageKind) -> Self {
        Self {
            id: Uuid::now_v7(),
            parent_id: None,
            title: title.into(),
            slug: slug.into(),
            state: PublicationState::Draft,
            created_at: Utc::now(),
            first_published_at: None,
            last_published_at: None,
            kind,
        }
    }

    pub fn page_type(&self) -> PageType {
        self.kind.page_type()
    }

    pub fn is_live(&self) -> bool {
        self.state == PublicationState::Live
    }

    pub fn as_article(&self) -> Option<&BaseArticlePage> {
        match &self.kind {
            PageKind::Article(a) => Some(a),
            _ => None,
        }
    }

    /// Attribute validation run before any persistence write.
    pub fn validate(&self) -> Result<()> {
        require("title", &self.title)?;
        max_len("title", &self.title, TITLE_MAX_LEN)?;
        require("slug", &self.slug)?;
        max_len("slug", &self.slug, SLUG_MAX_LEN)?;
        if !self.slug.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
            return Err(AppError::ValidationError(format!(
                "slug '{}' may only contain letters, numbers, underscores and hyphens",
                self.slug
            )));
        }
        self.kind.validate()
    }
}

/// An image asset. The file itself lives in the media store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,
    pub title: String,
    /// Media store key of the original file
    pub file: String,
    pub width: u32,
    pub height: u32,
    pub created_at: DateTime<Utc>,
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(AppError::ValidationError(format!("{field} is required")))
    } else {
        Ok(())
    }
}

fn max_len(field: &str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max {
        Err(AppError::ValidationError(format!(
            "{field} has {len} characters, at most {max} allowed"
        )))
    } else {
        Ok(())
    }
}
