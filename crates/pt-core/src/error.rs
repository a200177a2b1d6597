//! # AppError
//!
//! Centralized error handling for the page tree.
//! Every port and every service operation reports failures through this type;
//! none of the variants are retried automatically.

use thiserror::Error;
use uuid::Uuid;

use crate::hierarchy::PageType;

/// The primary error type for all pt-core operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Resource not found (e.g., Page, Image)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Attribute validation failure (required field missing, length exceeded)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// A create or move would break the parent/child type table.
    /// `parent` is `None` when the target position is the tree root.
    #[error("cannot place {child} under {}", parent.map(|p| p.to_string()).unwrap_or_else(|| "the root".to_string()))]
    PlacementViolation {
        parent: Option<PageType>,
        child: PageType,
    },

    /// Tagging attempted on a page type that owns no tag association.
    #[error("{0} pages cannot be tagged")]
    UnsupportedTagOperation(PageType),

    /// An image is still referenced by one or more articles' feed_image.
    #[error("image {image} is referenced by {} article(s)", referenced_by.len())]
    ReferentialRestriction {
        image: Uuid,
        referenced_by: Vec<Uuid>,
    },

    /// Resource already exists (e.g., duplicate slug among siblings)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure (e.g., DB down, disk full)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(kind: &str, id: impl ToString) -> Self {
        AppError::NotFound(kind.to_string(), id.to_string())
    }
}

/// A specialized Result type for page tree logic.
pub type Result<T> = std::result::Result<T, AppError>;
