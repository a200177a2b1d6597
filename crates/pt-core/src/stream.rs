//! # Article Body Blocks
//!
//! An article body is an ordered sequence of typed blocks. The stored form is
//! a JSON array of `{"type": ..., "value": ...}` objects kept in authored order.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// One typed unit of article content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Block {
    /// Inline formatted text (rich-text markup)
    Text(String),
    /// Pointer to an image asset
    Image(Uuid),
    /// External URL resolved to embeddable content by the render layer
    Embed(String),
    /// Opaque markup inserted verbatim. Not sanitized here.
    Html(String),
}

impl Block {
    pub fn kind(&self) -> &'static str {
        match self {
            Block::Text(_) => "text",
            Block::Image(_) => "image",
            Block::Embed(_) => "embed",
            Block::Html(_) => "html",
        }
    }
}

/// The ordered block sequence of an article body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamBody(pub Vec<Block>);

impl StreamBody {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self(blocks)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Images referenced from inside the body (not the feed image).
    pub fn image_refs(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.0.iter().filter_map(|b| match b {
            Block::Image(id) => Some(*id),
            _ => None,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| AppError::Internal(format!("encode body: {e}")))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| AppError::ValidationError(format!("malformed article body: {e}")))
    }
}

impl From<Vec<Block>> for StreamBody {
    fn from(blocks: Vec<Block>) -> Self {
        Self(blocks)
    }
}
