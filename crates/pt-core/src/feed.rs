//! # Feed Aggregation
//!
//! "Most recent live articles across the whole tree", each joined with its
//! feed image. Ordering is `first_published_at` descending, ties broken by
//! page id ascending; live pages without a first publication time sort last.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::{BaseArticlePage, Image, Page};

/// Number of entries surfaced as `tops` in page contexts.
pub const TOPS_LEN: usize = 3;

/// Query shape handed to the persistence layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedQuery {
    /// `None` returns the whole feed
    pub limit: Option<usize>,
}

impl FeedQuery {
    pub fn all() -> Self {
        Self { limit: None }
    }

    pub fn top(limit: usize) -> Self {
        Self { limit: Some(limit) }
    }
}

/// A live article with its feed image pre-joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub page: Page,
    pub feed_image: Image,
}

impl FeedEntry {
    pub fn article(&self) -> Option<&BaseArticlePage> {
        self.page.as_article()
    }
}

/// Feed order between two pages.
pub fn feed_order(a: &Page, b: &Page) -> Ordering {
    match (a.first_published_at, b.first_published_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.id.cmp(&b.id))
}

/// Filters live articles, orders them and applies the limit.
///
/// `resolve_image` performs the join; entries whose image cannot be resolved
/// are skipped with a warning since the store should never allow that state.
pub fn assemble_feed<'a, I, F>(pages: I, query: FeedQuery, mut resolve_image: F) -> Vec<FeedEntry>
where
    I: IntoIterator<Item = &'a Page>,
    F: FnMut(&BaseArticlePage) -> Option<Image>,
{
    let mut live: Vec<&Page> = pages
        .into_iter()
        .filter(|p| p.is_live() && p.as_article().is_some())
        .collect();
    live.sort_by(|a, b| feed_order(a, b));

    let limit = query.limit.unwrap_or(usize::MAX);
    let mut entries = Vec::with_capacity(live.len().min(limit));
    for page in live {
        if entries.len() >= limit {
            break;
        }
        let Some(article) = page.as_article() else { continue };
        match resolve_image(article) {
            Some(feed_image) => entries.push(FeedEntry { page: page.clone(), feed_image }),
            None => log::warn!("article {} references missing image {}", page.id, article.feed_image),
        }
    }
    entries
}
