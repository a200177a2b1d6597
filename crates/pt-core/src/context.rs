//! # Page Contexts
//!
//! What each page type hands to the rendering layer: the page itself plus its
//! feed slices and, for taggable types, the resolved tag set.

use serde::Serialize;

use crate::feed::FeedEntry;
use crate::hierarchy::PageType;
use crate::models::Page;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomeContext {
    pub page: Page,
    pub tags: Vec<String>,
    pub tops: Vec<FeedEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryContext {
    pub page: Page,
    pub tops: Vec<FeedEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleContext {
    pub page: Page,
    pub tags: Vec<String>,
    pub tops: Vec<FeedEntry>,
    /// Full, unbounded feed
    pub feed: Vec<FeedEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "page_type")]
pub enum PageContext {
    #[serde(rename = "HomePage")]
    Home(HomeContext),
    #[serde(rename = "CategoryPage")]
    Category(CategoryContext),
    #[serde(rename = "BaseArticlePage")]
    Article(ArticleContext),
}

impl PageContext {
    pub fn page_type(&self) -> PageType {
        match self {
            PageContext::Home(_) => PageType::Home,
            PageContext::Category(_) => PageType::Category,
            PageContext::Article(_) => PageType::Article,
        }
    }

    pub fn page(&self) -> &Page {
        match self {
            PageContext::Home(c) => &c.page,
            PageContext::Category(c) => &c.page,
            PageContext::Article(c) => &c.page,
        }
    }

    pub fn tops(&self) -> &[FeedEntry] {
        match self {
            PageContext::Home(c) => &c.tops,
            PageContext::Category(c) => &c.tops,
            PageContext::Article(c) => &c.tops,
        }
    }

    pub fn tags(&self) -> Option<&[String]> {
        match self {
            PageContext::Home(c) => Some(&c.tags),
            PageContext::Category(_) => None,
            PageContext::Article(c) => Some(&c.tags),
        }
    }

    pub fn feed(&self) -> Option<&[FeedEntry]> {
        match self {
            PageContext::Article(c) => Some(&c.feed),
            _ => None,
        }
    }
}
