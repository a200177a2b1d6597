//! # In-memory store
//!
//! Arena-style implementation of every persistence port, used by tests and
//! by the binary when no database plugin is compiled in. All state sits
//! behind one lock so cascades and the image restriction are atomic.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{AppError, Result};
use crate::feed::{assemble_feed, FeedEntry, FeedQuery};
use crate::models::{Image, ImageId, Page, PageId};
use crate::tags::{label_key, normalize_label, TagNamespace, TagSet};
use crate::traits::{ImageRepo, PageRepo, TagRepo};

#[derive(Debug, Default)]
struct State {
    pages: HashMap<PageId, Page>,
    images: HashMap<ImageId, Image>,
    /// Join rows, owned by the page they belong to
    tags: HashMap<(TagNamespace, PageId), TagSet>,
    /// First spelling seen for each label key, per namespace
    labels: HashMap<(TagNamespace, String), String>,
}

impl State {
    fn check_refs(&self, page: &Page) -> Result<()> {
        if let Some(parent) = page.parent_id {
            if !self.pages.contains_key(&parent) {
                return Err(AppError::not_found("Page", parent));
            }
        }
        if let Some(article) = page.as_article() {
            if !self.images.contains_key(&article.feed_image) {
                return Err(AppError::not_found("Image", article.feed_image));
            }
        }
        Ok(())
    }

    fn check_slug(&self, page: &Page) -> Result<()> {
        let taken = self
            .pages
            .values()
            .any(|p| p.id != page.id && p.parent_id == page.parent_id && p.slug == page.slug);
        if taken {
            return Err(AppError::Conflict(format!("slug '{}' is already in use", page.slug)));
        }
        Ok(())
    }

    /// The page must exist and be of the type owning `ns`.
    fn check_owner(&self, ns: TagNamespace, page: PageId) -> Result<()> {
        match self.pages.get(&page) {
            Some(p) if TagNamespace::for_page_type(p.page_type()).ok() == Some(ns) => Ok(()),
            _ => Err(AppError::not_found("Page", page)),
        }
    }

    fn subtree(&self, root: PageId) -> Vec<PageId> {
        let mut out = vec![root];
        let mut i = 0;
        while i < out.len() {
            let current = out[i];
            out.extend(
                self.pages
                    .values()
                    .filter(|p| p.parent_id == Some(current))
                    .map(|p| p.id),
            );
            i += 1;
        }
        out
    }

    fn references(&self, image: ImageId) -> Vec<PageId> {
        let mut refs: Vec<PageId> = self
            .pages
            .values()
            .filter(|p| p.as_article().is_some_and(|a| a.feed_image == image))
            .map(|p| p.id)
            .collect();
        refs.sort();
        refs
    }

    fn spelling(&mut self, ns: TagNamespace, label: &str) -> String {
        self.labels
            .entry((ns, label_key(label)))
            .or_insert_with(|| label.to_string())
            .clone()
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of join rows across all pages in a namespace.
    pub async fn tag_row_count(&self, ns: TagNamespace) -> usize {
        let state = self.state.read().await;
        state
            .tags
            .iter()
            .filter(|((n, _), _)| *n == ns)
            .map(|(_, set)| set.len())
            .sum()
    }
}

#[async_trait]
impl PageRepo for MemoryStore {
    async fn insert_page(&self, page: Page) -> Result<()> {
        let mut state = self.state.write().await;
        if state.pages.contains_key(&page.id) {
            return Err(AppError::Conflict(format!("page {} already exists", page.id)));
        }
        state.check_refs(&page)?;
        state.check_slug(&page)?;
        state.pages.insert(page.id, page);
        Ok(())
    }

    async fn get_page(&self, id: PageId) -> Result<Option<Page>> {
        Ok(self.state.read().await.pages.get(&id).cloned())
    }

    async fn update_page(&self, page: Page) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.pages.contains_key(&page.id) {
            return Err(AppError::not_found("Page", page.id));
        }
        state.check_refs(&page)?;
        state.check_slug(&page)?;
        state.pages.insert(page.id, page);
        Ok(())
    }

    async fn delete_page(&self, id: PageId) -> Result<Vec<PageId>> {
        let mut state = self.state.write().await;
        if !state.pages.contains_key(&id) {
            return Err(AppError::not_found("Page", id));
        }
        let removed = state.subtree(id);
        let gone: HashSet<PageId> = removed.iter().copied().collect();
        state.pages.retain(|pid, _| !gone.contains(pid));
        state.tags.retain(|(_, pid), _| !gone.contains(pid));
        Ok(removed)
    }

    async fn children(&self, parent: Option<PageId>) -> Result<Vec<Page>> {
        let state = self.state.read().await;
        let mut out: Vec<Page> = state
            .pages
            .values()
            .filter(|p| p.parent_id == parent)
            .cloned()
            .collect();
        out.sort_by_key(|p| p.id);
        Ok(out)
    }

    async fn live_articles(&self, query: FeedQuery) -> Result<Vec<FeedEntry>> {
        let state = self.state.read().await;
        Ok(assemble_feed(state.pages.values(), query, |a| {
            state.images.get(&a.feed_image).cloned()
        }))
    }
}

#[async_trait]
impl TagRepo for MemoryStore {
    async fn add_tag(&self, ns: TagNamespace, page: PageId, label: &str) -> Result<bool> {
        let label = normalize_label(label)?;
        let mut state = self.state.write().await;
        state.check_owner(ns, page)?;
        let spelling = state.spelling(ns, &label);
        state.tags.entry((ns, page)).or_default().insert(&spelling)
    }

    async fn remove_tag(&self, ns: TagNamespace, page: PageId, label: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        state.check_owner(ns, page)?;
        Ok(state
            .tags
            .get_mut(&(ns, page))
            .is_some_and(|set| set.remove(label)))
    }

    async fn list_tags(&self, ns: TagNamespace, page: PageId) -> Result<Vec<String>> {
        let state = self.state.read().await;
        state.check_owner(ns, page)?;
        Ok(state
            .tags
            .get(&(ns, page))
            .cloned()
            .unwrap_or_default()
            .into_sorted())
    }

    async fn set_tags(&self, ns: TagNamespace, page: PageId, tags: TagSet) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_owner(ns, page)?;
        let mut set = TagSet::new();
        for label in tags.iter() {
            let spelling = state.spelling(ns, label);
            set.insert(&spelling)?;
        }
        state.tags.insert((ns, page), set);
        Ok(())
    }
}

#[async_trait]
impl ImageRepo for MemoryStore {
    async fn insert_image(&self, image: Image) -> Result<()> {
        let mut state = self.state.write().await;
        if state.images.contains_key(&image.id) {
            return Err(AppError::Conflict(format!("image {} already exists", image.id)));
        }
        state.images.insert(image.id, image);
        Ok(())
    }

    async fn get_image(&self, id: ImageId) -> Result<Option<Image>> {
        Ok(self.state.read().await.images.get(&id).cloned())
    }

    async fn image_references(&self, id: ImageId) -> Result<Vec<PageId>> {
        Ok(self.state.read().await.references(id))
    }

    async fn delete_image(&self, id: ImageId) -> Result<Image> {
        let mut state = self.state.write().await;
        let referenced_by = state.references(id);
        if !referenced_by.is_empty() {
            return Err(AppError::ReferentialRestriction { image: id, referenced_by });
        }
        state
            .images
            .remove(&id)
            .ok_or_else(|| AppError::not_found("Image", id))
    }

    async fn file_in_use(&self, file: &str) -> Result<bool> {
        Ok(self.state.read().await.images.values().any(|i| i.file == file))
    }
}
