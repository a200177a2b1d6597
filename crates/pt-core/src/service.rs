//! # PageService
//!
//! Placement authority and read-composition layer over the ports.
//! Every mutation validates attributes and the hierarchy table before the
//! first write; every rejection is returned to the caller unchanged.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::context::{ArticleContext, CategoryContext, HomeContext, PageContext};
use crate::error::{AppError, Result};
use crate::feed::{FeedEntry, FeedQuery, TOPS_LEN};
use crate::hierarchy::check_placement;
use crate::models::{Image, ImageId, Page, PageId, PageKind, PublicationState};
use crate::tags::{TagNamespace, TagSet};
use crate::traits::{ImageRepo, MediaStore, PageRepo, TagRepo};

#[derive(Clone)]
pub struct PageService {
    pages: Arc<dyn PageRepo>,
    tags: Arc<dyn TagRepo>,
    images: Arc<dyn ImageRepo>,
    media: Arc<dyn MediaStore>,
}

impl PageService {
    pub fn new(
        pages: Arc<dyn PageRepo>,
        tags: Arc<dyn TagRepo>,
        images: Arc<dyn ImageRepo>,
        media: Arc<dyn MediaStore>,
    ) -> Self {
        Self { pages, tags, images, media }
    }

    pub fn media(&self) -> &dyn MediaStore {
        self.media.as_ref()
    }

    // ── Tree ────────────────────────────────────────────────────────────────

    pub async fn get_page(&self, id: PageId) -> Result<Page> {
        self.pages
            .get_page(id)
            .await?
            .ok_or_else(|| AppError::not_found("Page", id))
    }

    pub async fn children(&self, parent: Option<PageId>) -> Result<Vec<Page>> {
        self.pages.children(parent).await
    }

    /// Places a new page under `parent` (`None` = root).
    pub async fn create_page(&self, parent: Option<PageId>, mut page: Page) -> Result<Page> {
        page.validate()?;
        self.check_position(parent, &page).await?;
        self.check_feed_image(&page).await?;

        page.parent_id = parent;
        self.pages.insert_page(page.clone()).await?;
        log::info!("created {} {} ({}) under {:?}", page.page_type(), page.id, page.slug, parent);
        Ok(page)
    }

    /// Updates title, slug and type attributes. Position and publication
    /// state are kept from the stored page.
    pub async fn update_page(&self, page: Page) -> Result<Page> {
        let stored = self.get_page(page.id).await?;
        if stored.page_type() != page.page_type() {
            return Err(AppError::ValidationError(format!(
                "page {} is a {}, not a {}",
                page.id,
                stored.page_type(),
                page.page_type()
            )));
        }
        page.validate()?;
        self.check_feed_image(&page).await?;

        let updated = Page {
            parent_id: stored.parent_id,
            state: stored.state,
            created_at: stored.created_at,
            first_published_at: stored.first_published_at,
            last_published_at: stored.last_published_at,
            ..page
        };
        if updated.slug != stored.slug {
            self.check_slug(updated.parent_id, &updated.slug, Some(updated.id)).await?;
        }
        self.pages.update_page(updated.clone()).await?;
        log::info!("updated {} {}", updated.page_type(), updated.id);
        Ok(updated)
    }

    pub async fn move_page(&self, id: PageId, new_parent: Option<PageId>) -> Result<Page> {
        let mut page = self.get_page(id).await?;
        self.check_position(new_parent, &page).await?;

        // Parent types are strictly layered, so a page can never land inside its own subtree.
        page.parent_id = new_parent;
        self.pages.update_page(page.clone()).await?;
        log::info!("moved {} {} under {:?}", page.page_type(), id, new_parent);
        Ok(page)
    }

    /// Deletes the page, its descendants and all of their tag associations.
    pub async fn delete_page(&self, id: PageId) -> Result<Vec<PageId>> {
        let removed = self.pages.delete_page(id).await?;
        log::info!("deleted page {} and {} descendant(s)", id, removed.len().saturating_sub(1));
        Ok(removed)
    }

    /// Marks the page live. `first_published_at` is only set the first time.
    pub async fn publish(&self, id: PageId, at: DateTime<Utc>) -> Result<Page> {
        let mut page = self.get_page(id).await?;
        page.state = PublicationState::Live;
        page.first_published_at.get_or_insert(at);
        page.last_published_at = Some(at);
        self.pages.update_page(page.clone()).await?;
        log::info!("published {} {}", page.page_type(), id);
        Ok(page)
    }

    pub async fn unpublish(&self, id: PageId) -> Result<Page> {
        let mut page = self.get_page(id).await?;
        page.state = PublicationState::Draft;
        self.pages.update_page(page.clone()).await?;
        log::info!("unpublished {} {}", page.page_type(), id);
        Ok(page)
    }

    async fn check_position(&self, parent: Option<PageId>, page: &Page) -> Result<()> {
        let parent_type = match parent {
            Some(pid) => Some(self.get_page(pid).await?.page_type()),
            None => None,
        };
        if let Err(err) = check_placement(parent_type, page.page_type()) {
            log::warn!("rejected placement of {}: {}", page.id, err);
            return Err(err);
        }
        self.check_slug(parent, &page.slug, Some(page.id)).await
    }

    async fn check_slug(&self, parent: Option<PageId>, slug: &str, skip: Option<PageId>) -> Result<()> {
        let taken = self
            .pages
            .children(parent)
            .await?
            .iter()
            .any(|sibling| Some(sibling.id) != skip && sibling.slug == slug);
        if taken {
            return Err(AppError::Conflict(format!("slug '{slug}' is already in use")));
        }
        Ok(())
    }

    async fn check_feed_image(&self, page: &Page) -> Result<()> {
        if let PageKind::Article(article) = &page.kind {
            if self.images.get_image(article.feed_image).await?.is_none() {
                return Err(AppError::ValidationError(format!(
                    "feed_image {} does not exist",
                    article.feed_image
                )));
            }
        }
        Ok(())
    }

    // ── Tags ────────────────────────────────────────────────────────────────

    async fn tag_namespace(&self, page: PageId) -> Result<TagNamespace> {
        let page_type = self.get_page(page).await?.page_type();
        TagNamespace::for_page_type(page_type).inspect_err(|err| log::warn!("page {page}: {err}"))
    }

    pub async fn add_tag(&self, page: PageId, label: &str) -> Result<bool> {
        let ns = self.tag_namespace(page).await?;
        self.tags.add_tag(ns, page, label).await
    }

    pub async fn remove_tag(&self, page: PageId, label: &str) -> Result<bool> {
        let ns = self.tag_namespace(page).await?;
        self.tags.remove_tag(ns, page, label).await
    }

    pub async fn list_tags(&self, page: PageId) -> Result<Vec<String>> {
        let ns = self.tag_namespace(page).await?;
        self.tags.list_tags(ns, page).await
    }

    pub async fn set_tags<I, S>(&self, page: PageId, labels: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ns = self.tag_namespace(page).await?;
        let set = TagSet::from_labels(labels)?;
        self.tags.set_tags(ns, page, set).await
    }

    // ── Images ──────────────────────────────────────────────────────────────

    pub async fn add_image(&self, title: &str, data: Vec<u8>, content_type: &str) -> Result<Image> {
        if title.trim().is_empty() {
            return Err(AppError::ValidationError("title is required".into()));
        }
        let stored = self.media.save_upload(data, content_type).await?;
        let image = Image {
            id: Uuid::now_v7(),
            title: title.trim().to_string(),
            file: stored.file,
            width: stored.width,
            height: stored.height,
            created_at: Utc::now(),
        };
        self.images.insert_image(image.clone()).await?;
        log::info!("added image {} ({}x{})", image.id, image.width, image.height);
        Ok(image)
    }

    pub async fn get_image(&self, id: ImageId) -> Result<Image> {
        self.images
            .get_image(id)
            .await?
            .ok_or_else(|| AppError::not_found("Image", id))
    }

    /// Refused with `ReferentialRestriction` while any article uses the image
    /// as its feed image; nothing is touched in that case.
    pub async fn delete_image(&self, id: ImageId) -> Result<()> {
        let image = match self.images.delete_image(id).await {
            Ok(image) => image,
            Err(err) => {
                log::warn!("refused to delete image {id}: {err}");
                return Err(err);
            }
        };
        // The row is gone at this point; file cleanup failures are only logged.
        // Files are content-addressed, so another image row may still use this one.
        match self.images.file_in_use(&image.file).await {
            Ok(true) => log::debug!("file {} still in use, keeping it", image.file),
            Ok(false) => {
                if let Err(err) = self.media.remove(&image.file).await {
                    log::error!("image {id} deleted but file {} was not removed: {err}", image.file);
                }
            }
            Err(err) => {
                log::error!("image {id} deleted but usage of file {} is unknown: {err}", image.file);
            }
        }
        log::info!("deleted image {id}");
        Ok(())
    }

    // ── Feed & contexts ─────────────────────────────────────────────────────

    pub async fn feed(&self, query: FeedQuery) -> Result<Vec<FeedEntry>> {
        self.pages.live_articles(query).await
    }

    pub async fn tops(&self) -> Result<Vec<FeedEntry>> {
        self.feed(FeedQuery::top(TOPS_LEN)).await
    }

    /// Builds the rendering context for a page. Read only.
    pub async fn context(&self, id: PageId) -> Result<PageContext> {
        let page = self.get_page(id).await?;
        log::debug!("building context for {} {}", page.page_type(), id);
        Ok(match page.kind {
            PageKind::Home(_) => {
                let tags = self.tags.list_tags(TagNamespace::Home, id).await?;
                let tops = self.tops().await?;
                PageContext::Home(HomeContext { page, tags, tops })
            }
            PageKind::Category(_) => {
                let tops = self.tops().await?;
                PageContext::Category(CategoryContext { page, tops })
            }
            PageKind::Article(_) => {
                let tags = self.tags.list_tags(TagNamespace::Article, id).await?;
                // One query so tops and feed come from the same snapshot.
                let feed = self.feed(FeedQuery::all()).await?;
                let tops = feed.iter().take(TOPS_LEN).cloned().collect();
                PageContext::Article(ArticleContext { page, tags, tops, feed })
            }
        })
    }
}
