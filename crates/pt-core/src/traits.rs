//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.
//! Implementations own atomicity: a page delete and its tag rows disappear
//! together, and an image delete either fully happens or changes nothing.

use async_trait::async_trait;

use crate::error::Result;
use crate::feed::{FeedEntry, FeedQuery};
use crate::models::{Image, ImageId, Page, PageId};
use crate::tags::{TagNamespace, TagSet};

/// Persistence contract for page tree nodes.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PageRepo: Send + Sync {
    async fn insert_page(&self, page: Page) -> Result<()>;
    async fn get_page(&self, id: PageId) -> Result<Option<Page>>;
    /// Replaces the stored row. `NotFound` if the page does not exist.
    async fn update_page(&self, page: Page) -> Result<()>;
    /// Deletes the page and its whole subtree together with their tag rows.
    /// Returns the ids that were removed.
    async fn delete_page(&self, id: PageId) -> Result<Vec<PageId>>;
    /// Direct children of `parent` (`None` = pages under the root).
    async fn children(&self, parent: Option<PageId>) -> Result<Vec<Page>>;

    /// Live articles in feed order with their feed image joined.
    async fn live_articles(&self, query: FeedQuery) -> Result<Vec<FeedEntry>>;
}

/// Tag association contract, keyed by (namespace, page, label).
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TagRepo: Send + Sync {
    /// Returns `false` if a case variant of the label was already attached.
    async fn add_tag(&self, ns: TagNamespace, page: PageId, label: &str) -> Result<bool>;
    async fn remove_tag(&self, ns: TagNamespace, page: PageId, label: &str) -> Result<bool>;
    async fn list_tags(&self, ns: TagNamespace, page: PageId) -> Result<Vec<String>>;
    /// Replaces the page's whole tag set.
    async fn set_tags(&self, ns: TagNamespace, page: PageId, tags: TagSet) -> Result<()>;
}

/// Image asset records and the feed_image delete restriction.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ImageRepo: Send + Sync {
    async fn insert_image(&self, image: Image) -> Result<()>;
    async fn get_image(&self, id: ImageId) -> Result<Option<Image>>;
    /// Articles whose feed_image points at `id`.
    async fn image_references(&self, id: ImageId) -> Result<Vec<PageId>>;
    /// Fails with `ReferentialRestriction` while any article references the image.
    async fn delete_image(&self, id: ImageId) -> Result<Image>;
    /// True when some image row still points at the stored file.
    async fn file_in_use(&self, file: &str) -> Result<bool>;
}

/// What the media store reports back for a saved upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Key to pass back to the store (e.g. a content hash)
    pub file: String,
    pub width: u32,
    pub height: u32,
}

/// Image file storage contract for uploads and thumbnails.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Saves raw bytes and returns the key recorded on the `Image` row.
    async fn save_upload(&self, data: Vec<u8>, content_type: &str) -> Result<StoredFile>;
    /// Returns the URL or path to the original file.
    async fn get_url(&self, file: &str) -> String;
    /// Returns the URL or path to the thumbnail rendition.
    async fn get_thumbnail_url(&self, file: &str) -> String;
    /// Removes the original and its renditions.
    async fn remove(&self, file: &str) -> Result<()>;
}
