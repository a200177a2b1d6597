//! # pt-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `pt-core` domain models. Tag rows and subtrees are removed by
//! foreign-key cascades; `feed_image` references are `ON DELETE RESTRICT`.

mod images;
mod rows;
mod tags;

use std::str::FromStr;

use async_trait::async_trait;
use pt_core::error::{AppError, Result};
use pt_core::feed::{FeedEntry, FeedQuery};
use pt_core::models::{Page, PageId, PageKind};
use pt_core::traits::PageRepo;
use pt_core::TagNamespace;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Row, Sqlite, Transaction};

use crate::rows::{
    blob_to_uuid, db_err, row_to_image, row_to_page, tag_table, time_to_int, uuid_to_blob,
    FEED_IMAGE_COLUMNS, PAGE_COLUMNS, PAGE_JOINS,
};

const SCHEMA: &str = include_str!("../migrations/0001_page_tree.sql");

pub struct SqlitePageStore {
    pool: SqlitePool,
}

impl SqlitePageStore {
    /// Opens (or creates) the database at `url` and applies the schema.
    ///
    /// In-memory databases are private to a connection, so the pool is
    /// pinned to a single connection that is never recycled.
    pub async fn new(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(db_err)?
            .create_if_missing(true)
            .foreign_keys(true);
        let in_memory = url.contains(":memory:");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 8 })
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        let store = Self { pool };
        store.migrate().await?;
        log::info!("sqlite page store ready at {url}");
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await.map_err(db_err)?;
        Ok(())
    }

    /// Number of join rows in a namespace, across all pages.
    pub async fn tag_row_count(&self, ns: TagNamespace) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) AS n FROM {}", tag_table(ns));
        let row = sqlx::query(&sql).fetch_one(&self.pool).await.map_err(db_err)?;
        row.try_get("n").map_err(db_err)
    }

    async fn write_kind(tx: &mut Transaction<'_, Sqlite>, page: &Page, insert: bool) -> Result<()> {
        let id = uuid_to_blob(page.id);
        match &page.kind {
            PageKind::Home(_) => {
                if insert {
                    sqlx::query("INSERT INTO home_pages (page_id) VALUES (?)")
                        .bind(id)
                        .execute(&mut **tx)
                        .await
                        .map_err(db_err)?;
                }
            }
            PageKind::Category(c) => {
                let sql = if insert {
                    "INSERT INTO category_pages (name, page_id) VALUES (?, ?)"
                } else {
                    "UPDATE category_pages SET name = ? WHERE page_id = ?"
                };
                sqlx::query(sql)
                    .bind(&c.name)
                    .bind(id)
                    .execute(&mut **tx)
                    .await
                    .map_err(db_err)?;
            }
            PageKind::Article(a) => {
                let sql = if insert {
                    "INSERT INTO article_pages (intro, banner, body, feed_image_id, promote_boost, page_id) \
                     VALUES (?, ?, ?, ?, ?, ?)"
                } else {
                    "UPDATE article_pages SET intro = ?, banner = ?, body = ?, feed_image_id = ?, \
                     promote_boost = ? WHERE page_id = ?"
                };
                sqlx::query(sql)
                    .bind(&a.intro)
                    .bind(&a.banner)
                    .bind(a.body.to_json()?)
                    .bind(uuid_to_blob(a.feed_image))
                    .bind(i64::from(a.promote_boost.code()))
                    .bind(id)
                    .execute(&mut **tx)
                    .await
                    .map_err(db_err)?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PageRepo for SqlitePageStore {
    /// Inserts the tree row and the per-type attribute row in one transaction.
    async fn insert_page(&self, page: Page) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            "INSERT INTO pages (id, parent_id, page_type, title, slug, live, created_at, \
             first_published_at, last_published_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(page.id))
        .bind(page.parent_id.map(uuid_to_blob))
        .bind(page.page_type().name())
        .bind(&page.title)
        .bind(&page.slug)
        .bind(page.is_live())
        .bind(time_to_int(page.created_at))
        .bind(page.first_published_at.map(time_to_int))
        .bind(page.last_published_at.map(time_to_int))
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        Self::write_kind(&mut tx, &page, true).await?;

        tx.commit().await.map_err(db_err)?;
        log::debug!("inserted page {}", page.id);
        Ok(())
    }

    async fn get_page(&self, id: PageId) -> Result<Option<Page>> {
        let sql = format!("SELECT {PAGE_COLUMNS} {PAGE_JOINS} WHERE p.id = ?");
        let row = sqlx::query(&sql)
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_page).transpose()
    }

    async fn update_page(&self, page: Page) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let updated = sqlx::query(
            "UPDATE pages SET parent_id = ?, title = ?, slug = ?, live = ?, \
             first_published_at = ?, last_published_at = ? WHERE id = ?",
        )
        .bind(page.parent_id.map(uuid_to_blob))
        .bind(&page.title)
        .bind(&page.slug)
        .bind(page.is_live())
        .bind(page.first_published_at.map(time_to_int))
        .bind(page.last_published_at.map(time_to_int))
        .bind(uuid_to_blob(page.id))
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        if updated.rows_affected() == 0 {
            return Err(AppError::not_found("Page", page.id));
        }

        Self::write_kind(&mut tx, &page, false).await?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    /// Collects the subtree first so the caller learns what went away; the
    /// delete itself relies on `ON DELETE CASCADE` for descendants and tags.
    async fn delete_page(&self, id: PageId) -> Result<Vec<PageId>> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let removed = sqlx::query(
            "WITH RECURSIVE subtree(id) AS ( \
                 SELECT id FROM pages WHERE id = ? \
                 UNION ALL \
                 SELECT p.id FROM pages p JOIN subtree s ON p.parent_id = s.id \
             ) SELECT id FROM subtree",
        )
        .bind(uuid_to_blob(id))
        .fetch_all(&mut *tx)
        .await
        .map_err(db_err)?
        .iter()
        .map(|row| {
            row.try_get::<Vec<u8>, _>("id")
                .map_err(db_err)
                .and_then(|b| blob_to_uuid(&b))
        })
        .collect::<Result<Vec<_>>>()?;

        if removed.is_empty() {
            return Err(AppError::not_found("Page", id));
        }

        sqlx::query("DELETE FROM pages WHERE id = ?")
            .bind(uuid_to_blob(id))
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(removed)
    }

    async fn children(&self, parent: Option<PageId>) -> Result<Vec<Page>> {
        // `IS` matches NULL against NULL for pages under the root.
        let sql = format!("SELECT {PAGE_COLUMNS} {PAGE_JOINS} WHERE p.parent_id IS ? ORDER BY p.id");
        sqlx::query(&sql)
            .bind(parent.map(uuid_to_blob))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?
            .iter()
            .map(row_to_page)
            .collect()
    }

    /// Single statement, so the pages and their joined images come from one snapshot.
    async fn live_articles(&self, query: FeedQuery) -> Result<Vec<FeedEntry>> {
        let sql = format!(
            "SELECT {PAGE_COLUMNS}, {FEED_IMAGE_COLUMNS} {PAGE_JOINS} \
             JOIN images i ON i.id = a.feed_image_id \
             WHERE p.live = 1 AND p.page_type = 'BaseArticlePage' \
             ORDER BY p.first_published_at IS NULL, p.first_published_at DESC, p.id ASC \
             LIMIT ?"
        );
        // A negative LIMIT means no limit in SQLite.
        let limit = query
            .limit
            .map(|n| i64::try_from(n).unwrap_or(i64::MAX))
            .unwrap_or(-1);

        sqlx::query(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?
            .iter()
            .map(|row| {
                Ok(FeedEntry {
                    page: row_to_page(row)?,
                    feed_image: row_to_image(row, "image_")?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use pt_core::models::{BaseArticlePage, CategoryPage, HomePage, Image, PromoteBoost};
    use pt_core::stream::{Block, StreamBody};
    use pt_core::traits::{ImageRepo, TagRepo};
    use pt_core::TagSet;
    use uuid::Uuid;

    async fn store() -> SqlitePageStore {
        SqlitePageStore::new("sqlite::memory:").await.unwrap()
    }

    async fn seed_image(repo: &SqlitePageStore) -> Image {
        let image = Image {
            id: Uuid::now_v7(),
            title: "cover".into(),
            file: format!("hash-{}", Uuid::now_v7()),
            width: 800,
            height: 600,
            created_at: Utc::now(),
        };
        repo.insert_image(image.clone()).await.unwrap();
        image
    }

    fn article(parent: PageId, slug: &str, image: &Image) -> Page {
        let mut page = Page::new(
            slug.to_uppercase(),
            slug,
            PageKind::Article(BaseArticlePage {
                intro: "intro".into(),
                banner: "<p>banner</p>".into(),
                body: StreamBody::new(vec![
                    Block::Embed("https://youtu.be/1".into()),
                    Block::Text("<p>t</p>".into()),
                    Block::Html("<iframe></iframe>".into()),
                    Block::Image(image.id),
                ]),
                feed_image: image.id,
                promote_boost: PromoteBoost::Standout,
            }),
        );
        page.parent_id = Some(parent);
        page
    }

    /// home -> category, returns the category id
    async fn seed_tree(repo: &SqlitePageStore) -> (PageId, PageId) {
        let home = Page::new("Home", "home", PageKind::Home(HomePage {}));
        let mut cat = Page::new("News", "news", PageKind::Category(CategoryPage { name: "News".into() }));
        cat.parent_id = Some(home.id);
        let ids = (home.id, cat.id);
        repo.insert_page(home).await.unwrap();
        repo.insert_page(cat).await.unwrap();
        ids
    }

    #[tokio::test]
    async fn test_article_round_trips_exactly() {
        let repo = store().await;
        let image = seed_image(&repo).await;
        let (_, cat) = seed_tree(&repo).await;
        let mut page = article(cat, "a1", &image);
        page.first_published_at = Some(Utc.timestamp_opt(1_700_000_000, 987_654_321).unwrap());

        repo.insert_page(page.clone()).await.expect("Failed to insert article");
        let loaded = repo.get_page(page.id).await.unwrap().unwrap();
        assert_eq!(loaded, page);

        let kinds: Vec<_> = loaded.as_article().unwrap().body.blocks().iter().map(Block::kind).collect();
        assert_eq!(kinds, ["embed", "text", "html", "image"]);
    }

    #[tokio::test]
    async fn test_children_of_root_and_category() {
        let repo = store().await;
        let image = seed_image(&repo).await;
        let (home, cat) = seed_tree(&repo).await;
        repo.insert_page(article(cat, "a1", &image)).await.unwrap();
        repo.insert_page(article(cat, "a2", &image)).await.unwrap();

        let roots = repo.children(None).await.unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id, home);
        assert_eq!(repo.children(Some(cat)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_category_name_limit_is_enforced_by_schema() {
        let repo = store().await;
        let (home, _) = seed_tree(&repo).await;
        let mut cat = Page::new("Long", "long", PageKind::Category(CategoryPage { name: "n".repeat(33) }));
        cat.parent_id = Some(home);
        assert!(matches!(repo.insert_page(cat).await, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_sibling_slugs_are_unique_in_schema() {
        let repo = store().await;
        let image = seed_image(&repo).await;
        let (home, cat) = seed_tree(&repo).await;

        let mut twin = Page::new("News again", "news", PageKind::Category(CategoryPage { name: "News".into() }));
        twin.parent_id = Some(home);
        assert!(matches!(repo.insert_page(twin).await, Err(AppError::Conflict(_))));
        assert_eq!(repo.children(Some(home)).await.unwrap().len(), 1);

        // Root pages collide with each other too.
        let second_home = Page::new("Home", "home", PageKind::Home(HomePage {}));
        assert!(matches!(repo.insert_page(second_home).await, Err(AppError::Conflict(_))));

        // Same slug under another parent is fine.
        repo.insert_page(article(cat, "news", &image)).await.unwrap();

        let mut a2 = article(cat, "a2", &image);
        repo.insert_page(a2.clone()).await.unwrap();
        a2.slug = "news".into();
        assert!(matches!(repo.update_page(a2.clone()).await, Err(AppError::Conflict(_))));
        assert_eq!(repo.get_page(a2.id).await.unwrap().unwrap().slug, "a2");
    }

    #[tokio::test]
    async fn test_delete_cascades_subtree_and_tags() {
        let repo = store().await;
        let image = seed_image(&repo).await;
        let (home, cat) = seed_tree(&repo).await;
        let a1 = article(cat, "a1", &image);
        let a1_id = a1.id;
        repo.insert_page(a1).await.unwrap();
        repo.set_tags(TagNamespace::Article, a1_id, TagSet::from_labels(["x", "y"]).unwrap())
            .await
            .unwrap();
        repo.add_tag(TagNamespace::Home, home, "front").await.unwrap();

        let removed = repo.delete_page(cat).await.unwrap();
        assert_eq!(removed.len(), 2);
        assert!(removed.contains(&a1_id));
        assert!(repo.get_page(a1_id).await.unwrap().is_none());
        assert_eq!(repo.tag_row_count(TagNamespace::Article).await.unwrap(), 0);
        assert_eq!(repo.tag_row_count(TagNamespace::Home).await.unwrap(), 1);
        assert!(repo.image_references(image.id).await.unwrap().is_empty());

        assert!(matches!(repo.delete_page(cat).await, Err(AppError::NotFound(..))));
    }

    #[tokio::test]
    async fn test_feed_orders_and_limits() {
        let repo = store().await;
        let image = seed_image(&repo).await;
        let (_, cat) = seed_tree(&repo).await;
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();

        let mut expected = Vec::new();
        for (i, minutes) in [30, 10, 50, 40, 20].into_iter().enumerate() {
            let mut page = article(cat, &format!("a{i}"), &image);
            page.state = pt_core::PublicationState::Live;
            page.first_published_at = Some(base + Duration::minutes(minutes));
            expected.push((minutes, page.id));
            repo.insert_page(page).await.unwrap();
        }
        repo.insert_page(article(cat, "draft", &image)).await.unwrap();
        expected.sort_by(|a, b| b.0.cmp(&a.0));
        let expected: Vec<_> = expected.into_iter().map(|(_, id)| id).collect();

        let feed = repo.live_articles(FeedQuery::all()).await.unwrap();
        let ids: Vec<_> = feed.iter().map(|e| e.page.id).collect();
        assert_eq!(ids, expected);
        assert!(feed.iter().all(|e| e.feed_image == image));

        let tops = repo.live_articles(FeedQuery::top(3)).await.unwrap();
        assert_eq!(tops.len(), 3);
        assert_eq!(tops.iter().map(|e| e.page.id).collect::<Vec<_>>(), expected[..3]);

        assert_eq!(repo.live_articles(FeedQuery::all()).await.unwrap(), feed);
    }

    #[tokio::test]
    async fn test_feed_ties_break_by_id() {
        let repo = store().await;
        let image = seed_image(&repo).await;
        let (_, cat) = seed_tree(&repo).await;
        let when = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();

        let mut ids = Vec::new();
        for i in 0..3 {
            let mut page = article(cat, &format!("t{i}"), &image);
            page.state = pt_core::PublicationState::Live;
            page.first_published_at = Some(when);
            ids.push(page.id);
            repo.insert_page(page).await.unwrap();
        }
        ids.sort();
        let feed: Vec<_> = repo
            .live_articles(FeedQuery::all())
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.page.id)
            .collect();
        assert_eq!(feed, ids);
    }

    #[tokio::test]
    async fn test_empty_feed() {
        let repo = store().await;
        assert!(repo.live_articles(FeedQuery::top(3)).await.unwrap().is_empty());
    }
}
