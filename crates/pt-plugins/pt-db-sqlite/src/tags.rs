//! `TagRepo` for SQLite. One label table shared by namespaces (keyed by
//! namespace), one join table per owning page type.

use async_trait::async_trait;
use pt_core::error::{AppError, Result};
use pt_core::models::PageId;
use pt_core::tags::{label_key, normalize_label, TagNamespace, TagSet};
use pt_core::traits::TagRepo;
use sqlx::{Row, SqliteConnection};

use crate::rows::{db_err, owner_table, tag_table, uuid_to_blob};
use crate::SqlitePageStore;

async fn ensure_owner(conn: &mut SqliteConnection, ns: TagNamespace, page: PageId) -> Result<()> {
    let sql = format!("SELECT 1 FROM {} WHERE page_id = ?", owner_table(ns));
    let found = sqlx::query(&sql)
        .bind(uuid_to_blob(page))
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_err)?;
    match found {
        Some(_) => Ok(()),
        None => Err(AppError::not_found("Page", page)),
    }
}

/// Returns the label id, creating the label with this spelling if it is new.
async fn upsert_label(conn: &mut SqliteConnection, ns: TagNamespace, label: &str) -> Result<i64> {
    let key = label_key(label);
    sqlx::query(
        "INSERT INTO tags (namespace, name, name_key) VALUES (?, ?, ?) \
         ON CONFLICT (namespace, name_key) DO NOTHING",
    )
    .bind(ns.as_str())
    .bind(label)
    .bind(&key)
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;

    let row = sqlx::query("SELECT id FROM tags WHERE namespace = ? AND name_key = ?")
        .bind(ns.as_str())
        .bind(&key)
        .fetch_one(&mut *conn)
        .await
        .map_err(db_err)?;
    row.try_get("id").map_err(db_err)
}

async fn attach(conn: &mut SqliteConnection, ns: TagNamespace, page: PageId, label: &str) -> Result<bool> {
    let tag_id = upsert_label(conn, ns, label).await?;
    let sql = format!("INSERT OR IGNORE INTO {} (page_id, tag_id) VALUES (?, ?)", tag_table(ns));
    let done = sqlx::query(&sql)
        .bind(uuid_to_blob(page))
        .bind(tag_id)
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;
    Ok(done.rows_affected() == 1)
}

#[async_trait]
impl TagRepo for SqlitePageStore {
    async fn add_tag(&self, ns: TagNamespace, page: PageId, label: &str) -> Result<bool> {
        let label = normalize_label(label)?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        ensure_owner(&mut tx, ns, page).await?;
        let added = attach(&mut tx, ns, page, &label).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(added)
    }

    async fn remove_tag(&self, ns: TagNamespace, page: PageId, label: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        ensure_owner(&mut tx, ns, page).await?;
        let sql = format!(
            "DELETE FROM {} WHERE page_id = ? AND tag_id IN \
             (SELECT id FROM tags WHERE namespace = ? AND name_key = ?)",
            tag_table(ns)
        );
        let done = sqlx::query(&sql)
            .bind(uuid_to_blob(page))
            .bind(ns.as_str())
            .bind(label_key(label))
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(done.rows_affected() > 0)
    }

    async fn list_tags(&self, ns: TagNamespace, page: PageId) -> Result<Vec<String>> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        ensure_owner(&mut conn, ns, page).await?;
        let sql = format!(
            "SELECT t.name FROM {} jt JOIN tags t ON t.id = jt.tag_id \
             WHERE jt.page_id = ? ORDER BY t.name_key",
            tag_table(ns)
        );
        sqlx::query(&sql)
            .bind(uuid_to_blob(page))
            .fetch_all(&mut *conn)
            .await
            .map_err(db_err)?
            .iter()
            .map(|row| row.try_get("name").map_err(db_err))
            .collect()
    }

    async fn set_tags(&self, ns: TagNamespace, page: PageId, tags: TagSet) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        ensure_owner(&mut tx, ns, page).await?;
        let sql = format!("DELETE FROM {} WHERE page_id = ?", tag_table(ns));
        sqlx::query(&sql)
            .bind(uuid_to_blob(page))
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        for label in tags.iter() {
            attach(&mut tx, ns, page, label).await?;
        }
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pt_core::models::{HomePage, Page, PageKind};
    use pt_core::traits::PageRepo;

    async fn home_page(repo: &SqlitePageStore) -> PageId {
        let home = Page::new("Home", "home", PageKind::Home(HomePage {}));
        let id = home.id;
        repo.insert_page(home).await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_case_variants_share_one_row() {
        let repo = SqlitePageStore::new("sqlite::memory:").await.unwrap();
        let home = home_page(&repo).await;

        assert!(repo.add_tag(TagNamespace::Home, home, "x").await.unwrap());
        assert!(!repo.add_tag(TagNamespace::Home, home, "X").await.unwrap());
        assert_eq!(repo.list_tags(TagNamespace::Home, home).await.unwrap(), vec!["x"]);

        assert!(repo.remove_tag(TagNamespace::Home, home, "X").await.unwrap());
        assert!(repo.list_tags(TagNamespace::Home, home).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_namespace_is_not_found() {
        let repo = SqlitePageStore::new("sqlite::memory:").await.unwrap();
        let home = home_page(&repo).await;
        assert!(matches!(
            repo.add_tag(TagNamespace::Article, home, "x").await,
            Err(AppError::NotFound(..))
        ));
    }

    #[tokio::test]
    async fn test_set_tags_replaces_rows() {
        let repo = SqlitePageStore::new("sqlite::memory:").await.unwrap();
        let home = home_page(&repo).await;
        let first = TagSet::from_labels(["a", "b"]).unwrap();
        let second = TagSet::from_labels(["b", "c"]).unwrap();
        repo.set_tags(TagNamespace::Home, home, first).await.unwrap();
        repo.set_tags(TagNamespace::Home, home, second).await.unwrap();
        assert_eq!(repo.list_tags(TagNamespace::Home, home).await.unwrap(), vec!["b", "c"]);
        assert_eq!(repo.tag_row_count(TagNamespace::Home).await.unwrap(), 2);
    }
}
