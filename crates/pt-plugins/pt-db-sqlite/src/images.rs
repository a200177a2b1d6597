//! `ImageRepo` for SQLite, including the feed_image delete restriction.

use async_trait::async_trait;
use pt_core::error::{AppError, Result};
use pt_core::models::{Image, ImageId, PageId};
use pt_core::traits::ImageRepo;
use sqlx::{Row, SqliteConnection};

use crate::rows::{blob_to_uuid, db_err, row_to_image, time_to_int, uuid_to_blob};
use crate::SqlitePageStore;

async fn references(conn: &mut SqliteConnection, id: ImageId) -> Result<Vec<PageId>> {
    sqlx::query("SELECT page_id FROM article_pages WHERE feed_image_id = ? ORDER BY page_id")
        .bind(uuid_to_blob(id))
        .fetch_all(&mut *conn)
        .await
        .map_err(db_err)?
        .iter()
        .map(|row| {
            row.try_get::<Vec<u8>, _>("page_id")
                .map_err(db_err)
                .and_then(|b| blob_to_uuid(&b))
        })
        .collect()
}

#[async_trait]
impl ImageRepo for SqlitePageStore {
    async fn insert_image(&self, image: Image) -> Result<()> {
        sqlx::query(
            "INSERT INTO images (id, title, file, width, height, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(image.id))
        .bind(&image.title)
        .bind(&image.file)
        .bind(i64::from(image.width))
        .bind(i64::from(image.height))
        .bind(time_to_int(image.created_at))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_image(&self, id: ImageId) -> Result<Option<Image>> {
        let row = sqlx::query("SELECT * FROM images WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(|r| row_to_image(r, "")).transpose()
    }

    async fn image_references(&self, id: ImageId) -> Result<Vec<PageId>> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        references(&mut conn, id).await
    }

    /// Checks references and deletes inside one transaction. The schema's
    /// `ON DELETE RESTRICT` backs the check up.
    async fn delete_image(&self, id: ImageId) -> Result<Image> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let referenced_by = references(&mut tx, id).await?;
        if !referenced_by.is_empty() {
            return Err(AppError::ReferentialRestriction { image: id, referenced_by });
        }

        let image = match sqlx::query("SELECT * FROM images WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?
        {
            Some(row) => row_to_image(&row, "")?,
            None => return Err(AppError::not_found("Image", id)),
        };

        if let Err(err) = sqlx::query("DELETE FROM images WHERE id = ?")
            .bind(uuid_to_blob(id))
            .execute(&mut *tx)
            .await
        {
            if matches!(&err, sqlx::Error::Database(db) if db.is_foreign_key_violation()) {
                return Err(AppError::ReferentialRestriction { image: id, referenced_by: Vec::new() });
            }
            return Err(db_err(err));
        }

        tx.commit().await.map_err(db_err)?;
        Ok(image)
    }

    async fn file_in_use(&self, file: &str) -> Result<bool> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM images WHERE file = ?) AS used")
            .bind(file)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        row.try_get("used").map_err(db_err)
    }
}
