//! Mapping between SQLite rows and pt-core models.

use chrono::{DateTime, Utc};
use pt_core::error::{AppError, Result};
use pt_core::models::{
    BaseArticlePage, CategoryPage, HomePage, Image, Page, PageKind, PromoteBoost, PublicationState,
};
use pt_core::{PageType, StreamBody, TagNamespace};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

/// Page columns, shared by every query that loads pages.
pub(crate) const PAGE_COLUMNS: &str = "p.id, p.parent_id, p.page_type, p.title, p.slug, p.live, \
     p.created_at, p.first_published_at, p.last_published_at, \
     c.name AS category_name, a.intro, a.banner, a.body, a.feed_image_id, a.promote_boost";

pub(crate) const PAGE_JOINS: &str = "FROM pages p \
     LEFT JOIN category_pages c ON c.page_id = p.id \
     LEFT JOIN article_pages a ON a.page_id = p.id";

/// Image columns as aliased by the feed query.
pub(crate) const FEED_IMAGE_COLUMNS: &str = "i.id AS image_id, i.title AS image_title, \
     i.file AS image_file, i.width AS image_width, i.height AS image_height, \
     i.created_at AS image_created_at";

pub(crate) fn db_err(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_check_violation() {
            return AppError::ValidationError(db.message().to_string());
        }
        if db.is_unique_violation() || db.is_foreign_key_violation() {
            return AppError::Conflict(db.message().to_string());
        }
    }
    AppError::Internal(err.to_string())
}

// Helper for UUID conversion
pub(crate) fn uuid_to_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

pub(crate) fn blob_to_uuid(blob: &[u8]) -> Result<Uuid> {
    Uuid::from_slice(blob).map_err(|e| AppError::Internal(format!("corrupt id column: {e}")))
}

const NANOS: i64 = 1_000_000_000;

pub(crate) fn time_to_int(t: DateTime<Utc>) -> i64 {
    t.timestamp()
        .saturating_mul(NANOS)
        .saturating_add(i64::from(t.timestamp_subsec_nanos()))
}

pub(crate) fn int_to_time(v: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(v.div_euclid(NANOS), v.rem_euclid(NANOS) as u32)
        .ok_or_else(|| AppError::Internal(format!("timestamp {v} out of range")))
}

pub(crate) fn tag_table(ns: TagNamespace) -> &'static str {
    match ns {
        TagNamespace::Home => "home_page_tags",
        TagNamespace::Article => "article_page_tags",
    }
}

/// The per-type table that owns the join rows of a namespace.
pub(crate) fn owner_table(ns: TagNamespace) -> &'static str {
    match ns {
        TagNamespace::Home => "home_pages",
        TagNamespace::Article => "article_pages",
    }
}

fn get<'r, T>(row: &'r SqliteRow, column: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column).map_err(db_err)
}

fn opt_time(row: &SqliteRow, column: &str) -> Result<Option<DateTime<Utc>>> {
    get::<Option<i64>>(row, column)?.map(int_to_time).transpose()
}

pub(crate) fn row_to_page(row: &SqliteRow) -> Result<Page> {
    let page_type: PageType = get::<String>(row, "page_type")?.parse()?;
    let kind = match page_type {
        PageType::Home => PageKind::Home(HomePage {}),
        PageType::Category => PageKind::Category(CategoryPage {
            name: get(row, "category_name")?,
        }),
        PageType::Article => PageKind::Article(BaseArticlePage {
            intro: get(row, "intro")?,
            banner: get(row, "banner")?,
            body: StreamBody::from_json(&get::<String>(row, "body")?)?,
            feed_image: blob_to_uuid(&get::<Vec<u8>>(row, "feed_image_id")?)?,
            promote_boost: PromoteBoost::try_from(get::<i64>(row, "promote_boost")?)?,
        }),
    };

    Ok(Page {
        id: blob_to_uuid(&get::<Vec<u8>>(row, "id")?)?,
        parent_id: get::<Option<Vec<u8>>>(row, "parent_id")?
            .map(|b| blob_to_uuid(&b))
            .transpose()?,
        title: get(row, "title")?,
        slug: get(row, "slug")?,
        state: if get::<bool>(row, "live")? {
            PublicationState::Live
        } else {
            PublicationState::Draft
        },
        created_at: int_to_time(get(row, "created_at")?)?,
        first_published_at: opt_time(row, "first_published_at")?,
        last_published_at: opt_time(row, "last_published_at")?,
        kind,
    })
}

/// Reads an image from `prefix`ed columns (`""` for the images table itself,
/// `"image_"` for the feed join).
pub(crate) fn row_to_image(row: &SqliteRow, prefix: &str) -> Result<Image> {
    let col = |name: &str| format!("{prefix}{name}");
    Ok(Image {
        id: blob_to_uuid(&get::<Vec<u8>>(row, &col("id"))?)?,
        title: get(row, &col("title"))?,
        file: get(row, &col("file"))?,
        width: u32::try_from(get::<i64>(row, &col("width"))?)
            .map_err(|e| AppError::Internal(e.to_string()))?,
        height: u32::try_from(get::<i64>(row, &col("height"))?)
            .map_err(|e| AppError::Internal(e.to_string()))?,
        created_at: int_to_time(get(row, &col("created_at"))?)?,
    })
}
