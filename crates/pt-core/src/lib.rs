//! pagetree/crates/pt-core/src/lib.rs
//!
//! The central domain logic and interface definitions for the page tree:
//! typed pages, placement rules, tag associations and the recent-articles feed.

pub mod context;
pub mod error;
pub mod feed;
pub mod hierarchy;
pub mod memory;
pub mod models;
pub mod service;
pub mod stream;
pub mod tags;
pub mod traits;

// Re-exporting for easier access in other crates
pub use context::*;
pub use error::*;
pub use feed::*;
pub use hierarchy::*;
pub use models::*;
pub use service::PageService;
pub use stream::*;
pub use tags::*;
pub use traits::*;

#[cfg(test)]
mod tests {
    use super::models::*;
    use super::stream::StreamBody;
    use uuid::Uuid;

    #[test]
    fn test_article_creation_v7() {
        let page = Page::new(
            "Hello Rust!",
            "hello-rust",
            PageKind::Article(BaseArticlePage {
                intro: "intro".to_string(),
                banner: "<p>banner</p>".to_string(),
                body: StreamBody::default(),
                feed_image: Uuid::now_v7(),
                promote_boost: PromoteBoost::default(),
            }),
        );
        assert_eq!(page.page_type(), crate::PageType::Article);
        assert!(!page.is_live());
        assert!(page.validate().is_ok());
    }

    #[test]
    fn test_page_serializes_type_tag() {
        let page = Page::new("News", "news", PageKind::Category(CategoryPage { name: "News".into() }));
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["kind"]["page_type"], "CategoryPage");
        assert_eq!(value["state"], "draft");
        let back: Page = serde_json::from_value(value).unwrap();
        assert_eq!(back, page);
    }

    #[test]
    fn test_promote_boost_codes() {
        assert_eq!(PromoteBoost::try_from(2i64), Ok(PromoteBoost::Promote));
        assert_eq!(PromoteBoost::Advertise.code(), 3);
        assert_eq!(PromoteBoost::Standout.label(), "standout");
        assert!(PromoteBoost::try_from(4i64).is_err());
    }

    #[test]
    fn test_slug_characters() {
        let mut page = Page::new("Home", "home page", PageKind::Home(HomePage {}));
        assert!(page.validate().is_err());
        page.slug = "home_page-2".into();
        assert!(page.validate().is_ok());
        page.title = String::new();
        assert!(page.validate().is_err());
    }
}
