//! # pt-api Handlers
//!
//! This module coordinates the flow between HTTP requests and `PageService`.

use std::fmt;

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use pt_core::{AppError, FeedQuery, Image, PageService};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// State shared across all Actix-web workers.
pub struct AppState {
    pub service: PageService,
}

/// Wraps `AppError` so it can be turned into an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_)
            | AppError::PlacementViolation { .. }
            | AppError::UnsupportedTagOperation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ReferentialRestriction { .. } | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            log::error!("request failed: {}", self.0);
            "internal server error".to_string()
        } else {
            self.0.to_string()
        };
        HttpResponse::build(status).json(serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        }))
    }
}

#[derive(Debug, Deserialize)]
pub struct FeedParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ImageView {
    #[serde(flatten)]
    pub image: Image,
    pub url: String,
    pub thumbnail_url: String,
}

/// Renders the context of any page type as JSON.
pub async fn page_context(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let context = data.service.context(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(context))
}

/// Lists the direct children of a page.
pub async fn page_children(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let page = data.service.get_page(path.into_inner()).await?;
    let children = data.service.children(Some(page.id)).await?;
    Ok(HttpResponse::Ok().json(children))
}

/// The recent-articles feed; unbounded unless `?limit=` is given.
pub async fn feed(
    data: web::Data<AppState>,
    params: web::Query<FeedParams>,
) -> Result<HttpResponse, ApiError> {
    let entries = data.service.feed(FeedQuery { limit: params.limit }).await?;
    Ok(HttpResponse::Ok().json(entries))
}

pub async fn image_detail(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let image = data.service.get_image(path.into_inner()).await?;
    let media = data.service.media();
    let view = ImageView {
        url: media.get_url(&image.file).await,
        thumbnail_url: media.get_thumbnail_url(&image.file).await,
        image,
    };
    Ok(HttpResponse::Ok().json(view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configure_routes;
    use actix_web::{test, App};
    use chrono::Utc;
    use pt_core::memory::MemoryStore;
    use pt_core::{
        BaseArticlePage, CategoryPage, HomePage, ImageRepo, MockMediaStore, Page, PageKind,
        StreamBody,
    };
    use std::sync::Arc;

    async fn seeded() -> (PageService, Page, Page, Image) {
        let store = Arc::new(MemoryStore::new());
        let mut media = MockMediaStore::new();
        media.expect_get_url().returning(|f| format!("/media/{f}"));
        media.expect_get_thumbnail_url().returning(|f| format!("/media/thumb_{f}.webp"));
        let service = PageService::new(store.clone(), store.clone(), store.clone(), Arc::new(media));

        let image = Image {
            id: Uuid::now_v7(),
            title: "cover".into(),
            file: "cafe".into(),
            width: 10,
            height: 10,
            created_at: Utc::now(),
        };
        store.insert_image(image.clone()).await.unwrap();

        let home = service
            .create_page(None, Page::new("Home", "home", PageKind::Home(HomePage {})))
            .await
            .unwrap();
        let cat = service
            .create_page(
                Some(home.id),
                Page::new("News", "news", PageKind::Category(CategoryPage { name: "News".into() })),
            )
            .await
            .unwrap();
        let article = service
            .create_page(
                Some(cat.id),
                Page::new(
                    "Story",
                    "story",
                    PageKind::Article(BaseArticlePage {
                        intro: "intro".into(),
                        banner: "<p>b</p>".into(),
                        body: StreamBody::default(),
                        feed_image: image.id,
                        promote_boost: Default::default(),
                    }),
                ),
            )
            .await
            .unwrap();
        service.publish(article.id, Utc::now()).await.unwrap();
        service.add_tag(home.id, "front").await.unwrap();
        (service, home, article, image)
    }

    #[actix_web::test]
    async fn test_home_context_json() {
        let (service, home, article, _) = seeded().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState { service }))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri(&format!("/pages/{}/context", home.id)).to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["page_type"], "HomePage");
        assert_eq!(body["tags"], serde_json::json!(["front"]));
        assert_eq!(body["tops"][0]["page"]["id"], article.id.to_string());
        assert!(body.get("feed").is_none());
    }

    #[actix_web::test]
    async fn test_missing_page_is_404() {
        let (service, ..) = seeded().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState { service }))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri(&format!("/pages/{}/context", Uuid::now_v7()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_feed_and_image_routes() {
        let (service, _, article, image) = seeded().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState { service }))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/feed?limit=5").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["page"]["id"], article.id.to_string());
        assert_eq!(body[0]["feed_image"]["id"], image.id.to_string());

        let req = test::TestRequest::get().uri(&format!("/images/{}", image.id)).to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["url"], "/media/cafe");
        assert_eq!(body["thumbnail_url"], "/media/thumb_cafe.webp");
        assert_eq!(body["width"], 10);
    }

    #[actix_web::test]
    async fn test_children_route() {
        let (service, home, article, _) = seeded().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState { service }))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri(&format!("/pages/{}/children", home.id)).to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["kind"]["page_type"], "CategoryPage");
        assert_eq!(body[0]["parent_id"], home.id.to_string());

        let category = article.parent_id.unwrap();
        let req = test::TestRequest::get().uri(&format!("/pages/{category}/children")).to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body[0]["id"], article.id.to_string());

        let req = test::TestRequest::get().uri(&format!("/pages/{}/children", article.id)).to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, serde_json::json!([]));

        let req = test::TestRequest::get()
            .uri(&format!("/pages/{}/children", Uuid::now_v7()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_error_status_mapping() {
        let restricted = ApiError(AppError::ReferentialRestriction {
            image: Uuid::nil(),
            referenced_by: vec![],
        });
        assert_eq!(restricted.status_code(), StatusCode::CONFLICT);
        let placement = ApiError(AppError::PlacementViolation {
            parent: None,
            child: pt_core::PageType::Article,
        });
        assert_eq!(placement.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
