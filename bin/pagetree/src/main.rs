//! # Pagetree Binary
//!
//! The entry point that assembles the application based on compile-time features.

mod settings;

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use pt_api::handlers::AppState;
use pt_api::middleware::{cors_policy, standard_middleware};
use pt_core::PageService;
use pt_storage_local::LocalMediaStore;

// Feature-gated imports
#[cfg(feature = "db-sqlite")]
use pt_db_sqlite::SqlitePageStore;

#[cfg(not(feature = "db-sqlite"))]
use pt_core::memory::MemoryStore;

use crate::settings::Settings;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = Settings::load()?;

    // 1. Initialize Database Implementation
    #[cfg(feature = "db-sqlite")]
    let store = Arc::new(SqlitePageStore::new(&settings.database_url).await?);

    #[cfg(not(feature = "db-sqlite"))]
    let store = {
        log::warn!("built without db-sqlite, pages are kept in memory only");
        Arc::new(MemoryStore::new())
    };

    // 2. Initialize Image Storage
    let media = Arc::new(LocalMediaStore::new(
        settings.media_root.clone(),
        settings.media_url_prefix.clone(),
    ));

    // 3. Wire the ports into the service (dynamic dispatch keeps plugins swappable)
    let service = PageService::new(store.clone(), store.clone(), store, media);
    let state = web::Data::new(AppState { service });

    log::info!("pagetree starting on http://{}", settings.bind_addr);

    let media_root = settings.media_root.clone();
    let media_prefix = settings.media_url_prefix.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(standard_middleware())
            .wrap(cors_policy())
            .service(actix_files::Files::new(&media_prefix, &media_root))
            .configure(pt_api::configure_routes)
    })
    .bind(settings.bind_addr.as_str())?
    .run()
    .await?;

    Ok(())
}
