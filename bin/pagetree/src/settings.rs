//! Runtime configuration: defaults, overridden by `PAGETREE_*` environment
//! variables (a `.env` file is loaded first by `main`).

use std::path::PathBuf;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// e.g. "sqlite:pagetree.db" or "sqlite::memory:"
    pub database_url: String,
    /// Directory holding uploaded image files
    pub media_root: PathBuf,
    /// URL prefix the media root is served under
    pub media_url_prefix: String,
    pub bind_addr: String,
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("database_url", "sqlite:pagetree.db")?
        .set_default("media_root", "./data/images")?
        .set_default("media_url_prefix", "/media/images")?
        .set_default("bind_addr", "127.0.0.1:8080")
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_env(Environment::with_prefix("PAGETREE"))
    }

    fn from_env(env: Environment) -> Result<Self, ConfigError> {
        defaults()?.add_source(env).build()?.try_deserialize()
    }
}
