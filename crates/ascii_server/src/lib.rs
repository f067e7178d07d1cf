//! HTTP front end: upload an image, convert it, download the result.

mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

/// Largest accepted upload.
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
    pub font_dir: PathBuf,
}

impl ServerConfig {
    pub fn create_dirs(&self) -> std::io::Result<()> {
        for dir in [&self.upload_dir, &self.output_dir, &self.font_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

pub type AppState = Arc<ServerConfig>;

pub fn router(config: ServerConfig) -> Router {
    let output = ServeDir::new(&config.output_dir);
    Router::new()
        .route("/upload", post(routes::upload))
        .route("/fonts", get(routes::fonts))
        .nest_service("/output", output)
        .with_state(Arc::new(config))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
}
