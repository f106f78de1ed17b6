use std::sync::Arc;

mod api_client;
mod app;
mod auth;
mod config;
mod db;
mod logging;
mod posts;
mod state;
mod tasks;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = logging::init();

    let config = Arc::new(AppConfig::from_env()?);
    tracing::info!(env = ?config.env_state, "configuration loaded");

    let state = AppState::init(config.clone()).await?;
    let app = app::build_app(state);

    app::serve(app, &config).await
}
