use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{auth::repo::UserRepo, config::AppConfig, posts::repo::PostRepo};

#[cfg(test)]
pub mod memory;

/// Everything the handlers and background jobs need from the row store.
pub trait Db: UserRepo + PostRepo {}

impl<T: UserRepo + PostRepo> Db for T {}

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("connect to database")?;

    if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
        tracing::warn!(error = %e, "migration failed; continuing");
    }
    Ok(db)
}
