use std::sync::Arc;

use anyhow::Context;
use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{config::Config, db::genre::seed_genres, scraper::ChapterScraper};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub scraper: ChapterScraper,
}

pub type SharedAppState = Arc<AppState>;

impl AppState {
    pub async fn init(config: Config) -> Result<Self, anyhow::Error> {
        let pool = PgPoolOptions::new()
            .min_connections(config.database.min_connections)
            .max_connections(config.database.max_connections)
            .connect_lazy_with(config.database.with_db());

        Self::with_pool(pool, config).await
    }

    pub async fn with_pool(pool: PgPool, config: Config) -> Result<Self, anyhow::Error> {
        if config.application.run_migration {
            tracing::warn!("Running database migrations...");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run database migrations.")?;

            seed_genres(&pool)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to seed genres: {e}"))?;
        }

        let scraper =
            ChapterScraper::new(&config.scraper).context("Failed to build scraper client.")?;

        Ok(AppState {
            pool,
            config,
            scraper,
        })
    }
}
