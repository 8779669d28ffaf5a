use async_trait::async_trait;
use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};

use super::{LinkStore, Result};
use crate::{
    error::StoreError,
    models::{LinkConfig, LinkFields},
};

macro_rules! select_links {
    ($tail:literal) => {
        concat!(
            "SELECT id, short_code, description,
                    ios_bundle_id, ios_app_store_id, ios_deep_link,
                    android_package_name, android_deep_link,
                    web_fallback_url,
                    social_title, social_description, social_image_url,
                    created_at, updated_at
             FROM links ",
            $tail
        )
    };
}

/// SQLite-backed link store.
#[derive(Clone, Debug)]
pub struct SqliteLinkStore {
    pool: SqlitePool,
}

impl SqliteLinkStore {
    /// Open (creating if needed) the database at `database_url` and apply the
    /// embedded migrations.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(
                database_url
                    .parse::<SqliteConnectOptions>()?
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .foreign_keys(true),
            )
            .await?;

        Self::from_pool(pool).await
    }

    /// A private in-memory database. A single connection keeps every query on
    /// the same database.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> anyhow::Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
        Ok(Self { pool })
    }

    /// Close every pooled connection. Called once on shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl LinkStore for SqliteLinkStore {
    async fn find_by_code(&self, short_code: &str) -> Result<Option<LinkConfig>> {
        let link: Option<LinkConfig> = sqlx::query_as(select_links!("WHERE short_code = ?1"))
            .bind(short_code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(link)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<LinkConfig>> {
        let link: Option<LinkConfig> = sqlx::query_as(select_links!("WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(link)
    }

    async fn insert(&self, short_code: &str, fields: &LinkFields) -> Result<LinkConfig> {
        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO links
                 (short_code, description,
                  ios_bundle_id, ios_app_store_id, ios_deep_link,
                  android_package_name, android_deep_link,
                  web_fallback_url,
                  social_title, social_description, social_image_url,
                  created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
        )
        .bind(short_code)
        .bind(&fields.description)
        .bind(&fields.ios_bundle_id)
        .bind(&fields.ios_app_store_id)
        .bind(&fields.ios_deep_link)
        .bind(&fields.android_package_name)
        .bind(&fields.android_deep_link)
        .bind(&fields.web_fallback_url)
        .bind(&fields.social_title)
        .bind(&fields.social_description)
        .bind(&fields.social_image_url)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(short_code, e))?
        .last_insert_rowid();

        let link: LinkConfig = sqlx::query_as(select_links!("WHERE id = ?1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(link)
    }

    async fn update(&self, id: i64, fields: &LinkFields) -> Result<Option<LinkConfig>> {
        let affected = sqlx::query(
            "UPDATE links
             SET description = ?2,
                 ios_bundle_id = ?3, ios_app_store_id = ?4, ios_deep_link = ?5,
                 android_package_name = ?6, android_deep_link = ?7,
                 web_fallback_url = ?8,
                 social_title = ?9, social_description = ?10, social_image_url = ?11,
                 updated_at = ?12
             WHERE id = ?1",
        )
        .bind(id)
        .bind(&fields.description)
        .bind(&fields.ios_bundle_id)
        .bind(&fields.ios_app_store_id)
        .bind(&fields.ios_deep_link)
        .bind(&fields.android_package_name)
        .bind(&fields.android_deep_link)
        .bind(&fields.web_fallback_url)
        .bind(&fields.social_title)
        .bind(&fields.social_description)
        .bind(&fields.social_image_url)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn list(&self) -> Result<Vec<LinkConfig>> {
        let links: Vec<LinkConfig> =
            sqlx::query_as(select_links!("ORDER BY created_at DESC, id DESC"))
                .fetch_all(&self.pool)
                .await?;

        Ok(links)
    }
}

fn map_insert_error(short_code: &str, e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Duplicate(short_code.to_owned())
        }
        _ => StoreError::Database(e),
    }
}
