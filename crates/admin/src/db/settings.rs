//! Site settings storage.
//!
//! A single settings document drives registration and maintenance-mode
//! redirection in the public client. A missing document is not an error:
//! readers fall back to [`SiteSettings::default`].

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;
use tokio::sync::RwLock;
use tracing::Instrument;

use crate::models::SiteSettings;

/// Error type for settings operations.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Read and replace the site settings document.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// The stored settings, or `None` if none were ever written.
    async fn get(&self) -> Result<Option<SiteSettings>, SettingsError>;

    /// Replace the stored settings.
    async fn put(&self, settings: SiteSettings) -> Result<(), SettingsError>;

    /// The stored settings, or the defaults.
    async fn current(&self) -> Result<SiteSettings, SettingsError> {
        Ok(self.get().await?.unwrap_or_default())
    }
}

/// Settings stored as a single JSONB row in `admin.site_settings`.
#[derive(Debug, Clone)]
pub struct PgSettingsStore {
    pool: PgPool,
}

impl PgSettingsStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsStore for PgSettingsStore {
    async fn get(&self) -> Result<Option<SiteSettings>, SettingsError> {
        let row: Option<(Json<SiteSettings>,)> =
            sqlx::query_as("SELECT value FROM admin.site_settings WHERE id = 1")
                .fetch_optional(&self.pool)
                .instrument(tracing::info_span!("db.query", db.operation = "SELECT"))
                .await?;

        Ok(row.map(|(Json(settings),)| settings))
    }

    async fn put(&self, settings: SiteSettings) -> Result<(), SettingsError> {
        sqlx::query(
            r"
            INSERT INTO admin.site_settings (id, value)
            VALUES (1, $1)
            ON CONFLICT (id) DO UPDATE SET value = $1, updated_at = NOW()
            ",
        )
        .bind(Json(settings))
        .execute(&self.pool)
        .instrument(tracing::info_span!("db.query", db.operation = "UPSERT"))
        .await?;

        Ok(())
    }
}

/// Settings held in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySettingsStore {
    value: Arc<RwLock<Option<SiteSettings>>>,
}

impl InMemorySettingsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn get(&self) -> Result<Option<SiteSettings>, SettingsError> {
        Ok(*self.value.read().await)
    }

    async fn put(&self, settings: SiteSettings) -> Result<(), SettingsError> {
        *self.value.write().await = Some(settings);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_document_yields_defaults() {
        let store = InMemorySettingsStore::new();
        assert!(store.get().await.unwrap().is_none());

        let current = store.current().await.unwrap();
        assert!(current.allow_registration);
        assert!(!current.maintenance_mode);
    }

    #[tokio::test]
    async fn test_put_replaces_document() {
        let store = InMemorySettingsStore::new();
        store
            .put(SiteSettings {
                allow_registration: false,
                maintenance_mode: true,
            })
            .await
            .unwrap();

        let current = store.current().await.unwrap();
        assert!(!current.allow_registration);
        assert!(current.maintenance_mode);
    }
}
