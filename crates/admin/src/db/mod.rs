//! Administrator directory and settings storage.
//!
//! The directory is an external collaborator: the session core only needs
//! to look up an administrator by email and record logins. It is expressed
//! as the [`AdminDirectory`] trait with two implementations:
//!
//! - [`PgAdminDirectory`] - `PostgreSQL`, used in production
//! - [`InMemoryAdminDirectory`] - process memory, used by tests and local runs
//!
//! # Tables (schema `admin`)
//!
//! - `administrator` - administrator records, keyed by lower-cased email
//! - `site_settings` - single-row registration / maintenance flags
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p aula-cli -- migrate
//! ```

pub mod admin_users;
pub mod memory;
pub mod settings;

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use aula_core::Email;

use crate::models::{AdminRecord, AdminUpdate, NewAdmin};

pub use admin_users::PgAdminDirectory;
pub use memory::InMemoryAdminDirectory;
pub use settings::{InMemorySettingsStore, PgSettingsStore, SettingsStore};

/// Errors that can occur during directory operations.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested administrator was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (duplicate email or colliding key).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Lookup and maintenance of administrator records.
#[async_trait]
pub trait AdminDirectory: Send + Sync {
    /// Find the administrator for `email`.
    ///
    /// Returns `Ok(None)` when no administrator is registered for that exact
    /// address, including when a different address shares its legacy key.
    async fn find(&self, email: &Email) -> Result<Option<AdminRecord>, DirectoryError>;

    /// Stamp a successful login (or refresh) on the record.
    async fn record_login(
        &self,
        email: &Email,
        at: DateTime<Utc>,
        ip: Option<IpAddr>,
    ) -> Result<(), DirectoryError>;

    /// All administrators, newest first.
    async fn list(&self) -> Result<Vec<AdminRecord>, DirectoryError>;

    /// Provision a new administrator.
    ///
    /// Fails with [`DirectoryError::Conflict`] if the email or its legacy key
    /// is already taken.
    async fn insert(&self, admin: NewAdmin, now: DateTime<Utc>)
    -> Result<AdminRecord, DirectoryError>;

    /// Modify role, permissions or active flag.
    async fn update(
        &self,
        email: &Email,
        update: &AdminUpdate,
        now: DateTime<Utc>,
    ) -> Result<AdminRecord, DirectoryError>;

    /// Verify the backing store is reachable.
    async fn health_check(&self) -> Result<(), DirectoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
