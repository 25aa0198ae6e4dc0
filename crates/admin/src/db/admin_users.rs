//! `PostgreSQL` administrator directory.
//!
//! Records are looked up by lower-cased email, which is collision-free. The
//! legacy `admin_key` column carries a UNIQUE constraint so that a second
//! address normalizing to an existing key is rejected at insert time.

use std::net::IpAddr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::Instrument;

use aula_core::{AdminKey, AdminRole, Email, Permissions};

use super::{AdminDirectory, DirectoryError};
use crate::models::{AdminRecord, AdminUpdate, NewAdmin};

const SELECT_COLUMNS: &str = r"
    SELECT email, admin_key, role::text AS role, permissions, active,
           created_at, updated_at, last_login, last_login_ip
    FROM admin.administrator
";

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` administrator queries.
#[derive(Debug, sqlx::FromRow)]
struct AdministratorRow {
    email: Email,
    admin_key: String,
    role: String,
    permissions: Json<Permissions>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
    last_login_ip: Option<String>,
}

impl TryFrom<AdministratorRow> for AdminRecord {
    type Error = DirectoryError;

    fn try_from(row: AdministratorRow) -> Result<Self, Self::Error> {
        let role: AdminRole = row.role.parse().map_err(DirectoryError::DataCorruption)?;
        let key = AdminKey::from_email(&row.email);
        if key.as_str() != row.admin_key {
            return Err(DirectoryError::DataCorruption(format!(
                "stored key {} does not match email {}",
                row.admin_key, row.email
            )));
        }
        let last_login_ip = row
            .last_login_ip
            .map(|ip| {
                ip.parse::<IpAddr>().map_err(|e| {
                    DirectoryError::DataCorruption(format!("invalid last_login_ip: {e}"))
                })
            })
            .transpose()?;

        Ok(Self {
            key,
            email: row.email,
            role,
            permissions: row.permissions.0,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_login: row.last_login,
            last_login_ip,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Administrator directory backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgAdminDirectory {
    pool: PgPool,
}

impl PgAdminDirectory {
    /// Create a new directory over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn db_span(operation: &'static str) -> tracing::Span {
    tracing::info_span!("db.query", db.system = "postgresql", db.operation = operation)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[async_trait]
impl AdminDirectory for PgAdminDirectory {
    async fn find(&self, email: &Email) -> Result<Option<AdminRecord>, DirectoryError> {
        let query = format!("{SELECT_COLUMNS} WHERE email = $1");
        let row = sqlx::query_as::<_, AdministratorRow>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT"))
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn record_login(
        &self,
        email: &Email,
        at: DateTime<Utc>,
        ip: Option<IpAddr>,
    ) -> Result<(), DirectoryError> {
        // A refresh (no IP) keeps the address of the last password login.
        let result = sqlx::query(
            r"
            UPDATE admin.administrator
            SET last_login = $2,
                updated_at = $2,
                last_login_ip = COALESCE($3, last_login_ip)
            WHERE email = $1
            ",
        )
        .bind(email)
        .bind(at)
        .bind(ip.map(|ip| ip.to_string()))
        .execute(&self.pool)
        .instrument(db_span("UPDATE"))
        .await?;

        if result.rows_affected() == 0 {
            return Err(DirectoryError::NotFound);
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<AdminRecord>, DirectoryError> {
        let query = format!("{SELECT_COLUMNS} ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, AdministratorRow>(&query)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT"))
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn insert(
        &self,
        admin: NewAdmin,
        now: DateTime<Utc>,
    ) -> Result<AdminRecord, DirectoryError> {
        let record = AdminRecord::new(admin, now);
        sqlx::query(
            r"
            INSERT INTO admin.administrator
                (email, admin_key, role, permissions, active, created_at, updated_at)
            VALUES ($1, $2, $3::admin.admin_role, $4, $5, $6, $6)
            ",
        )
        .bind(&record.email)
        .bind(record.key.as_str())
        .bind(record.role.to_string())
        .bind(Json(record.permissions))
        .bind(record.active)
        .bind(now)
        .execute(&self.pool)
        .instrument(db_span("INSERT"))
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                DirectoryError::Conflict(format!(
                    "an administrator with email or key {} already exists",
                    record.key
                ))
            } else {
                DirectoryError::Database(err)
            }
        })?;

        Ok(record)
    }

    async fn update(
        &self,
        email: &Email,
        update: &AdminUpdate,
        now: DateTime<Utc>,
    ) -> Result<AdminRecord, DirectoryError> {
        let mut tx = self.pool.begin().await?;

        let query = format!("{SELECT_COLUMNS} WHERE email = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, AdministratorRow>(&query)
            .bind(email)
            .fetch_optional(&mut *tx)
            .instrument(db_span("SELECT"))
            .await?
            .ok_or(DirectoryError::NotFound)?;

        let mut record = AdminRecord::try_from(row)?;
        record.apply(update, now);

        sqlx::query(
            r"
            UPDATE admin.administrator
            SET role = $2::admin.admin_role, permissions = $3, active = $4, updated_at = $5
            WHERE email = $1
            ",
        )
        .bind(email)
        .bind(record.role.to_string())
        .bind(Json(record.permissions))
        .bind(record.active)
        .bind(now)
        .execute(&mut *tx)
        .instrument(db_span("UPDATE"))
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn health_check(&self) -> Result<(), DirectoryError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .instrument(db_span("SELECT"))
            .await?;
        Ok(())
    }
}
