//! In-memory administrator directory.
//!
//! Records are keyed by the legacy normalized key, exactly like the
//! document store this service was first written against. Every lookup
//! compares the stored email so that two addresses sharing a key are never
//! confused with each other.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use aula_core::{AdminKey, Email};

use super::{AdminDirectory, DirectoryError};
use crate::models::{AdminRecord, AdminUpdate, NewAdmin};

/// Administrator directory held in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAdminDirectory {
    records: Arc<RwLock<HashMap<AdminKey, AdminRecord>>>,
}

impl InMemoryAdminDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the record for `email`, returning it if it existed.
    pub async fn remove(&self, email: &Email) -> Option<AdminRecord> {
        let mut records = self.records.write().await;
        let key = Self::matching(&mut records, email).map(|record| record.key.clone())?;
        records.remove(&key)
    }

    fn matching<'a>(
        records: &'a mut HashMap<AdminKey, AdminRecord>,
        email: &Email,
    ) -> Option<&'a mut AdminRecord> {
        let key = AdminKey::from_email(email);
        match records.get_mut(&key) {
            Some(record) if record.email == *email => Some(record),
            Some(record) => {
                tracing::warn!(
                    requested = %email,
                    stored = %record.email,
                    key = %key,
                    "Administrator key collision: stored record belongs to a different email"
                );
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl AdminDirectory for InMemoryAdminDirectory {
    async fn find(&self, email: &Email) -> Result<Option<AdminRecord>, DirectoryError> {
        let mut records = self.records.write().await;
        Ok(Self::matching(&mut records, email).map(|record| record.clone()))
    }

    async fn record_login(
        &self,
        email: &Email,
        at: DateTime<Utc>,
        ip: Option<IpAddr>,
    ) -> Result<(), DirectoryError> {
        let mut records = self.records.write().await;
        let record = Self::matching(&mut records, email).ok_or(DirectoryError::NotFound)?;
        record.last_login = Some(at);
        record.updated_at = at;
        if ip.is_some() {
            record.last_login_ip = ip;
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<AdminRecord>, DirectoryError> {
        let records = self.records.read().await;
        let mut all: Vec<AdminRecord> = records.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.email.as_str().cmp(b.email.as_str())));
        Ok(all)
    }

    async fn insert(
        &self,
        admin: NewAdmin,
        now: DateTime<Utc>,
    ) -> Result<AdminRecord, DirectoryError> {
        let record = AdminRecord::new(admin, now);
        let mut records = self.records.write().await;
        if let Some(existing) = records.get(&record.key) {
            let reason = if existing.email == record.email {
                format!("administrator {} already exists", record.email)
            } else {
                format!(
                    "{} normalizes to key {} already used by {}",
                    record.email, record.key, existing.email
                )
            };
            return Err(DirectoryError::Conflict(reason));
        }
        records.insert(record.key.clone(), record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        email: &Email,
        update: &AdminUpdate,
        now: DateTime<Utc>,
    ) -> Result<AdminRecord, DirectoryError> {
        let mut records = self.records.write().await;
        let record = Self::matching(&mut records, email).ok_or(DirectoryError::NotFound)?;
        record.apply(update, now);
        Ok(record.clone())
    }

    async fn health_check(&self) -> Result<(), DirectoryError> {
        Ok(())
    }
}
