//! Persistence for certificates and their dependent records.
//!
//! Each collection has its own trait; no operation spans more than one collection, and
//! callers must not assume cross-collection atomicity.

pub mod files;
pub mod memory;
pub mod postgres;

use crate::domain::{AuditEvent, Certificate, CertificateFilter, PageRequest, TransactionRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

pub use files::{FileStorage, FileStorageError, LocalFileStorage, MemoryFileStorage};
pub use memory::{MemoryStore, StoreOp};
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("duplicate value for unique field {field}: {value}")]
    Duplicate { field: &'static str, value: String },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait CertificateStore: Send + Sync {
    async fn insert_certificate(&self, cert: &Certificate) -> StoreResult<()>;

    async fn find_certificate(&self, id: &str) -> StoreResult<Option<Certificate>>;

    /// Replaces the stored record. Returns `false` if no record with that id exists.
    async fn update_certificate(&self, cert: &Certificate) -> StoreResult<bool>;

    /// Returns `false` if no record with that id exists.
    async fn delete_certificate(&self, id: &str) -> StoreResult<bool>;

    /// One page of certificates matching `filter`, plus the total number of matches.
    async fn list_certificates(
        &self,
        filter: &CertificateFilter,
        page: &PageRequest,
    ) -> StoreResult<(Vec<Certificate>, u64)>;
}

#[async_trait]
pub trait AuditEventStore: Send + Sync {
    async fn insert_event(&self, event: &AuditEvent) -> StoreResult<()>;

    /// Events for one certificate, oldest first.
    async fn events_for(&self, certificate_id: &str) -> StoreResult<Vec<AuditEvent>>;

    /// Most recent event per certificate, keyed by certificate id.
    async fn latest_events(
        &self,
        certificate_ids: &[String],
    ) -> StoreResult<HashMap<String, AuditEvent>>;

    async fn delete_events_for(&self, certificate_id: &str) -> StoreResult<u64>;
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn insert_transaction(&self, tx: &TransactionRecord) -> StoreResult<()>;

    /// Transactions for one certificate, oldest first.
    async fn transactions_for(&self, certificate_id: &str) -> StoreResult<Vec<TransactionRecord>>;

    async fn delete_transactions_for(&self, certificate_id: &str) -> StoreResult<u64>;
}
