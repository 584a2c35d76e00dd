//! PostgreSQL-backed store for certificates, audit events and transaction records.

use super::{AuditEventStore, CertificateStore, StoreError, StoreResult, TransactionStore};
use crate::domain::{
    Actor, AuditAction, AuditEvent, Certificate, CertificateFilter, CertificateStatus, ChainInfo,
    FileMeta, PageRequest, Role, SortOrder, StorageInfo, TransactionRecord, TxPurpose, TxStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::collections::HashMap;

const CERTIFICATE_COLUMNS: &str = "id, certificate_name, subject, company_id, metadata_hash, status, \
     chain, storage, file, requested_by_user_id, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects and makes sure the tables exist.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS certificates (
                id TEXT PRIMARY KEY,
                certificate_name TEXT NOT NULL,
                subject TEXT NOT NULL,
                company_id TEXT NOT NULL,
                metadata_hash TEXT NOT NULL UNIQUE,
                status TEXT NOT NULL,
                chain JSONB NOT NULL,
                storage JSONB,
                file JSONB,
                requested_by_user_id TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS audit_events (
                id TEXT PRIMARY KEY,
                certificate_id TEXT NOT NULL,
                action TEXT NOT NULL,
                actor_user_id TEXT NOT NULL,
                actor_role TEXT,
                details JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_audit_events_certificate
             ON audit_events (certificate_id, created_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS transaction_records (
                id TEXT PRIMARY KEY,
                tx_hash TEXT NOT NULL,
                purpose TEXT NOT NULL,
                certificate_id TEXT,
                network TEXT,
                status TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_transaction_records_certificate
             ON transaction_records (certificate_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Round-trips a trivial query; used by the health endpoint.
    pub async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn map_insert_error(err: sqlx::Error, hash: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::Duplicate {
                field: "metadata_hash",
                value: hash.to_string(),
            };
        }
    }
    StoreError::Database(err)
}

fn row_to_certificate(row: &PgRow) -> StoreResult<Certificate> {
    let status: String = row.try_get("status")?;
    let status = CertificateStatus::parse(&status)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown certificate status '{}'", status)))?;
    let chain: Json<ChainInfo> = row.try_get("chain")?;
    let storage: Option<Json<StorageInfo>> = row.try_get("storage")?;
    let file: Option<Json<FileMeta>> = row.try_get("file")?;
    Ok(Certificate {
        id: row.try_get("id")?,
        certificate_name: row.try_get("certificate_name")?,
        subject: row.try_get("subject")?,
        company_id: row.try_get("company_id")?,
        metadata_hash: row.try_get("metadata_hash")?,
        status,
        chain: chain.0,
        storage: storage.map(|s| s.0),
        file: file.map(|f| f.0),
        requested_by_user_id: row.try_get("requested_by_user_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_event(row: &PgRow) -> StoreResult<AuditEvent> {
    let action: String = row.try_get("action")?;
    let action = AuditAction::parse(&action)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown audit action '{}'", action)))?;
    let role: Option<String> = row.try_get("actor_role")?;
    let details: Json<JsonValue> = row.try_get("details")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    Ok(AuditEvent {
        id: row.try_get("id")?,
        certificate_id: row.try_get("certificate_id")?,
        action,
        actor: Actor {
            user_id: row.try_get("actor_user_id")?,
            role: role.as_deref().and_then(Role::parse),
        },
        details: details.0,
        created_at,
    })
}

fn row_to_transaction(row: &PgRow) -> StoreResult<TransactionRecord> {
    let purpose: String = row.try_get("purpose")?;
    let purpose = TxPurpose::parse(&purpose)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown transaction purpose '{}'", purpose)))?;
    let status: String = row.try_get("status")?;
    let status = TxStatus::parse(&status)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown transaction status '{}'", status)))?;
    Ok(TransactionRecord {
        id: row.try_get("id")?,
        tx_hash: row.try_get("tx_hash")?,
        purpose,
        certificate_id: row.try_get("certificate_id")?,
        network: row.try_get("network")?,
        status,
        created_at: row.try_get("created_at")?,
    })
}

/// Escapes LIKE metacharacters so a search term is matched literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &CertificateFilter) {
    builder.push(" WHERE TRUE");
    if let Some(company_id) = &filter.company_id {
        builder.push(" AND company_id = ").push_bind(company_id.clone());
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(user) = &filter.requested_by_user_id {
        builder
            .push(" AND requested_by_user_id = ")
            .push_bind(user.clone());
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        builder
            .push(" AND (certificate_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR subject ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl CertificateStore for PgStore {
    async fn insert_certificate(&self, cert: &Certificate) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO certificates (id, certificate_name, subject, company_id, metadata_hash, status,
                chain, storage, file, requested_by_user_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(&cert.id)
        .bind(&cert.certificate_name)
        .bind(&cert.subject)
        .bind(&cert.company_id)
        .bind(&cert.metadata_hash)
        .bind(cert.status.as_str())
        .bind(Json(&cert.chain))
        .bind(cert.storage.as_ref().map(Json))
        .bind(cert.file.as_ref().map(Json))
        .bind(&cert.requested_by_user_id)
        .bind(cert.created_at)
        .bind(cert.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, &cert.metadata_hash))?;
        Ok(())
    }

    async fn find_certificate(&self, id: &str) -> StoreResult<Option<Certificate>> {
        let sql = format!("SELECT {} FROM certificates WHERE id = $1", CERTIFICATE_COLUMNS);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_certificate).transpose()
    }

    async fn update_certificate(&self, cert: &Certificate) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE certificates SET certificate_name = $2, subject = $3, company_id = $4,
                status = $5, chain = $6, storage = $7, file = $8, updated_at = $9
             WHERE id = $1",
        )
        .bind(&cert.id)
        .bind(&cert.certificate_name)
        .bind(&cert.subject)
        .bind(&cert.company_id)
        .bind(cert.status.as_str())
        .bind(Json(&cert.chain))
        .bind(cert.storage.as_ref().map(Json))
        .bind(cert.file.as_ref().map(Json))
        .bind(cert.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_certificate(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM certificates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_certificates(
        &self,
        filter: &CertificateFilter,
        page: &PageRequest,
    ) -> StoreResult<(Vec<Certificate>, u64)> {
        let mut count_query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) AS total FROM certificates");
        push_filter(&mut count_query, filter);
        let total: i64 = count_query
            .build()
            .fetch_one(&self.pool)
            .await?
            .try_get("total")?;

        let mut list_query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM certificates", CERTIFICATE_COLUMNS));
        push_filter(&mut list_query, filter);
        let direction = match page.sort_order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        list_query.push(format!(
            " ORDER BY {} {}, id {}",
            page.sort_by.column(),
            direction,
            direction
        ));
        list_query
            .push(" LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let rows = list_query.build().fetch_all(&self.pool).await?;
        let certificates = rows
            .iter()
            .map(row_to_certificate)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok((certificates, total.max(0) as u64))
    }
}

#[async_trait]
impl AuditEventStore for PgStore {
    async fn insert_event(&self, event: &AuditEvent) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO audit_events (id, certificate_id, action, actor_user_id, actor_role, details, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&event.id)
        .bind(&event.certificate_id)
        .bind(event.action.as_str())
        .bind(&event.actor.user_id)
        .bind(event.actor.role.map(|r| r.as_str()))
        .bind(Json(&event.details))
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn events_for(&self, certificate_id: &str) -> StoreResult<Vec<AuditEvent>> {
        let rows = sqlx::query(
            "SELECT id, certificate_id, action, actor_user_id, actor_role, details, created_at
             FROM audit_events WHERE certificate_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(certificate_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_event).collect()
    }

    async fn latest_events(
        &self,
        certificate_ids: &[String],
    ) -> StoreResult<HashMap<String, AuditEvent>> {
        if certificate_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query(
            "SELECT DISTINCT ON (certificate_id)
                id, certificate_id, action, actor_user_id, actor_role, details, created_at
             FROM audit_events
             WHERE certificate_id = ANY($1)
             ORDER BY certificate_id, created_at DESC, id DESC",
        )
        .bind(certificate_ids)
        .fetch_all(&self.pool)
        .await?;
        let mut latest = HashMap::with_capacity(rows.len());
        for row in &rows {
            let event = row_to_event(row)?;
            latest.insert(event.certificate_id.clone(), event);
        }
        Ok(latest)
    }

    async fn delete_events_for(&self, certificate_id: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM audit_events WHERE certificate_id = $1")
            .bind(certificate_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl TransactionStore for PgStore {
    async fn insert_transaction(&self, tx: &TransactionRecord) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO transaction_records (id, tx_hash, purpose, certificate_id, network, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&tx.id)
        .bind(&tx.tx_hash)
        .bind(tx.purpose.as_str())
        .bind(&tx.certificate_id)
        .bind(&tx.network)
        .bind(tx.status.as_str())
        .bind(tx.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn transactions_for(&self, certificate_id: &str) -> StoreResult<Vec<TransactionRecord>> {
        let rows = sqlx::query(
            "SELECT id, tx_hash, purpose, certificate_id, network, status, created_at
             FROM transaction_records WHERE certificate_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(certificate_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_transaction).collect()
    }

    async fn delete_transactions_for(&self, certificate_id: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM transaction_records WHERE certificate_id = $1")
            .bind(certificate_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
