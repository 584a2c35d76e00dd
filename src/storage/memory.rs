//! In-process store used for local development and tests.
//!
//! Every operation can be made to fail on demand, and call counts are tracked per
//! operation so callers can assert that a code path never touched the store.

use super::{AuditEventStore, CertificateStore, StoreError, StoreResult, TransactionStore};
use crate::domain::{
    AuditEvent, Certificate, CertificateFilter, PageRequest, SortField, SortOrder,
    TransactionRecord,
};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    InsertCertificate,
    FindCertificate,
    UpdateCertificate,
    DeleteCertificate,
    ListCertificates,
    InsertEvent,
    ReadEvents,
    DeleteEvents,
    InsertTransaction,
    ReadTransactions,
    DeleteTransactions,
}

#[derive(Default)]
struct Inner {
    certificates: HashMap<String, Certificate>,
    events: Vec<AuditEvent>,
    transactions: Vec<TransactionRecord>,
    failing: HashSet<StoreOp>,
    calls: HashMap<StoreOp, usize>,
}

impl Inner {
    fn enter(&mut self, op: StoreOp) -> StoreResult<()> {
        *self.calls.entry(op).or_insert(0) += 1;
        if self.failing.contains(&op) {
            return Err(StoreError::Unavailable(format!("injected failure on {:?}", op)));
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call of `op` fail with [`StoreError::Unavailable`].
    pub async fn fail_on(&self, op: StoreOp) {
        self.inner.lock().await.failing.insert(op);
    }

    pub async fn recover(&self, op: StoreOp) {
        self.inner.lock().await.failing.remove(&op);
    }

    pub async fn call_count(&self, op: StoreOp) -> usize {
        self.inner.lock().await.calls.get(&op).copied().unwrap_or(0)
    }

    /// Total calls across all operations.
    pub async fn total_calls(&self) -> usize {
        self.inner.lock().await.calls.values().sum()
    }

    pub async fn certificate_count(&self) -> usize {
        self.inner.lock().await.certificates.len()
    }

    pub async fn event_count(&self) -> usize {
        self.inner.lock().await.events.len()
    }

    pub async fn transaction_count(&self) -> usize {
        self.inner.lock().await.transactions.len()
    }

    /// Every mirrored transaction, including those not tied to a certificate.
    pub async fn transactions(&self) -> Vec<TransactionRecord> {
        self.inner.lock().await.transactions.clone()
    }
}

fn matches(cert: &Certificate, filter: &CertificateFilter) -> bool {
    if let Some(company_id) = &filter.company_id {
        if cert.company_id != *company_id {
            return false;
        }
    }
    if let Some(status) = filter.status {
        if cert.status != status {
            return false;
        }
    }
    if let Some(user) = &filter.requested_by_user_id {
        if &cert.requested_by_user_id != user {
            return false;
        }
    }
    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        if !cert.certificate_name.to_lowercase().contains(&needle)
            && !cert.subject.to_lowercase().contains(&needle)
        {
            return false;
        }
    }
    true
}

fn compare(a: &Certificate, b: &Certificate, field: SortField) -> Ordering {
    let primary = match field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::CertificateName => a.certificate_name.cmp(&b.certificate_name),
        SortField::Subject => a.subject.cmp(&b.subject),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl CertificateStore for MemoryStore {
    async fn insert_certificate(&self, cert: &Certificate) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.enter(StoreOp::InsertCertificate)?;
        if inner
            .certificates
            .values()
            .any(|c| c.metadata_hash == cert.metadata_hash)
        {
            return Err(StoreError::Duplicate {
                field: "metadata_hash",
                value: cert.metadata_hash.clone(),
            });
        }
        inner.certificates.insert(cert.id.clone(), cert.clone());
        Ok(())
    }

    async fn find_certificate(&self, id: &str) -> StoreResult<Option<Certificate>> {
        let mut inner = self.inner.lock().await;
        inner.enter(StoreOp::FindCertificate)?;
        Ok(inner.certificates.get(id).cloned())
    }

    async fn update_certificate(&self, cert: &Certificate) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        inner.enter(StoreOp::UpdateCertificate)?;
        match inner.certificates.get_mut(&cert.id) {
            Some(existing) => {
                *existing = cert.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_certificate(&self, id: &str) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        inner.enter(StoreOp::DeleteCertificate)?;
        Ok(inner.certificates.remove(id).is_some())
    }

    async fn list_certificates(
        &self,
        filter: &CertificateFilter,
        page: &PageRequest,
    ) -> StoreResult<(Vec<Certificate>, u64)> {
        let mut inner = self.inner.lock().await;
        inner.enter(StoreOp::ListCertificates)?;
        let mut hits: Vec<Certificate> = inner
            .certificates
            .values()
            .filter(|c| matches(c, filter))
            .cloned()
            .collect();
        hits.sort_by(|a, b| {
            let ord = compare(a, b, page.sort_by);
            match page.sort_order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
        let total = hits.len() as u64;
        let page_items = hits
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();
        Ok((page_items, total))
    }
}

#[async_trait]
impl AuditEventStore for MemoryStore {
    async fn insert_event(&self, event: &AuditEvent) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.enter(StoreOp::InsertEvent)?;
        inner.events.push(event.clone());
        Ok(())
    }

    async fn events_for(&self, certificate_id: &str) -> StoreResult<Vec<AuditEvent>> {
        let mut inner = self.inner.lock().await;
        inner.enter(StoreOp::ReadEvents)?;
        let mut events: Vec<AuditEvent> = inner
            .events
            .iter()
            .filter(|e| e.certificate_id == certificate_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(events)
    }

    async fn latest_events(
        &self,
        certificate_ids: &[String],
    ) -> StoreResult<HashMap<String, AuditEvent>> {
        let mut inner = self.inner.lock().await;
        inner.enter(StoreOp::ReadEvents)?;
        let wanted: HashSet<&str> = certificate_ids.iter().map(String::as_str).collect();
        let mut latest: HashMap<String, AuditEvent> = HashMap::new();
        // Events are appended in order, so a later entry with an equal timestamp wins.
        for event in inner.events.iter() {
            if !wanted.contains(event.certificate_id.as_str()) {
                continue;
            }
            match latest.get(&event.certificate_id) {
                Some(current) if current.created_at > event.created_at => {}
                _ => {
                    latest.insert(event.certificate_id.clone(), event.clone());
                }
            }
        }
        Ok(latest)
    }

    async fn delete_events_for(&self, certificate_id: &str) -> StoreResult<u64> {
        let mut inner = self.inner.lock().await;
        inner.enter(StoreOp::DeleteEvents)?;
        let before = inner.events.len();
        inner.events.retain(|e| e.certificate_id != certificate_id);
        Ok((before - inner.events.len()) as u64)
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn insert_transaction(&self, tx: &TransactionRecord) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.enter(StoreOp::InsertTransaction)?;
        inner.transactions.push(tx.clone());
        Ok(())
    }

    async fn transactions_for(&self, certificate_id: &str) -> StoreResult<Vec<TransactionRecord>> {
        let mut inner = self.inner.lock().await;
        inner.enter(StoreOp::ReadTransactions)?;
        Ok(inner
            .transactions
            .iter()
            .filter(|t| t.certificate_id.as_deref() == Some(certificate_id))
            .cloned()
            .collect())
    }

    async fn delete_transactions_for(&self, certificate_id: &str) -> StoreResult<u64> {
        let mut inner = self.inner.lock().await;
        inner.enter(StoreOp::DeleteTransactions)?;
        let before = inner.transactions.len();
        inner
            .transactions
            .retain(|t| t.certificate_id.as_deref() != Some(certificate_id));
        Ok((before - inner.transactions.len()) as u64)
    }
}
