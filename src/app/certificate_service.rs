//! The certificate lifecycle service.
//!
//! This module sits between callers, the ledger and the database. It is responsible for:
//! 1.  Anchoring a document hash on the ledger before any local record exists.
//! 2.  Persisting the certificate once the ledger has produced a receipt.
//! 3.  Keeping the secondary records (transaction mirror, audit trail, stored files) in step
//!     on a best-effort basis: their failures are logged and reported in the [`Outcome`],
//!     never surfaced as the operation's failure.

use crate::app::dto::{
    required, CertificateDetails, CertificatePage, CertificateSummary, CreateCertificateInput,
    DeleteCertificateInput, DeletionReport, IssuedCertificate, IssuedCheck, LedgerTx,
    UpdateCertificateInput,
};
use crate::app::error::{LedgerStage, ServiceError, ServiceResult};
use crate::app::outcome::{AuxiliaryKind, AuxiliaryStatus, Outcome};
use crate::domain::{
    Actor, AuditAction, AuditEvent, Certificate, CertificateQuery, CertificateStatus, ChainInfo,
    StorageInfo, TransactionRecord, TxPurpose, TxStatus,
};
use crate::infra::ledger::{DocumentMetadata, LedgerError, LedgerGateway, Receipt};
use crate::storage::{AuditEventStore, CertificateStore, FileStorage, TransactionStore};
use chrono::Utc;
use serde_json::json;
use std::collections::HashSet;
use std::fmt::Display;
use std::sync::{Arc, Mutex};
use tracing::{error, info, instrument, warn};

/// Hashes currently being issued by this process.
#[derive(Default)]
struct InFlight {
    hashes: Mutex<HashSet<String>>,
}

impl InFlight {
    fn claim(self: &Arc<Self>, hash: &str) -> Option<InFlightGuard> {
        let mut hashes = self.hashes.lock().unwrap_or_else(|p| p.into_inner());
        if !hashes.insert(hash.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            owner: Arc::clone(self),
            hash: hash.to_string(),
        })
    }
}

/// Releases the claimed hash when the issuing request finishes, whatever the result.
struct InFlightGuard {
    owner: Arc<InFlight>,
    hash: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut hashes = self.owner.hashes.lock().unwrap_or_else(|p| p.into_inner());
        hashes.remove(&self.hash);
    }
}

/// Logs a failed best-effort write and records how it went.
fn note<E: Display>(
    auxiliary: &mut Vec<(AuxiliaryKind, AuxiliaryStatus)>,
    kind: AuxiliaryKind,
    result: Result<(), E>,
    context: &str,
) {
    let status = match result {
        Ok(()) => AuxiliaryStatus::Applied,
        Err(e) => {
            warn!(?kind, error = %e, "{}", context);
            AuxiliaryStatus::Failed(e.to_string())
        }
    };
    auxiliary.push((kind, status));
}

fn finish<T>(primary: T, auxiliary: Vec<(AuxiliaryKind, AuxiliaryStatus)>) -> Outcome<T> {
    let mut outcome = Outcome::new(primary);
    for (kind, status) in auxiliary {
        outcome.record(kind, status);
    }
    outcome
}

pub struct CertificateService {
    ledger: Arc<dyn LedgerGateway>,
    certificates: Arc<dyn CertificateStore>,
    events: Arc<dyn AuditEventStore>,
    transactions: Arc<dyn TransactionStore>,
    files: Arc<dyn FileStorage>,
    in_flight: Arc<InFlight>,
}

impl CertificateService {
    pub fn new(
        ledger: Arc<dyn LedgerGateway>,
        certificates: Arc<dyn CertificateStore>,
        events: Arc<dyn AuditEventStore>,
        transactions: Arc<dyn TransactionStore>,
        files: Arc<dyn FileStorage>,
    ) -> Self {
        Self {
            ledger,
            certificates,
            events,
            transactions,
            files,
            in_flight: Arc::new(InFlight::default()),
        }
    }

    /// Builds the service over a single store that holds all three collections.
    pub fn with_store<S>(
        ledger: Arc<dyn LedgerGateway>,
        store: Arc<S>,
        files: Arc<dyn FileStorage>,
    ) -> Self
    where
        S: CertificateStore + AuditEventStore + TransactionStore + 'static,
    {
        Self::new(ledger, store.clone(), store.clone(), store, files)
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerGateway> {
        &self.ledger
    }

    /// Anchors the document hash on the ledger, then records the certificate locally.
    #[instrument(skip(self, input), fields(hash = tracing::field::Empty))]
    pub async fn create_certificate(
        &self,
        input: CreateCertificateInput,
    ) -> ServiceResult<Outcome<IssuedCertificate>> {
        let input = input.validate()?;
        let hash = input.metadata_hash.clone();
        tracing::Span::current().record("hash", hash.as_str());

        let _claim = self.in_flight.claim(&hash).ok_or_else(|| {
            ServiceError::Conflict("a certificate with this hash is already being issued".into())
        })?;

        match self.ledger.read_document(&hash).await {
            Ok(Some(_)) => {
                info!("document already registered on chain");
                return Err(ServiceError::Conflict(
                    "document with this hash already exists on chain".into(),
                ));
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "duplicate check against ledger failed");
                return Err(ServiceError::upstream(
                    LedgerStage::DuplicateCheck,
                    "failed to verify existing document on chain",
                    e,
                ));
            }
        }

        let metadata = DocumentMetadata {
            subject: input.subject.clone(),
            company_id: input.company_id.clone(),
            requested_by_user_id: input.requested_by_user_id.clone(),
        };
        let receipt = self
            .ledger
            .store_document(&input.certificate_name, &hash, &metadata)
            .await
            .map_err(|e| {
                warn!(error = %e, "store_document call failed");
                ServiceError::upstream(
                    LedgerStage::StoreDocument,
                    "blockchain store_document call failed",
                    e,
                )
            })?;
        if !receipt.is_success() {
            warn!(status = ?receipt.status, "store_document reported failure");
            return Err(ServiceError::upstream_reply(
                LedgerStage::StoreStatus,
                "blockchain store_document failed",
            ));
        }
        let tx_hash = receipt
            .tx_hash()
            .ok_or_else(|| {
                warn!("store_document receipt has no transaction hash");
                ServiceError::upstream_reply(
                    LedgerStage::MissingTxHash,
                    "missing txHash from blockchain receipt",
                )
            })?
            .to_string();

        let network = input
            .network
            .clone()
            .unwrap_or_else(|| self.ledger.network().to_string());
        let now = Utc::now();
        let cert = Certificate {
            id: uuid::Uuid::new_v4().to_string(),
            certificate_name: input.certificate_name,
            subject: input.subject,
            company_id: input.company_id,
            metadata_hash: hash,
            status: CertificateStatus::Issued,
            chain: ChainInfo {
                network: Some(network.clone()),
                tx_hash_issue: Some(tx_hash.clone()),
                on_chain_id: receipt.on_chain_id.clone(),
            },
            storage: input.storage_meta.map(|s| self.with_provider(s)),
            file: input.file_meta,
            requested_by_user_id: input.requested_by_user_id,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.certificates.insert_certificate(&cert).await {
            // The ledger already holds the hash; this needs manual reconciliation.
            error!(error = %e, tx_hash = %tx_hash, "certificate write failed after ledger store");
            return Err(ServiceError::Persistence(e));
        }
        info!(certificate_id = %cert.id, tx_hash = %tx_hash, "certificate issued");

        let mut auxiliary = Vec::new();
        let record = TransactionRecord::new(&tx_hash, TxPurpose::Issue, Some(&cert.id), Some(&network));
        let tx = match self.transactions.insert_transaction(&record).await {
            Ok(()) => {
                auxiliary.push((AuxiliaryKind::TransactionRecord, AuxiliaryStatus::Applied));
                Some(record)
            }
            Err(e) => {
                note(
                    &mut auxiliary,
                    AuxiliaryKind::TransactionRecord,
                    Err(e),
                    "failed to record issue transaction",
                );
                None
            }
        };

        let event = AuditEvent::new(
            &cert.id,
            AuditAction::Issued,
            Actor::new(cert.requested_by_user_id.clone(), input.actor_role),
            json!({
                "txHash": tx_hash,
                "metadataHash": cert.metadata_hash,
                "certificateName": cert.certificate_name,
                "network": network,
            }),
        );
        note(
            &mut auxiliary,
            AuxiliaryKind::AuditEvent,
            self.events.insert_event(&event).await,
            "failed to record issued audit event",
        );

        Ok(finish(IssuedCertificate { cert, tx }, auxiliary))
    }

    /// Asks the ledger whether a hash is registered. Ledger errors are failures, not "no".
    #[instrument(skip(self))]
    pub async fn check_certificate_issued(&self, hash: &str) -> ServiceResult<IssuedCheck> {
        let hash = hash.trim();
        if hash.is_empty() {
            return Err(ServiceError::validation("hash is required"));
        }
        let value = self.ledger.verify_document(hash).await.map_err(|e| {
            warn!(error = %e, "verify_document failed");
            ServiceError::upstream(
                LedgerStage::VerifyDocument,
                "failed to verify document on chain",
                e,
            )
        })?;
        Ok(IssuedCheck {
            issued: value.is_some(),
            value,
        })
    }

    #[instrument(skip(self, query))]
    pub async fn get_all_certificates(&self, query: &CertificateQuery) -> ServiceResult<CertificatePage> {
        let filter = query.filter();
        let page = query.page_request();
        let (certificates, total) = self.certificates.list_certificates(&filter, &page).await?;

        let ids: Vec<String> = certificates.iter().map(|c| c.id.clone()).collect();
        let mut latest = self.events.latest_events(&ids).await?;

        let certificates = certificates
            .into_iter()
            .map(|certificate| {
                let signed_by = latest.remove(&certificate.id).map(|e| e.actor);
                CertificateSummary {
                    certificate,
                    signed_by,
                }
            })
            .collect();

        Ok(CertificatePage {
            certificates,
            total,
            current_page: page.page,
            total_pages: page.total_pages(total),
        })
    }

    #[instrument(skip(self))]
    pub async fn get_certificate_by_id(&self, id: &str) -> ServiceResult<CertificateDetails> {
        let certificate = self.find(id).await?;
        let events = self.events.events_for(id).await?;
        let transactions = self.transactions.transactions_for(id).await?;
        Ok(CertificateDetails {
            certificate,
            events,
            transactions,
        })
    }

    #[instrument(skip(self, input))]
    pub async fn update_certificate(
        &self,
        id: &str,
        input: UpdateCertificateInput,
    ) -> ServiceResult<Outcome<Certificate>> {
        let actor = input.validate()?;
        let mut cert = self.find(id).await?;

        let old_path = cert.storage_path().map(str::to_string);
        let mut changed: Vec<&'static str> = input.update_data.apply(&mut cert);
        if let Some(file) = input.new_file_meta {
            cert.file = Some(file);
            changed.push("file");
        }
        let mut replaced_path = None;
        if let Some(storage) = input.new_storage_meta {
            cert.storage = Some(self.with_provider(storage));
            changed.push("storage");
            let new_path = cert.storage_path();
            if let Some(old) = &old_path {
                if new_path != Some(old.as_str()) {
                    replaced_path = Some(old.clone());
                }
            }
        }
        cert.updated_at = Utc::now();

        if !self.certificates.update_certificate(&cert).await? {
            return Err(ServiceError::not_found(format!("certificate {} not found", id)));
        }
        info!(certificate_id = %cert.id, ?changed, "certificate updated");

        let mut auxiliary = Vec::new();
        if let Some(old) = &replaced_path {
            let status = match self.files.delete(old).await {
                Ok(true) => AuxiliaryStatus::Applied,
                Ok(false) => AuxiliaryStatus::Skipped,
                Err(e) => {
                    warn!(path = %old, error = %e, "failed to delete replaced file");
                    AuxiliaryStatus::Failed(e.to_string())
                }
            };
            auxiliary.push((AuxiliaryKind::FileCleanup, status));
        }

        let event = AuditEvent::new(
            &cert.id,
            AuditAction::Updated,
            actor,
            json!({
                "changes": changed,
                "fileReplaced": replaced_path.is_some(),
                "previousPath": replaced_path,
            }),
        );
        note(
            &mut auxiliary,
            AuxiliaryKind::AuditEvent,
            self.events.insert_event(&event).await,
            "failed to record updated audit event",
        );

        Ok(finish(cert, auxiliary))
    }

    /// Removes a certificate with its audit trail, transaction mirror and stored file.
    #[instrument(skip(self, input))]
    pub async fn delete_certificate(
        &self,
        id: &str,
        input: DeleteCertificateInput,
    ) -> ServiceResult<Outcome<DeletionReport>> {
        let deleted_by = required(&input.deleted_by_user_id, "deletedByUserId")?;
        let cert = self.find(id).await?;
        let mut report = DeletionReport::default();
        let mut auxiliary = Vec::new();

        match self.events.delete_events_for(id).await {
            Ok(n) => {
                report.events = n;
                auxiliary.push((AuxiliaryKind::DependentCleanup, AuxiliaryStatus::Applied));
            }
            Err(e) => note(
                &mut auxiliary,
                AuxiliaryKind::DependentCleanup,
                Err(e),
                "failed to delete audit events",
            ),
        }
        match self.transactions.delete_transactions_for(id).await {
            Ok(n) => {
                report.transactions = n;
                auxiliary.push((AuxiliaryKind::DependentCleanup, AuxiliaryStatus::Applied));
            }
            Err(e) => note(
                &mut auxiliary,
                AuxiliaryKind::DependentCleanup,
                Err(e),
                "failed to delete transaction records",
            ),
        }

        if !self.certificates.delete_certificate(id).await? {
            return Err(ServiceError::not_found(format!("certificate {} not found", id)));
        }
        report.certificate = 1;

        let file_status = match cert.storage_path() {
            None => AuxiliaryStatus::Skipped,
            Some(path) => match self.files.exists(path).await {
                Ok(false) => AuxiliaryStatus::Skipped,
                Ok(true) => match self.files.delete(path).await {
                    Ok(true) => {
                        report.files_deleted = 1;
                        AuxiliaryStatus::Applied
                    }
                    Ok(false) => AuxiliaryStatus::Skipped,
                    Err(e) => {
                        warn!(path, error = %e, "failed to delete stored file");
                        AuxiliaryStatus::Failed(e.to_string())
                    }
                },
                Err(e) => {
                    warn!(path, error = %e, "failed to check stored file");
                    AuxiliaryStatus::Failed(e.to_string())
                }
            },
        };
        auxiliary.push((AuxiliaryKind::FileCleanup, file_status));

        info!(
            certificate_id = %id,
            deleted_by = %deleted_by,
            events = report.events,
            transactions = report.transactions,
            files = report.files_deleted,
            "certificate deleted"
        );
        Ok(finish(report, auxiliary))
    }

    #[instrument(skip(self))]
    pub async fn init_contract(&self) -> ServiceResult<Outcome<LedgerTx>> {
        let result = self.ledger.init_contract().await;
        self.admin_write("init_contract", TxPurpose::InitContract, result)
            .await
    }

    #[instrument(skip(self))]
    pub async fn whitelist_address(&self, address: &str) -> ServiceResult<Outcome<LedgerTx>> {
        let address = required(&Some(address.to_string()), "address")?;
        let result = self.ledger.whitelist_address(&address).await;
        self.admin_write("whitelist_address", TxPurpose::Whitelist, result)
            .await
    }

    #[instrument(skip(self))]
    pub async fn remove_from_whitelist(&self, address: &str) -> ServiceResult<Outcome<LedgerTx>> {
        let address = required(&Some(address.to_string()), "address")?;
        let result = self.ledger.remove_from_whitelist(&address).await;
        self.admin_write("remove_from_whitelist", TxPurpose::RemoveWhitelist, result)
            .await
    }

    pub async fn is_whitelisted(&self, address: &str) -> ServiceResult<bool> {
        let address = required(&Some(address.to_string()), "address")?;
        self.ledger
            .is_whitelisted(&address)
            .await
            .map_err(|e| admin_error("is_whitelisted", e))
    }

    pub async fn owner_address(&self) -> ServiceResult<String> {
        self.ledger
            .owner_address()
            .await
            .map_err(|e| admin_error("owner_address", e))
    }

    #[instrument(skip(self))]
    pub async fn transfer_ownership(&self, new_owner: &str) -> ServiceResult<Outcome<LedgerTx>> {
        let new_owner = required(&Some(new_owner.to_string()), "newOwner")?;
        let result = self.ledger.transfer_ownership(&new_owner).await;
        self.admin_write("transfer_ownership", TxPurpose::TransferOwnership, result)
            .await
    }

    /// Storage info without a provider is attributed to the configured file storage.
    fn with_provider(&self, mut storage: StorageInfo) -> StorageInfo {
        if storage.provider.as_deref().map_or(true, |p| p.trim().is_empty()) {
            storage.provider = Some(self.files.provider().to_string());
        }
        storage
    }

    async fn find(&self, id: &str) -> ServiceResult<Certificate> {
        self.certificates
            .find_certificate(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("certificate {} not found", id)))
    }

    /// Checks an admin receipt and mirrors it locally, fire-and-forget.
    async fn admin_write(
        &self,
        op: &str,
        purpose: TxPurpose,
        result: Result<Receipt, LedgerError>,
    ) -> ServiceResult<Outcome<LedgerTx>> {
        let receipt = result.map_err(|e| admin_error(op, e))?;
        if !receipt.is_success() {
            // A rejected transaction still landed on chain; keep its hash.
            if let Some(hash) = receipt.tx_hash() {
                let mut record =
                    TransactionRecord::new(hash, purpose, None, Some(self.ledger.network()));
                record.status = TxStatus::Failed;
                if let Err(e) = self.transactions.insert_transaction(&record).await {
                    warn!(op, error = %e, "failed to record failed admin transaction");
                }
            }
            return Err(ServiceError::upstream_reply(
                LedgerStage::Admin,
                format!("blockchain {} failed", op),
            ));
        }

        let mut auxiliary = Vec::new();
        let tx = match receipt.tx_hash() {
            None => {
                auxiliary.push((AuxiliaryKind::TransactionRecord, AuxiliaryStatus::Skipped));
                None
            }
            Some(hash) => {
                let record = TransactionRecord::new(hash, purpose, None, Some(self.ledger.network()));
                match self.transactions.insert_transaction(&record).await {
                    Ok(()) => {
                        auxiliary.push((AuxiliaryKind::TransactionRecord, AuxiliaryStatus::Applied));
                        Some(record)
                    }
                    Err(e) => {
                        note(
                            &mut auxiliary,
                            AuxiliaryKind::TransactionRecord,
                            Err(e),
                            "failed to record admin transaction",
                        );
                        None
                    }
                }
            }
        };
        info!(op, tx_hash = ?receipt.tx_hash(), "ledger admin call succeeded");
        Ok(finish(LedgerTx { receipt, tx }, auxiliary))
    }
}

fn admin_error(op: &str, e: LedgerError) -> ServiceError {
    match e {
        LedgerError::InvalidAddress(addr) => {
            ServiceError::validation(format!("invalid ledger address: {}", addr))
        }
        other => {
            warn!(op, error = %other, "ledger admin call failed");
            ServiceError::upstream(LedgerStage::Admin, format!("blockchain {} call failed", op), other)
        }
    }
}
