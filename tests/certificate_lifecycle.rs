use async_trait::async_trait;
use certchain::app::{
    AuxiliaryKind, AuxiliaryStatus, CertificateService, CreateCertificateInput,
    DeleteCertificateInput, LedgerStage, ServiceError, UpdateCertificateInput,
};
use certchain::domain::{
    AuditAction, CertificatePatch, CertificateQuery, CertificateStatus, Role, StorageInfo,
    TxPurpose, TxStatus,
};
use certchain::infra::ledger::{
    DocumentMetadata, InMemoryLedger, LedgerDocument, LedgerError, LedgerGateway, LedgerOp,
    LedgerResult, Receipt, ReceiptStatus, StoreResponse, VerifiedDocument,
};
use certchain::storage::{MemoryFileStorage, MemoryStore, StoreOp};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Ledger with canned answers for the duplicate check, the store call and admin writes.
struct ScriptedLedger {
    existing: Option<LedgerDocument>,
    receipt: Receipt,
    admin_receipt: Option<Receipt>,
    reads: AtomicUsize,
    stores: AtomicUsize,
}

impl ScriptedLedger {
    fn new(existing: Option<LedgerDocument>, receipt: Receipt) -> Arc<Self> {
        Arc::new(Self {
            existing,
            receipt,
            admin_receipt: None,
            reads: AtomicUsize::new(0),
            stores: AtomicUsize::new(0),
        })
    }

    fn with_admin_receipt(admin_receipt: Receipt) -> Arc<Self> {
        Arc::new(Self {
            existing: None,
            receipt: Receipt::success("0x123"),
            admin_receipt: Some(admin_receipt),
            reads: AtomicUsize::new(0),
            stores: AtomicUsize::new(0),
        })
    }

    fn admin(&self) -> LedgerResult<Receipt> {
        self.admin_receipt
            .clone()
            .ok_or_else(|| LedgerError::Rejected("not scripted".into()))
    }
}

#[async_trait]
impl LedgerGateway for ScriptedLedger {
    fn network(&self) -> &str {
        "testnet"
    }

    async fn read_document(&self, _hash: &str) -> LedgerResult<Option<LedgerDocument>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.existing.clone())
    }

    async fn store_document(
        &self,
        _name: &str,
        _hash: &str,
        _metadata: &DocumentMetadata,
    ) -> LedgerResult<Receipt> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        Ok(self.receipt.clone())
    }

    async fn verify_document(&self, _hash: &str) -> LedgerResult<Option<VerifiedDocument>> {
        Ok(self.existing.clone().map(VerifiedDocument::from))
    }

    async fn is_whitelisted(&self, _address: &str) -> LedgerResult<bool> {
        Ok(false)
    }

    async fn init_contract(&self) -> LedgerResult<Receipt> {
        self.admin()
    }

    async fn whitelist_address(&self, _address: &str) -> LedgerResult<Receipt> {
        self.admin()
    }

    async fn remove_from_whitelist(&self, _address: &str) -> LedgerResult<Receipt> {
        self.admin()
    }

    async fn owner_address(&self) -> LedgerResult<String> {
        Err(LedgerError::Rejected("not scripted".into()))
    }

    async fn transfer_ownership(&self, _new_owner: &str) -> LedgerResult<Receipt> {
        self.admin()
    }
}

struct Harness {
    service: Arc<CertificateService>,
    ledger: InMemoryLedger,
    store: MemoryStore,
    files: MemoryFileStorage,
}

fn harness() -> Harness {
    let ledger = InMemoryLedger::initialized("service-signer");
    let store = MemoryStore::new();
    let files = MemoryFileStorage::new();
    let service = CertificateService::with_store(
        Arc::new(ledger.clone()),
        Arc::new(store.clone()),
        Arc::new(files.clone()),
    );
    Harness {
        service: Arc::new(service),
        ledger,
        store,
        files,
    }
}

fn scripted(ledger: Arc<ScriptedLedger>) -> (CertificateService, MemoryStore) {
    let store = MemoryStore::new();
    let service = CertificateService::with_store(
        ledger,
        Arc::new(store.clone()),
        Arc::new(MemoryFileStorage::new()),
    );
    (service, store)
}

fn cert_a() -> CreateCertificateInput {
    CreateCertificateInput {
        certificate_name: Some("Cert A".into()),
        company_id: Some("acme".into()),
        subject: Some("Alice".into()),
        metadata_hash: Some("abc123".into()),
        requested_by_user_id: Some("u1".into()),
        actor_role: Some(Role::Company),
        ..Default::default()
    }
}

fn input(name: &str, subject: &str, hash: &str) -> CreateCertificateInput {
    CreateCertificateInput {
        certificate_name: Some(name.into()),
        subject: Some(subject.into()),
        metadata_hash: Some(hash.into()),
        requested_by_user_id: Some("u1".into()),
        company_id: Some("acme".into()),
        ..Default::default()
    }
}

fn with_file(mut input: CreateCertificateInput, path: &str) -> CreateCertificateInput {
    input.storage_meta = Some(StorageInfo {
        provider: Some("memory".into()),
        path: Some(path.into()),
        public_url: None,
    });
    input
}

#[tokio::test]
async fn missing_required_fields_touch_nothing() {
    let h = harness();
    let clear: [fn(&mut CreateCertificateInput); 5] = [
        |i| i.certificate_name = None,
        |i| i.company_id = None,
        |i| i.subject = None,
        |i| i.metadata_hash = Some("  ".into()),
        |i| i.requested_by_user_id = None,
    ];
    for f in clear {
        let mut input = cert_a();
        f(&mut input);
        let err = h.service.create_certificate(input).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)), "got {:?}", err);
    }
    assert_eq!(h.ledger.call_count(LedgerOp::ReadDocument).await, 0);
    assert_eq!(h.ledger.call_count(LedgerOp::StoreDocument).await, 0);
    assert_eq!(h.store.total_calls().await, 0);
}

#[tokio::test]
async fn success_receipt_becomes_issued_certificate() {
    let ledger = ScriptedLedger::new(None, Receipt::success("0x123"));
    let (service, store) = scripted(ledger.clone());

    let outcome = service.create_certificate(cert_a()).await.unwrap();
    assert!(outcome.is_clean());
    let issued = outcome.into_primary();
    assert_eq!(issued.cert.chain.tx_hash_issue.as_deref(), Some("0x123"));
    assert_eq!(issued.cert.chain.network.as_deref(), Some("testnet"));
    assert_eq!(issued.cert.status, CertificateStatus::Issued);
    assert_eq!(issued.cert.metadata_hash, "abc123");

    let tx = issued.tx.expect("transaction record written");
    assert_eq!(tx.tx_hash, "0x123");
    assert_eq!(tx.purpose, TxPurpose::Issue);
    assert_eq!(tx.certificate_id.as_deref(), Some(issued.cert.id.as_str()));

    assert_eq!(store.certificate_count().await, 1);
    assert_eq!(store.event_count().await, 1);
    assert_eq!(ledger.stores.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn existing_document_on_chain_is_a_conflict() {
    let existing = LedgerDocument {
        name: "Cert A".into(),
        hash: "abc123".into(),
        timestamp: 1,
        added_by: "someone".into(),
    };
    let ledger = ScriptedLedger::new(Some(existing), Receipt::success("0x123"));
    let (service, store) = scripted(ledger.clone());

    let err = service.create_certificate(cert_a()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
    assert_eq!(ledger.reads.load(Ordering::SeqCst), 1);
    assert_eq!(ledger.stores.load(Ordering::SeqCst), 0);
    assert_eq!(store.certificate_count().await, 0);
}

#[tokio::test]
async fn hash_is_matched_on_chain_exactly_as_given() {
    let h = harness();
    h.ledger.seed_document("other client", "ABC123").await;

    let mut upper = cert_a();
    upper.metadata_hash = Some(" ABC123 ".into());
    let err = h.service.create_certificate(upper).await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(m) if m.contains("on chain")));
    assert_eq!(h.ledger.call_count(LedgerOp::StoreDocument).await, 0);
    assert_eq!(h.ledger.document_count().await, 1);
    assert_eq!(h.store.certificate_count().await, 0);

    assert!(h.service.check_certificate_issued("ABC123").await.unwrap().issued);
}

#[tokio::test]
async fn storage_without_provider_is_attributed_to_file_storage() {
    let h = harness();
    let mut input = with_file(cert_a(), "certs/a.pdf");
    if let Some(storage) = input.storage_meta.as_mut() {
        storage.provider = None;
    }
    let cert = h
        .service
        .create_certificate(input)
        .await
        .unwrap()
        .into_primary()
        .cert;
    let storage = cert.storage.unwrap();
    assert_eq!(storage.provider.as_deref(), Some("memory"));
    assert_eq!(storage.path.as_deref(), Some("certs/a.pdf"));
}

#[tokio::test]
async fn receipt_without_tx_hash_creates_nothing() {
    let receipt = Receipt {
        status: ReceiptStatus::Success,
        tx_hash: None,
        on_chain_id: None,
    };
    let (service, store) = scripted(ScriptedLedger::new(None, receipt));

    let err = service.create_certificate(cert_a()).await.unwrap_err();
    assert_eq!(err.stage(), Some(LedgerStage::MissingTxHash));
    assert_eq!(err.to_string(), "missing txHash from blockchain receipt");
    assert_eq!(store.certificate_count().await, 0);
    assert_eq!(store.transaction_count().await, 0);
}

#[tokio::test]
async fn ledger_failures_map_to_their_stage() {
    let h = harness();

    h.ledger.fail_on(LedgerOp::ReadDocument).await;
    let err = h.service.create_certificate(cert_a()).await.unwrap_err();
    assert_eq!(err.stage(), Some(LedgerStage::DuplicateCheck));
    assert_eq!(err.to_string(), "failed to verify existing document on chain");
    assert_eq!(h.ledger.call_count(LedgerOp::StoreDocument).await, 0);
    h.ledger.recover(LedgerOp::ReadDocument).await;

    h.ledger.fail_on(LedgerOp::StoreDocument).await;
    let err = h.service.create_certificate(cert_a()).await.unwrap_err();
    assert_eq!(err.stage(), Some(LedgerStage::StoreDocument));
    assert_eq!(err.to_string(), "blockchain store_document call failed");
    h.ledger.recover(LedgerOp::StoreDocument).await;

    h.ledger.set_store_response(StoreResponse::FailedStatus).await;
    let err = h.service.create_certificate(cert_a()).await.unwrap_err();
    assert_eq!(err.stage(), Some(LedgerStage::StoreStatus));
    assert_eq!(err.to_string(), "blockchain store_document failed");

    assert_eq!(h.store.certificate_count().await, 0);
}

#[tokio::test]
async fn failed_transaction_record_still_issues() {
    let h = harness();
    h.store.fail_on(StoreOp::InsertTransaction).await;

    let outcome = h.service.create_certificate(cert_a()).await.unwrap();
    assert!(!outcome.is_clean());
    assert!(matches!(
        outcome.status_of(AuxiliaryKind::TransactionRecord),
        Some(AuxiliaryStatus::Failed(_))
    ));
    assert_eq!(
        outcome.status_of(AuxiliaryKind::AuditEvent),
        Some(&AuxiliaryStatus::Applied)
    );
    let issued = outcome.into_primary();
    assert!(issued.tx.is_none());
    assert_eq!(h.store.certificate_count().await, 1);
}

#[tokio::test]
async fn failed_audit_event_still_issues_with_tx() {
    let h = harness();
    h.store.fail_on(StoreOp::InsertEvent).await;

    let outcome = h.service.create_certificate(cert_a()).await.unwrap();
    assert_eq!(outcome.failures().count(), 1);
    assert!(outcome.primary.tx.is_some());
    assert_eq!(h.store.event_count().await, 0);
}

#[tokio::test]
async fn persistence_failure_after_store_is_surfaced() {
    let h = harness();
    h.store.fail_on(StoreOp::InsertCertificate).await;

    let err = h.service.create_certificate(cert_a()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Persistence(_)));
    // The ledger keeps the document; nothing is rolled back there.
    assert_eq!(h.ledger.document_count().await, 1);
    assert_eq!(h.store.transaction_count().await, 0);
}

#[tokio::test]
async fn concurrent_issue_of_same_hash_is_rejected_in_flight() {
    let h = harness();
    let hold = h.ledger.hold_stores().await;

    let service = h.service.clone();
    let first = tokio::spawn(async move { service.create_certificate(cert_a()).await });
    hold.entered().await;

    let mut second = cert_a();
    second.metadata_hash = Some("  abc123 ".into());
    let err = h.service.create_certificate(second).await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
    assert_eq!(h.ledger.call_count(LedgerOp::ReadDocument).await, 1);

    hold.release();
    let outcome = first.await.unwrap().unwrap();
    assert_eq!(outcome.primary.cert.metadata_hash, "abc123");
    assert_eq!(h.store.certificate_count().await, 1);

    // Guard is released: a retry now hits the on-chain duplicate check.
    let err = h.service.create_certificate(cert_a()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(m) if m.contains("on chain")));
}

#[tokio::test]
async fn check_issued_reports_ledger_state() {
    let h = harness();
    h.service.create_certificate(cert_a()).await.unwrap();

    let check = h.service.check_certificate_issued(" abc123 ").await.unwrap();
    assert!(check.issued);
    assert!(check.value.unwrap().verified_document);

    // Registry keys are case sensitive.
    let check = h.service.check_certificate_issued("ABC123").await.unwrap();
    assert!(!check.issued);

    let check = h.service.check_certificate_issued("ffff").await.unwrap();
    assert!(!check.issued);

    h.ledger.fail_on(LedgerOp::VerifyDocument).await;
    let err = h.service.check_certificate_issued("abc123").await.unwrap_err();
    assert_eq!(err.stage(), Some(LedgerStage::VerifyDocument));

    let err = h.service.check_certificate_issued(" ").await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn listing_pages_filters_and_reports_signer() {
    let h = harness();
    for i in 0..12 {
        let subject = if i % 2 == 0 { "Alice" } else { "Bob" };
        h.service
            .create_certificate(input(&format!("Cert {:02}", i), subject, &format!("h{:02}", i)))
            .await
            .unwrap();
    }

    let page = h
        .service
        .get_all_certificates(&CertificateQuery::default())
        .await
        .unwrap();
    assert_eq!(page.total, 12);
    assert_eq!(page.certificates.len(), 10);
    assert_eq!(page.current_page, 1);
    assert_eq!(page.total_pages, 2);
    let signer = page.certificates[0].signed_by.as_ref().unwrap();
    assert_eq!(signer.user_id, "u1");

    let query = CertificateQuery {
        page: Some(2),
        limit: Some(4),
        search: Some("bob".into()),
        ..Default::default()
    };
    let page = h.service.get_all_certificates(&query).await.unwrap();
    assert_eq!(page.total, 6);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.certificates.len(), 2);
    assert!(page.certificates.iter().all(|c| c.certificate.subject == "Bob"));
}

#[tokio::test]
async fn latest_event_actor_is_the_signer() {
    let h = harness();
    let cert = h
        .service
        .create_certificate(cert_a())
        .await
        .unwrap()
        .into_primary()
        .cert;

    let update = UpdateCertificateInput {
        update_data: CertificatePatch {
            status: Some(CertificateStatus::Revoked),
            ..Default::default()
        },
        updated_by_user_id: Some("admin-7".into()),
        actor_role: Some(Role::SuperAdmin),
        ..Default::default()
    };
    h.service.update_certificate(&cert.id, update).await.unwrap();

    let page = h
        .service
        .get_all_certificates(&CertificateQuery::default())
        .await
        .unwrap();
    let signer = page.certificates[0].signed_by.as_ref().unwrap();
    assert_eq!(signer.user_id, "admin-7");
    assert_eq!(signer.role, Some(Role::SuperAdmin));
}

#[tokio::test]
async fn details_include_events_and_transactions() {
    let h = harness();
    let cert = h
        .service
        .create_certificate(cert_a())
        .await
        .unwrap()
        .into_primary()
        .cert;

    let details = h.service.get_certificate_by_id(&cert.id).await.unwrap();
    assert_eq!(details.certificate.id, cert.id);
    assert_eq!(details.events.len(), 1);
    assert_eq!(details.events[0].action, AuditAction::Issued);
    assert_eq!(details.transactions.len(), 1);

    let err = h.service.get_certificate_by_id("missing").await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn replacing_file_deletes_old_path_even_if_delete_fails() {
    let h = harness();
    h.files.put("certs/old.pdf").await;
    let cert = h
        .service
        .create_certificate(with_file(cert_a(), "certs/old.pdf"))
        .await
        .unwrap()
        .into_primary()
        .cert;

    h.files.set_failing(true).await;
    let update = UpdateCertificateInput {
        new_storage_meta: Some(StorageInfo {
            provider: Some("memory".into()),
            path: Some("certs/new.pdf".into()),
            public_url: None,
        }),
        updated_by_user_id: Some("u1".into()),
        ..Default::default()
    };
    let outcome = h.service.update_certificate(&cert.id, update).await.unwrap();
    assert!(matches!(
        outcome.status_of(AuxiliaryKind::FileCleanup),
        Some(AuxiliaryStatus::Failed(_))
    ));
    assert_eq!(outcome.primary.storage_path(), Some("certs/new.pdf"));

    let stored = h.service.get_certificate_by_id(&cert.id).await.unwrap();
    assert_eq!(stored.certificate.storage_path(), Some("certs/new.pdf"));
    assert!(h.files.contains("certs/old.pdf").await);
}

#[tokio::test]
async fn replacing_file_removes_previous_path() {
    let h = harness();
    h.files.put("certs/old.pdf").await;
    let cert = h
        .service
        .create_certificate(with_file(cert_a(), "certs/old.pdf"))
        .await
        .unwrap()
        .into_primary()
        .cert;

    let update = UpdateCertificateInput {
        update_data: CertificatePatch {
            subject: Some("Alice Smith".into()),
            ..Default::default()
        },
        new_storage_meta: Some(StorageInfo {
            provider: Some("memory".into()),
            path: Some("certs/new.pdf".into()),
            public_url: None,
        }),
        updated_by_user_id: Some("u1".into()),
        ..Default::default()
    };
    let outcome = h.service.update_certificate(&cert.id, update).await.unwrap();
    assert!(outcome.is_clean());
    assert_eq!(h.files.deleted().await, vec!["certs/old.pdf".to_string()]);
    assert_eq!(outcome.primary.subject, "Alice Smith");

    let events = h.service.get_certificate_by_id(&cert.id).await.unwrap().events;
    let updated = events.last().unwrap();
    assert_eq!(updated.action, AuditAction::Updated);
    assert_eq!(updated.details["fileReplaced"], true);
}

#[tokio::test]
async fn update_with_failing_audit_write_returns_certificate() {
    let h = harness();
    let cert = h
        .service
        .create_certificate(cert_a())
        .await
        .unwrap()
        .into_primary()
        .cert;
    h.store.fail_on(StoreOp::InsertEvent).await;

    let update = UpdateCertificateInput {
        update_data: CertificatePatch {
            certificate_name: Some("Cert A v2".into()),
            ..Default::default()
        },
        updated_by_user_id: Some("u1".into()),
        ..Default::default()
    };
    let outcome = h.service.update_certificate(&cert.id, update).await.unwrap();
    assert_eq!(outcome.failures().count(), 1);
    assert_eq!(outcome.primary.certificate_name, "Cert A v2");
    assert!(outcome.primary.updated_at >= cert.updated_at);
}

#[tokio::test]
async fn update_rejects_empty_changes_and_unknown_ids() {
    let h = harness();
    let empty = UpdateCertificateInput {
        updated_by_user_id: Some("u1".into()),
        ..Default::default()
    };
    let err = h.service.update_certificate("x", empty).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let update = UpdateCertificateInput {
        update_data: CertificatePatch {
            subject: Some("Bob".into()),
            ..Default::default()
        },
        updated_by_user_id: Some("u1".into()),
        ..Default::default()
    };
    let err = h.service.update_certificate("missing", update).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn delete_removes_dependents_when_file_is_missing() {
    let h = harness();
    let cert = h
        .service
        .create_certificate(with_file(cert_a(), "certs/gone.pdf"))
        .await
        .unwrap()
        .into_primary()
        .cert;

    let outcome = h
        .service
        .delete_certificate(
            &cert.id,
            DeleteCertificateInput {
                deleted_by_user_id: Some("u1".into()),
                actor_role: Some(Role::Company),
            },
        )
        .await
        .unwrap();
    let report = outcome.primary;
    assert_eq!(report.certificate, 1);
    assert_eq!(report.events, 1);
    assert_eq!(report.transactions, 1);
    assert_eq!(report.files_deleted, 0);

    assert_eq!(h.store.certificate_count().await, 0);
    assert_eq!(h.store.event_count().await, 0);
    assert_eq!(h.store.transaction_count().await, 0);
}

#[tokio::test]
async fn delete_removes_stored_file() {
    let h = harness();
    h.files.put("certs/a.pdf").await;
    let cert = h
        .service
        .create_certificate(with_file(cert_a(), "certs/a.pdf"))
        .await
        .unwrap()
        .into_primary()
        .cert;

    let report = h
        .service
        .delete_certificate(
            &cert.id,
            DeleteCertificateInput {
                deleted_by_user_id: Some("u1".into()),
                actor_role: None,
            },
        )
        .await
        .unwrap()
        .into_primary();
    assert_eq!(report.files_deleted, 1);
    assert!(!h.files.contains("certs/a.pdf").await);
}

#[tokio::test]
async fn delete_survives_failing_dependent_cleanup() {
    let h = harness();
    let cert = h
        .service
        .create_certificate(cert_a())
        .await
        .unwrap()
        .into_primary()
        .cert;
    h.store.fail_on(StoreOp::DeleteEvents).await;

    let outcome = h
        .service
        .delete_certificate(
            &cert.id,
            DeleteCertificateInput {
                deleted_by_user_id: Some("u1".into()),
                actor_role: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.failures().count(), 1);
    assert_eq!(outcome.primary.events, 0);
    assert_eq!(outcome.primary.transactions, 1);
    assert_eq!(h.store.certificate_count().await, 0);

    let err = h
        .service
        .delete_certificate(
            &cert.id,
            DeleteCertificateInput {
                deleted_by_user_id: Some("u1".into()),
                actor_role: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn delete_requires_actor() {
    let h = harness();
    let err = h
        .service
        .delete_certificate("any", DeleteCertificateInput::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn admin_operations_record_transactions() {
    let ledger = InMemoryLedger::new("owner-key");
    let store = MemoryStore::new();
    let service = CertificateService::with_store(
        Arc::new(ledger.clone()),
        Arc::new(store.clone()),
        Arc::new(MemoryFileStorage::new()),
    );

    let outcome = service.init_contract().await.unwrap();
    assert!(outcome.primary.receipt.is_success());
    assert_eq!(outcome.primary.tx.as_ref().unwrap().purpose, TxPurpose::InitContract);
    assert_eq!(service.owner_address().await.unwrap(), "owner-key");

    let err = service.init_contract().await.unwrap_err();
    assert_eq!(err.stage(), Some(LedgerStage::Admin));

    service.whitelist_address("issuer-1").await.unwrap();
    assert!(service.is_whitelisted("issuer-1").await.unwrap());
    service.remove_from_whitelist("issuer-1").await.unwrap();
    assert!(!service.is_whitelisted("issuer-1").await.unwrap());

    let err = service.whitelist_address("  ").await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let err = service.transfer_ownership("owner-key").await.unwrap_err();
    assert_eq!(err.stage(), Some(LedgerStage::Admin));

    let outcome = service.transfer_ownership("successor-key").await.unwrap();
    assert_eq!(
        outcome.primary.tx.as_ref().unwrap().purpose,
        TxPurpose::TransferOwnership
    );
    assert_eq!(service.owner_address().await.unwrap(), "successor-key");

    // The service signer gave up its admin rights with the transfer.
    let err = service.whitelist_address("issuer-2").await.unwrap_err();
    assert_eq!(err.stage(), Some(LedgerStage::Admin));

    assert_eq!(store.transaction_count().await, 4);
}

#[tokio::test]
async fn rejected_admin_receipt_is_mirrored_as_failed() {
    let receipt = Receipt {
        status: ReceiptStatus::Failed,
        tx_hash: Some("0xdead".into()),
        on_chain_id: None,
    };
    let (service, store) = scripted(ScriptedLedger::with_admin_receipt(receipt));

    let err = service.whitelist_address("issuer-1").await.unwrap_err();
    assert_eq!(err.stage(), Some(LedgerStage::Admin));

    let mirrored = store.transactions().await;
    assert_eq!(mirrored.len(), 1);
    assert_eq!(mirrored[0].tx_hash, "0xdead");
    assert_eq!(mirrored[0].purpose, TxPurpose::Whitelist);
    assert_eq!(mirrored[0].status, TxStatus::Failed);
}

#[tokio::test]
async fn issuing_on_uninitialized_registry_fails_upstream() {
    let ledger = InMemoryLedger::new("owner-key");
    let store = MemoryStore::new();
    let service = CertificateService::with_store(
        Arc::new(ledger),
        Arc::new(store.clone()),
        Arc::new(MemoryFileStorage::new()),
    );

    let err = service.create_certificate(cert_a()).await.unwrap_err();
    assert_eq!(err.stage(), Some(LedgerStage::StoreDocument));
    assert_eq!(store.certificate_count().await, 0);
}
