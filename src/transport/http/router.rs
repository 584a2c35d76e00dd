use crate::app::{
    CertificateDetails, CertificatePage, CertificateSummary, CreateCertificateInput,
    DeletionReport, IssuedCertificate, IssuedCheck, LedgerTx, UpdateCertificateInput,
};
use crate::domain::{
    Actor, AuditAction, AuditEvent, Certificate, CertificatePatch, CertificateStatus, ChainInfo,
    FileMeta, Role, SortField, SortOrder, StorageInfo, TransactionRecord, TxPurpose, TxStatus,
};
use crate::infra::ledger::{Receipt, ReceiptStatus, VerifiedDocument};
use crate::transport::http::handlers::{certificates, documents, health, ledger};
use crate::transport::http::types::{
    AppState, ErrorBody, HashDocumentRequest, HashDocumentResponse, HealthResponse,
    OwnerResponse, TransferOwnershipRequest, WhitelistRequest, WhitelistStatus,
};
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthcheck_handler,
        certificates::create_certificate_handler,
        certificates::list_certificates_handler,
        certificates::get_certificate_handler,
        certificates::update_certificate_handler,
        certificates::delete_certificate_handler,
        certificates::verify_certificate_handler,
        documents::hash_document_handler,
        ledger::init_contract_handler,
        ledger::whitelist_add_handler,
        ledger::whitelist_remove_handler,
        ledger::whitelist_check_handler,
        ledger::owner_handler,
        ledger::transfer_ownership_handler
    ),
    components(schemas(
        ErrorBody,
        HealthResponse,
        CreateCertificateInput,
        UpdateCertificateInput,
        CertificatePatch,
        IssuedCertificate,
        IssuedCheck,
        CertificatePage,
        CertificateSummary,
        CertificateDetails,
        DeletionReport,
        Certificate,
        CertificateStatus,
        ChainInfo,
        StorageInfo,
        FileMeta,
        AuditEvent,
        AuditAction,
        Actor,
        Role,
        TransactionRecord,
        TxPurpose,
        TxStatus,
        SortField,
        SortOrder,
        VerifiedDocument,
        Receipt,
        ReceiptStatus,
        LedgerTx,
        HashDocumentRequest,
        HashDocumentResponse,
        WhitelistRequest,
        WhitelistStatus,
        TransferOwnershipRequest,
        OwnerResponse
    ))
)]
pub struct ApiDoc;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::healthcheck_handler))
        .route(
            "/api/certificates",
            post(certificates::create_certificate_handler).get(certificates::list_certificates_handler),
        )
        .route(
            "/api/certificates/verify/:hash",
            get(certificates::verify_certificate_handler),
        )
        .route(
            "/api/certificates/:id",
            get(certificates::get_certificate_handler)
                .patch(certificates::update_certificate_handler)
                .delete(certificates::delete_certificate_handler),
        )
        .route("/api/documents/hash", post(documents::hash_document_handler))
        .route("/api/ledger/init", post(ledger::init_contract_handler))
        .route("/api/ledger/whitelist", post(ledger::whitelist_add_handler))
        .route(
            "/api/ledger/whitelist/:address",
            get(ledger::whitelist_check_handler).delete(ledger::whitelist_remove_handler),
        )
        .route(
            "/api/ledger/owner",
            get(ledger::owner_handler).post(ledger::transfer_ownership_handler),
        )
        .with_state(app_state)
}
