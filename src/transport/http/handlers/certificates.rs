use crate::app::{
    CertificateDetails, CertificatePage, CreateCertificateInput, DeleteCertificateInput,
    DeletionReport, IssuedCertificate, IssuedCheck, ServiceError, UpdateCertificateInput,
};
use crate::domain::{Capability, Certificate, CertificateQuery};
use crate::transport::http::types::{
    json_body, ApiError, ApiResult, AppState, OutcomeBody, RequestActor,
};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

#[utoipa::path(
    post,
    path = "/api/certificates",
    request_body = CreateCertificateInput,
    responses(
        (status = 201, description = "Certificate anchored on the ledger and recorded", body = IssuedCertificate),
        (status = 400, description = "Missing or blank required field", body = ErrorBody),
        (status = 401, description = "No caller identity", body = ErrorBody),
        (status = 403, description = "Role may not issue certificates", body = ErrorBody),
        (status = 409, description = "Hash already registered", body = ErrorBody),
        (status = 502, description = "Ledger call failed", body = ErrorBody)
    )
)]
pub async fn create_certificate_handler(
    State(state): State<AppState>,
    actor: RequestActor,
    request: Result<Json<CreateCertificateInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<OutcomeBody<IssuedCertificate>>)> {
    actor.require(Capability::IssueCertificate)?;
    let mut input = json_body(request, "certificate fields")?;
    input.requested_by_user_id = Some(actor.user_id);
    input.actor_role = Some(actor.role);

    let outcome = state.service.create_certificate(input).await?;
    Ok((StatusCode::CREATED, Json(outcome.into())))
}

#[utoipa::path(
    get,
    path = "/api/certificates",
    params(CertificateQuery),
    responses(
        (status = 200, description = "One page of certificates", body = CertificatePage),
        (status = 400, description = "Malformed query", body = ErrorBody),
        (status = 401, description = "No caller identity", body = ErrorBody)
    )
)]
pub async fn list_certificates_handler(
    State(state): State<AppState>,
    actor: RequestActor,
    query: Result<Query<CertificateQuery>, QueryRejection>,
) -> ApiResult<Json<CertificatePage>> {
    actor.require(Capability::ViewCertificates)?;
    let Query(query) = query
        .map_err(|e| ApiError(ServiceError::validation(format!("Invalid query: {}", e.body_text()))))?;
    Ok(Json(state.service.get_all_certificates(&query).await?))
}

#[utoipa::path(
    get,
    path = "/api/certificates/{id}",
    params(("id" = String, Path, description = "Certificate id")),
    responses(
        (status = 200, description = "Certificate with its audit trail and transactions", body = CertificateDetails),
        (status = 404, description = "Unknown certificate", body = ErrorBody)
    )
)]
pub async fn get_certificate_handler(
    State(state): State<AppState>,
    actor: RequestActor,
    Path(id): Path<String>,
) -> ApiResult<Json<CertificateDetails>> {
    actor.require(Capability::ViewCertificates)?;
    Ok(Json(state.service.get_certificate_by_id(&id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/certificates/{id}",
    params(("id" = String, Path, description = "Certificate id")),
    request_body = UpdateCertificateInput,
    responses(
        (status = 200, description = "Updated certificate", body = Certificate),
        (status = 400, description = "Nothing to update", body = ErrorBody),
        (status = 404, description = "Unknown certificate", body = ErrorBody)
    )
)]
pub async fn update_certificate_handler(
    State(state): State<AppState>,
    actor: RequestActor,
    Path(id): Path<String>,
    request: Result<Json<UpdateCertificateInput>, JsonRejection>,
) -> ApiResult<Json<OutcomeBody<Certificate>>> {
    actor.require(Capability::ManageCertificates)?;
    let mut input = json_body(request, "{\"updateData\": {...}}")?;
    input.updated_by_user_id = Some(actor.user_id);
    input.actor_role = Some(actor.role);

    let outcome = state.service.update_certificate(&id, input).await?;
    Ok(Json(outcome.into()))
}

#[utoipa::path(
    delete,
    path = "/api/certificates/{id}",
    params(("id" = String, Path, description = "Certificate id")),
    responses(
        (status = 200, description = "What was removed", body = DeletionReport),
        (status = 404, description = "Unknown certificate", body = ErrorBody)
    )
)]
pub async fn delete_certificate_handler(
    State(state): State<AppState>,
    actor: RequestActor,
    Path(id): Path<String>,
) -> ApiResult<Json<OutcomeBody<DeletionReport>>> {
    actor.require(Capability::ManageCertificates)?;
    let input = DeleteCertificateInput {
        deleted_by_user_id: Some(actor.user_id),
        actor_role: Some(actor.role),
    };
    let outcome = state.service.delete_certificate(&id, input).await?;
    Ok(Json(outcome.into()))
}

#[utoipa::path(
    get,
    path = "/api/certificates/verify/{hash}",
    params(("hash" = String, Path, description = "Document hash, hex, optional 0x prefix")),
    responses(
        (status = 200, description = "Whether the ledger holds the hash", body = IssuedCheck),
        (status = 502, description = "Ledger call failed", body = ErrorBody)
    )
)]
pub async fn verify_certificate_handler(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> ApiResult<Json<IssuedCheck>> {
    Ok(Json(state.service.check_certificate_issued(&hash).await?))
}
