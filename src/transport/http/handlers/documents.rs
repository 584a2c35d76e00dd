use crate::app::ServiceError;
use crate::crypto::hash_document;
use crate::transport::http::types::{
    json_body, ApiError, ApiResult, HashDocumentRequest, HashDocumentResponse,
};
use axum::extract::rejection::JsonRejection;
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

#[utoipa::path(
    post,
    path = "/api/documents/hash",
    request_body = HashDocumentRequest,
    responses(
        (status = 200, description = "SHA-256 of the decoded document, lowercase hex", body = HashDocumentResponse),
        (status = 400, description = "Body is not valid base64", body = ErrorBody)
    )
)]
pub async fn hash_document_handler(
    request: Result<Json<HashDocumentRequest>, JsonRejection>,
) -> ApiResult<Json<HashDocumentResponse>> {
    let request = json_body(request, "{\"contentBase64\": \"...\"}")?;
    let bytes = STANDARD
        .decode(request.content_base64.trim())
        .map_err(|e| ApiError(ServiceError::validation(format!("contentBase64: {}", e))))?;
    Ok(Json(HashDocumentResponse {
        hash: hash_document(&bytes),
    }))
}
