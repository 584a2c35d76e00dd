use crate::app::{AuxiliaryWrite, CertificateService, Outcome, ServiceError};
use crate::domain::{Capability, Role};
use crate::storage::PgStore;
use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CertificateService>,
    /// Present when certificates live in Postgres; used by the health check.
    pub db: Option<PgStore>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// A [`ServiceError`] rendered as `{ code, message }` with its status.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "request failed");
            "internal server error".to_string()
        } else {
            self.0.to_string()
        };
        (
            status,
            Json(ErrorBody {
                code: self.0.code().to_string(),
                message,
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Unwraps a JSON body, turning a malformed one into a validation error.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>, expected: &str) -> ApiResult<T> {
    body.map(|Json(v)| v).map_err(|e| {
        ApiError(ServiceError::validation(format!(
            "Invalid JSON body: {} (expected: {})",
            e.body_text(),
            expected
        )))
    })
}

/// The caller as identified by the upstream auth layer.
#[derive(Debug, Clone)]
pub struct RequestActor {
    pub user_id: String,
    pub role: Role,
}

impl RequestActor {
    pub fn require(&self, capability: Capability) -> ApiResult<()> {
        if self.role.can(capability) {
            Ok(())
        } else {
            Err(ApiError(ServiceError::Forbidden(format!(
                "role {} may not perform this action",
                self.role.as_str()
            ))))
        }
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let unauthorized = |msg: &str| ApiError(ServiceError::Unauthorized(msg.to_string()));
        let user_id = header(parts, USER_ID_HEADER).ok_or_else(|| unauthorized("missing user identity"))?;
        let role = header(parts, USER_ROLE_HEADER).ok_or_else(|| unauthorized("missing user role"))?;
        let role = Role::parse(role).ok_or_else(|| unauthorized("unrecognized user role"))?;
        Ok(RequestActor {
            user_id: user_id.to_string(),
            role,
        })
    }
}

/// A successful body plus the fate of its best-effort writes.
#[derive(Serialize, Debug)]
pub struct OutcomeBody<T: Serialize> {
    #[serde(flatten)]
    pub data: T,
    pub auxiliary: Vec<AuxiliaryWrite>,
}

impl<T: Serialize> From<Outcome<T>> for OutcomeBody<T> {
    fn from(outcome: Outcome<T>) -> Self {
        Self {
            data: outcome.primary,
            auxiliary: outcome.auxiliary,
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HashDocumentRequest {
    /// Document bytes, base64 encoded.
    pub content_base64: String,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct HashDocumentResponse {
    pub hash: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct WhitelistRequest {
    pub address: String,
}

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferOwnershipRequest {
    pub new_owner: String,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct WhitelistStatus {
    pub address: String,
    pub whitelisted: bool,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct OwnerResponse {
    pub owner: String,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub store: String,
    pub network: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
