//! Failures surfaced by the certificate service, each with an HTTP-style status.

use crate::infra::ledger::LedgerError;
use crate::storage::StoreError;
use axum::http::StatusCode;
use thiserror::Error;

/// Which ledger interaction failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerStage {
    DuplicateCheck,
    StoreDocument,
    StoreStatus,
    MissingTxHash,
    VerifyDocument,
    Admin,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{message}")]
    Upstream {
        stage: LedgerStage,
        message: String,
        #[source]
        source: Option<LedgerError>,
    },
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ServiceError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ServiceError::NotFound(msg.into())
    }

    pub fn upstream(stage: LedgerStage, message: impl Into<String>, source: LedgerError) -> Self {
        ServiceError::Upstream {
            stage,
            message: message.into(),
            source: Some(source),
        }
    }

    /// An upstream failure where the ledger answered but the answer was unusable.
    pub fn upstream_reply(stage: LedgerStage, message: impl Into<String>) -> Self {
        ServiceError::Upstream {
            stage,
            message: message.into(),
            source: None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            ServiceError::Persistence(StoreError::Duplicate { .. }) => StatusCode::CONFLICT,
            ServiceError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code for error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "VALIDATION_ERROR",
            ServiceError::Conflict(_) => "CONFLICT",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::Unauthorized(_) => "UNAUTHORIZED",
            ServiceError::Forbidden(_) => "PERMISSION_DENIED",
            ServiceError::Upstream { .. } => "UPSTREAM_ERROR",
            ServiceError::Persistence(StoreError::Duplicate { .. }) => "CONFLICT",
            ServiceError::Persistence(_) => "INTERNAL_ERROR",
        }
    }

    pub fn stage(&self) -> Option<LedgerStage> {
        match self {
            ServiceError::Upstream { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(
            ServiceError::validation("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::not_found("x").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::upstream_reply(LedgerStage::MissingTxHash, "x").status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ServiceError::Persistence(StoreError::Unavailable("down".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let dup = ServiceError::Persistence(StoreError::Duplicate {
            field: "metadata_hash",
            value: "ab".into(),
        });
        assert_eq!(dup.status_code(), StatusCode::CONFLICT);
        assert_eq!(dup.code(), "CONFLICT");
    }

    #[test]
    fn upstream_message_is_the_display() {
        let err = ServiceError::upstream(
            LedgerStage::StoreDocument,
            "blockchain store_document call failed",
            LedgerError::Rpc("timeout".into()),
        );
        assert_eq!(err.to_string(), "blockchain store_document call failed");
        assert_eq!(err.stage(), Some(LedgerStage::StoreDocument));
        assert!(std::error::Error::source(&err).is_some());
    }
}
