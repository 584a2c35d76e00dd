//! Inputs and results of the certificate service.

use crate::app::error::{ServiceError, ServiceResult};
use crate::domain::{
    Actor, AuditEvent, Certificate, CertificatePatch, FileMeta, Role, StorageInfo,
    TransactionRecord,
};
use crate::infra::ledger::{Receipt, VerifiedDocument};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, Debug, Clone, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCertificateInput {
    pub certificate_name: Option<String>,
    pub company_id: Option<String>,
    pub subject: Option<String>,
    pub metadata_hash: Option<String>,
    pub requested_by_user_id: Option<String>,
    #[serde(default)]
    pub file_meta: Option<FileMeta>,
    #[serde(default)]
    pub storage_meta: Option<StorageInfo>,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(skip)]
    pub actor_role: Option<Role>,
}

/// A create request with every required field present and trimmed.
#[derive(Debug, Clone)]
pub(crate) struct ValidCreate {
    pub certificate_name: String,
    pub company_id: String,
    pub subject: String,
    pub metadata_hash: String,
    pub requested_by_user_id: String,
    pub file_meta: Option<FileMeta>,
    pub storage_meta: Option<StorageInfo>,
    pub network: Option<String>,
    pub actor_role: Option<Role>,
}

pub(crate) fn required(value: &Option<String>, field: &str) -> ServiceResult<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ServiceError::validation(format!("{} is required", field)))
}

fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl CreateCertificateInput {
    pub(crate) fn validate(&self) -> ServiceResult<ValidCreate> {
        let certificate_name = required(&self.certificate_name, "certificateName")?;
        let company_id = required(&self.company_id, "companyId")?;
        let subject = required(&self.subject, "subject")?;
        let metadata_hash = required(&self.metadata_hash, "metadataHash")?;
        let requested_by_user_id = required(&self.requested_by_user_id, "requestedByUserId")?;
        Ok(ValidCreate {
            certificate_name,
            company_id,
            subject,
            metadata_hash,
            requested_by_user_id,
            file_meta: self.file_meta.clone(),
            storage_meta: self.storage_meta.clone(),
            network: optional(&self.network),
            actor_role: self.actor_role,
        })
    }
}

#[derive(Deserialize, Debug, Clone, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCertificateInput {
    #[serde(default)]
    pub update_data: CertificatePatch,
    #[serde(default)]
    pub new_file_meta: Option<FileMeta>,
    #[serde(default)]
    pub new_storage_meta: Option<StorageInfo>,
    pub updated_by_user_id: Option<String>,
    #[serde(skip)]
    pub actor_role: Option<Role>,
}

impl UpdateCertificateInput {
    pub(crate) fn validate(&self) -> ServiceResult<Actor> {
        let user_id = required(&self.updated_by_user_id, "updatedByUserId")?;
        if self.update_data.is_empty()
            && self.new_file_meta.is_none()
            && self.new_storage_meta.is_none()
        {
            return Err(ServiceError::validation("nothing to update"));
        }
        for (value, field) in [
            (&self.update_data.certificate_name, "certificateName"),
            (&self.update_data.subject, "subject"),
            (&self.update_data.company_id, "companyId"),
        ] {
            if matches!(value.as_deref(), Some(v) if v.trim().is_empty()) {
                return Err(ServiceError::validation(format!("{} must not be blank", field)));
            }
        }
        Ok(Actor::new(user_id, self.actor_role))
    }
}

#[derive(Deserialize, Debug, Clone, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCertificateInput {
    pub deleted_by_user_id: Option<String>,
    #[serde(skip)]
    pub actor_role: Option<Role>,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCertificate {
    pub cert: Certificate,
    /// Present only if the transaction record was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx: Option<TransactionRecord>,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCheck {
    pub issued: bool,
    pub value: Option<VerifiedDocument>,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSummary {
    #[serde(flatten)]
    pub certificate: Certificate,
    /// Actor of the most recent audit event.
    pub signed_by: Option<Actor>,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificatePage {
    pub certificates: Vec<CertificateSummary>,
    pub total: u64,
    pub current_page: u32,
    pub total_pages: u64,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateDetails {
    pub certificate: Certificate,
    pub events: Vec<AuditEvent>,
    pub transactions: Vec<TransactionRecord>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeletionReport {
    pub certificate: u64,
    pub events: u64,
    pub transactions: u64,
    pub files_deleted: u64,
}

/// Result of an administrative ledger write.
#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerTx {
    pub receipt: Receipt,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx: Option<TransactionRecord>,
}
