//! The certificate record: one issued, hash-anchored document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CertificateStatus {
    Issued,
    Revoked,
    Expired,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateStatus::Issued => "issued",
            CertificateStatus::Revoked => "revoked",
            CertificateStatus::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "issued" => Some(CertificateStatus::Issued),
            "revoked" => Some(CertificateStatus::Revoked),
            "expired" => Some(CertificateStatus::Expired),
            _ => None,
        }
    }
}

/// Where the certificate is anchored on the ledger.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfo {
    pub network: Option<String>,
    pub tx_hash_issue: Option<String>,
    pub on_chain_id: Option<String>,
}

/// Location of the uploaded file backing the certificate.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    pub provider: Option<String>,
    pub path: Option<String>,
    pub public_url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    pub original_filename: Option<String>,
    pub mime_type: Option<String>,
    pub size: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: String,
    pub certificate_name: String,
    pub subject: String,
    pub company_id: String,
    pub metadata_hash: String,
    pub status: CertificateStatus,
    pub chain: ChainInfo,
    pub storage: Option<StorageInfo>,
    pub file: Option<FileMeta>,
    pub requested_by_user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Certificate {
    /// Path of the stored file, if one is attached.
    pub fn storage_path(&self) -> Option<&str> {
        self.storage
            .as_ref()
            .and_then(|s| s.path.as_deref())
            .filter(|p| !p.is_empty())
    }
}

/// Field edits accepted by an update. `None` leaves the field untouched.
#[derive(Serialize, Deserialize, Debug, Clone, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificatePatch {
    #[serde(default)]
    pub certificate_name: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub status: Option<CertificateStatus>,
}

impl CertificatePatch {
    pub fn is_empty(&self) -> bool {
        self.certificate_name.is_none()
            && self.subject.is_none()
            && self.company_id.is_none()
            && self.status.is_none()
    }

    /// Applies the patch and returns the names of the fields that actually changed.
    pub fn apply(&self, cert: &mut Certificate) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if let Some(name) = &self.certificate_name {
            if *name != cert.certificate_name {
                cert.certificate_name = name.clone();
                changed.push("certificateName");
            }
        }
        if let Some(subject) = &self.subject {
            if *subject != cert.subject {
                cert.subject = subject.clone();
                changed.push("subject");
            }
        }
        if let Some(company_id) = &self.company_id {
            if *company_id != cert.company_id {
                cert.company_id = company_id.clone();
                changed.push("companyId");
            }
        }
        if let Some(status) = self.status {
            if status != cert.status {
                cert.status = status;
                changed.push("status");
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Certificate {
        let now = Utc::now();
        Certificate {
            id: "c1".into(),
            certificate_name: "Cert A".into(),
            subject: "Alice".into(),
            company_id: "acme".into(),
            metadata_hash: "abc123".into(),
            status: CertificateStatus::Issued,
            chain: ChainInfo::default(),
            storage: None,
            file: None,
            requested_by_user_id: "u1".into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn patch_reports_only_changed_fields() {
        let mut cert = sample();
        let patch = CertificatePatch {
            certificate_name: Some("Cert A".into()),
            subject: Some("Bob".into()),
            status: Some(CertificateStatus::Revoked),
            ..Default::default()
        };
        let changed = patch.apply(&mut cert);
        assert_eq!(changed, vec!["subject", "status"]);
        assert_eq!(cert.subject, "Bob");
        assert_eq!(cert.status, CertificateStatus::Revoked);
    }

    #[test]
    fn empty_storage_path_is_ignored() {
        let mut cert = sample();
        cert.storage = Some(StorageInfo {
            path: Some(String::new()),
            ..Default::default()
        });
        assert_eq!(cert.storage_path(), None);
    }

    #[test]
    fn status_round_trips_through_str() {
        for s in [
            CertificateStatus::Issued,
            CertificateStatus::Revoked,
            CertificateStatus::Expired,
        ] {
            assert_eq!(CertificateStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(CertificateStatus::parse("pending"), None);
    }
}
