//! Records the service keeps about issued documents.

pub mod audit;
pub mod certificate;
pub mod query;
pub mod role;
pub mod transaction;

pub use audit::{Actor, AuditAction, AuditEvent};
pub use certificate::{
    Certificate, CertificatePatch, CertificateStatus, ChainInfo, FileMeta, StorageInfo,
};
pub use query::{CertificateFilter, CertificateQuery, PageRequest, SortField, SortOrder};
pub use role::{Capability, Role};
pub use transaction::{TransactionRecord, TxPurpose, TxStatus};
