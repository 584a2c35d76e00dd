pub mod certificate_service;
pub mod dto;
pub mod error;
pub mod outcome;

pub use certificate_service::CertificateService;
pub use dto::{
    CertificateDetails, CertificatePage, CertificateSummary, CreateCertificateInput,
    DeleteCertificateInput, DeletionReport, IssuedCertificate, IssuedCheck, LedgerTx,
    UpdateCertificateInput,
};
pub use error::{LedgerStage, ServiceError, ServiceResult};
pub use outcome::{AuxiliaryKind, AuxiliaryStatus, AuxiliaryWrite, Outcome};
