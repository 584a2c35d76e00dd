pub mod app;
pub mod crypto;
pub mod domain;
pub mod infra;
pub mod storage;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::{CertificateService, Outcome, ServiceError};
pub use crypto::hashing::hash_document;
pub use infra::ledger::{InMemoryLedger, LedgerGateway};
pub use infra::solana;
pub use storage::{LocalFileStorage, MemoryFileStorage, MemoryStore, PgStore};
