//! The ledger gateway: the document registry contract as seen by the service.
//!
//! Implementations talk to a real chain ([`crate::infra::solana::SolanaLedgerGateway`]) or
//! keep the registry in memory ([`InMemoryLedger`]).

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

pub use memory::{InMemoryLedger, LedgerOp, StoreHold, StoreResponse};

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Transport or node failure; the call may or may not have reached the contract.
    #[error("ledger RPC error: {0}")]
    Rpc(String),
    /// The contract refused the call (already registered, not authorized, ...).
    #[error("ledger rejected call: {0}")]
    Rejected(String),
    #[error("invalid ledger address: {0}")]
    InvalidAddress(String),
    #[error("malformed on-chain account: {0}")]
    InvalidAccount(String),
    #[error("ledger configuration error: {0}")]
    Config(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// A document as recorded by the registry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerDocument {
    pub name: String,
    pub hash: String,
    pub timestamp: u64,
    pub added_by: String,
}

/// The registry's verify view of a document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedDocument {
    pub name: String,
    pub hash: String,
    pub timestamp: u64,
    pub added_by: String,
    pub verified_document: bool,
}

impl From<LedgerDocument> for VerifiedDocument {
    fn from(doc: LedgerDocument) -> Self {
        Self {
            name: doc.name,
            hash: doc.hash,
            timestamp: doc.timestamp,
            added_by: doc.added_by,
            verified_document: true,
        }
    }
}

/// Off-chain context sent along with a store call. Gateways may record or ignore it.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub subject: String,
    pub company_id: String,
    pub requested_by_user_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceiptStatus {
    Success,
    Failed,
}

/// Outcome of a ledger write.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub status: ReceiptStatus,
    pub tx_hash: Option<String>,
    /// Address of the account the write landed in, when the ledger reports one.
    pub on_chain_id: Option<String>,
}

impl Receipt {
    pub fn success(tx_hash: impl Into<String>) -> Self {
        Self {
            status: ReceiptStatus::Success,
            tx_hash: Some(tx_hash.into()),
            on_chain_id: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ReceiptStatus::Success
    }

    /// The transaction hash, if present and non-blank.
    pub fn tx_hash(&self) -> Option<&str> {
        self.tx_hash.as_deref().filter(|h| !h.trim().is_empty())
    }
}

#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Network label recorded alongside transactions (e.g. `devnet`).
    fn network(&self) -> &str;

    async fn read_document(&self, hash: &str) -> LedgerResult<Option<LedgerDocument>>;

    async fn store_document(
        &self,
        name: &str,
        hash: &str,
        metadata: &DocumentMetadata,
    ) -> LedgerResult<Receipt>;

    async fn verify_document(&self, hash: &str) -> LedgerResult<Option<VerifiedDocument>>;

    async fn is_whitelisted(&self, address: &str) -> LedgerResult<bool>;

    async fn init_contract(&self) -> LedgerResult<Receipt>;

    async fn whitelist_address(&self, address: &str) -> LedgerResult<Receipt>;

    async fn remove_from_whitelist(&self, address: &str) -> LedgerResult<Receipt>;

    async fn owner_address(&self) -> LedgerResult<String>;

    /// Hands the registry to `new_owner`. Only the current owner may call it.
    async fn transfer_ownership(&self, new_owner: &str) -> LedgerResult<Receipt>;
}
