//! In-process document registry with the same rules as the deployed contract:
//! one owner set by init, stores allowed for the owner or whitelisted addresses,
//! and each hash registered at most once.
//!
//! Individual operations can be failed or reshaped for tests.

use super::{
    DocumentMetadata, LedgerDocument, LedgerError, LedgerGateway, LedgerResult, Receipt,
    ReceiptStatus, VerifiedDocument,
};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerOp {
    ReadDocument,
    StoreDocument,
    VerifyDocument,
    IsWhitelisted,
    InitContract,
    WhitelistAddress,
    RemoveFromWhitelist,
    OwnerAddress,
    TransferOwnership,
}

/// How `store_document` answers once its checks pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreResponse {
    #[default]
    Normal,
    /// Resolve with a non-success status and record nothing.
    FailedStatus,
    /// Record the document but omit the transaction hash from the receipt.
    MissingTxHash,
}

/// Suspends `store_document` calls until released.
#[derive(Clone)]
pub struct StoreHold {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl StoreHold {
    /// Resolves once a store call is parked on this hold.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[derive(Default)]
struct State {
    owner: Option<String>,
    whitelist: HashSet<String>,
    documents: HashMap<String, LedgerDocument>,
    failing: HashSet<LedgerOp>,
    store_response: StoreResponse,
    hold: Option<StoreHold>,
    calls: HashMap<LedgerOp, usize>,
    nonce: u64,
    clock: u64,
}

impl State {
    fn enter(&mut self, op: LedgerOp) -> LedgerResult<()> {
        *self.calls.entry(op).or_insert(0) += 1;
        if self.failing.contains(&op) {
            return Err(LedgerError::Rpc(format!("injected failure on {:?}", op)));
        }
        Ok(())
    }

    fn next_tx_hash(&mut self, label: &str) -> String {
        self.nonce += 1;
        let digest = Sha256::digest(format!("{}:{}", label, self.nonce).as_bytes());
        format!("0x{}", hex::encode(digest))
    }

    fn require_owner(&self, signer: &str) -> LedgerResult<()> {
        match &self.owner {
            None => Err(LedgerError::Rejected("contract not initialized".into())),
            Some(owner) if owner == signer => Ok(()),
            Some(_) => Err(LedgerError::Rejected("only the owner may call this".into())),
        }
    }
}

#[derive(Clone)]
pub struct InMemoryLedger {
    signer: String,
    network: String,
    state: Arc<Mutex<State>>,
}

impl InMemoryLedger {
    /// A registry that still needs `init_contract`. Calls are signed by `signer`.
    pub fn new(signer: impl Into<String>) -> Self {
        Self {
            signer: signer.into(),
            network: "memory".to_string(),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// A registry already initialized with `signer` as owner.
    pub fn initialized(signer: impl Into<String>) -> Self {
        let signer = signer.into();
        let state = State {
            owner: Some(signer.clone()),
            ..State::default()
        };
        Self {
            signer,
            network: "memory".to_string(),
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Registers a document directly, bypassing permission checks.
    pub async fn seed_document(&self, name: &str, hash: &str) {
        let mut state = self.state.lock().await;
        state.clock += 1;
        let doc = LedgerDocument {
            name: name.to_string(),
            hash: hash.to_string(),
            timestamp: state.clock,
            added_by: self.signer.clone(),
        };
        state.documents.insert(hash.to_string(), doc);
    }

    pub async fn fail_on(&self, op: LedgerOp) {
        self.state.lock().await.failing.insert(op);
    }

    pub async fn recover(&self, op: LedgerOp) {
        self.state.lock().await.failing.remove(&op);
    }

    pub async fn set_store_response(&self, response: StoreResponse) {
        self.state.lock().await.store_response = response;
    }

    /// Parks every following `store_document` call until the returned hold is released.
    pub async fn hold_stores(&self) -> StoreHold {
        let hold = StoreHold {
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        };
        self.state.lock().await.hold = Some(hold.clone());
        hold
    }

    pub async fn call_count(&self, op: LedgerOp) -> usize {
        self.state.lock().await.calls.get(&op).copied().unwrap_or(0)
    }

    pub async fn document_count(&self) -> usize {
        self.state.lock().await.documents.len()
    }
}

#[async_trait]
impl LedgerGateway for InMemoryLedger {
    fn network(&self) -> &str {
        &self.network
    }

    async fn read_document(&self, hash: &str) -> LedgerResult<Option<LedgerDocument>> {
        let mut state = self.state.lock().await;
        state.enter(LedgerOp::ReadDocument)?;
        Ok(state.documents.get(hash).cloned())
    }

    async fn store_document(
        &self,
        name: &str,
        hash: &str,
        _metadata: &DocumentMetadata,
    ) -> LedgerResult<Receipt> {
        let hold = {
            let mut state = self.state.lock().await;
            state.enter(LedgerOp::StoreDocument)?;
            state.hold.clone()
        };
        if let Some(hold) = hold {
            hold.entered.notify_one();
            hold.release.notified().await;
        }

        let mut state = self.state.lock().await;
        if state.documents.contains_key(hash) {
            return Err(LedgerError::Rejected("Document already registered".into()));
        }
        let owner = state
            .owner
            .clone()
            .ok_or_else(|| LedgerError::Rejected("contract not initialized".into()))?;
        if owner != self.signer && !state.whitelist.contains(&self.signer) {
            return Err(LedgerError::Rejected(
                "not authorized: only owner or whitelisted address".into(),
            ));
        }

        if state.store_response == StoreResponse::FailedStatus {
            return Ok(Receipt {
                status: ReceiptStatus::Failed,
                tx_hash: None,
                on_chain_id: None,
            });
        }

        state.clock += 1;
        let doc = LedgerDocument {
            name: name.to_string(),
            hash: hash.to_string(),
            timestamp: state.clock,
            added_by: self.signer.clone(),
        };
        state.documents.insert(hash.to_string(), doc);

        let tx_hash = state.next_tx_hash(hash);
        Ok(Receipt {
            status: ReceiptStatus::Success,
            tx_hash: match state.store_response {
                StoreResponse::MissingTxHash => None,
                _ => Some(tx_hash),
            },
            on_chain_id: Some(hash.to_string()),
        })
    }

    async fn verify_document(&self, hash: &str) -> LedgerResult<Option<VerifiedDocument>> {
        let mut state = self.state.lock().await;
        state.enter(LedgerOp::VerifyDocument)?;
        Ok(state.documents.get(hash).cloned().map(VerifiedDocument::from))
    }

    async fn is_whitelisted(&self, address: &str) -> LedgerResult<bool> {
        let mut state = self.state.lock().await;
        state.enter(LedgerOp::IsWhitelisted)?;
        Ok(state.whitelist.contains(address))
    }

    async fn init_contract(&self) -> LedgerResult<Receipt> {
        let mut state = self.state.lock().await;
        state.enter(LedgerOp::InitContract)?;
        if state.owner.is_some() {
            return Err(LedgerError::Rejected("already initialized".into()));
        }
        state.owner = Some(self.signer.clone());
        let tx_hash = state.next_tx_hash("init");
        Ok(Receipt::success(tx_hash))
    }

    async fn whitelist_address(&self, address: &str) -> LedgerResult<Receipt> {
        let mut state = self.state.lock().await;
        state.enter(LedgerOp::WhitelistAddress)?;
        state.require_owner(&self.signer)?;
        state.whitelist.insert(address.to_string());
        let tx_hash = state.next_tx_hash(address);
        Ok(Receipt::success(tx_hash))
    }

    async fn remove_from_whitelist(&self, address: &str) -> LedgerResult<Receipt> {
        let mut state = self.state.lock().await;
        state.enter(LedgerOp::RemoveFromWhitelist)?;
        state.require_owner(&self.signer)?;
        state.whitelist.remove(address);
        let tx_hash = state.next_tx_hash(address);
        Ok(Receipt::success(tx_hash))
    }

    async fn owner_address(&self) -> LedgerResult<String> {
        let mut state = self.state.lock().await;
        state.enter(LedgerOp::OwnerAddress)?;
        state
            .owner
            .clone()
            .ok_or_else(|| LedgerError::Rejected("contract not initialized".into()))
    }

    async fn transfer_ownership(&self, new_owner: &str) -> LedgerResult<Receipt> {
        let mut state = self.state.lock().await;
        state.enter(LedgerOp::TransferOwnership)?;
        state.require_owner(&self.signer)?;
        if new_owner == self.signer {
            return Err(LedgerError::Rejected("new owner must be different".into()));
        }
        state.owner = Some(new_owner.to_string());
        let tx_hash = state.next_tx_hash(new_owner);
        Ok(Receipt::success(tx_hash))
    }
}
