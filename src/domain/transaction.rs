//! Local mirror of ledger receipts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TxPurpose {
    Issue,
    InitContract,
    Whitelist,
    RemoveWhitelist,
    TransferOwnership,
}

impl TxPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxPurpose::Issue => "issue",
            TxPurpose::InitContract => "init_contract",
            TxPurpose::Whitelist => "whitelist",
            TxPurpose::RemoveWhitelist => "remove_whitelist",
            TxPurpose::TransferOwnership => "transfer_ownership",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "issue" => Some(TxPurpose::Issue),
            "init_contract" => Some(TxPurpose::InitContract),
            "whitelist" => Some(TxPurpose::Whitelist),
            "remove_whitelist" => Some(TxPurpose::RemoveWhitelist),
            "transfer_ownership" => Some(TxPurpose::TransferOwnership),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    Success,
    Failed,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Success => "success",
            TxStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(TxStatus::Success),
            "failed" => Some(TxStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: String,
    pub tx_hash: String,
    pub purpose: TxPurpose,
    pub certificate_id: Option<String>,
    pub network: Option<String>,
    pub status: TxStatus,
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn new(
        tx_hash: &str,
        purpose: TxPurpose,
        certificate_id: Option<&str>,
        network: Option<&str>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tx_hash: tx_hash.to_string(),
            purpose,
            certificate_id: certificate_id.map(str::to_string),
            network: network.map(str::to_string),
            status: TxStatus::Success,
            created_at: Utc::now(),
        }
    }
}
