// Responsible for all communication with the document registry program on Solana.

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_program::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    signature::Signature,
    signer::{keypair::read_keypair_file, keypair::Keypair, Signer},
    transaction::Transaction,
};
use std::str::FromStr;
use tracing::{debug, info};

use crate::crypto::hashing::{account_discriminator, document_seed, instruction_discriminator};
use crate::infra::config::SolanaConfig;
use crate::infra::ledger::{
    DocumentMetadata, LedgerDocument, LedgerError, LedgerGateway, LedgerResult, Receipt,
    VerifiedDocument,
};

const CONFIG_SEED: &[u8] = b"registry_config";
const DOCUMENT_SEED: &[u8] = b"document";
const WHITELIST_SEED: &[u8] = b"whitelist";

/// Ledger gateway backed by the document registry program.
///
/// Account layouts (Anchor, borsh):
/// - config:    8-byte discriminator + owner (32)
/// - document:  8-byte discriminator + name (u32 len + utf8) + hash (u32 len + utf8)
///   + timestamp (i64) + added_by (32)
/// - whitelist: 8-byte discriminator + allowed (u8)
pub struct SolanaLedgerGateway {
    client: RpcClient,
    payer: Keypair,
    program_id: Pubkey,
    network: String,
}

fn rpc_err(e: impl std::fmt::Display) -> LedgerError {
    LedgerError::Rpc(e.to_string())
}

impl SolanaLedgerGateway {
    pub fn new(config: &SolanaConfig, network: impl Into<String>) -> LedgerResult<Self> {
        let payer = read_keypair_file(&config.keypair_path).map_err(|e| {
            LedgerError::Config(format!(
                "failed to read keypair file {}: {}",
                config.keypair_path.display(),
                e
            ))
        })?;
        let program_id = Pubkey::from_str(&config.program_id)
            .map_err(|e| LedgerError::Config(format!("SOLANA_PROGRAM_ID is not a valid pubkey: {}", e)))?;
        let client =
            RpcClient::new_with_commitment(config.rpc_url.clone(), CommitmentConfig::confirmed());
        Ok(Self {
            client,
            payer,
            program_id,
            network: network.into(),
        })
    }

    pub fn payer_pubkey(&self) -> Pubkey {
        self.payer.pubkey()
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub fn config_pubkey(&self) -> Pubkey {
        Pubkey::find_program_address(&[CONFIG_SEED], &self.program_id).0
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.client
    }

    /// Whether the registry config account has been created by `initialize`.
    pub async fn config_account_exists(&self) -> LedgerResult<bool> {
        Ok(self.account_data(&self.config_pubkey()).await?.is_some())
    }

    fn document_pubkey(&self, hash: &str) -> Pubkey {
        let seed = document_seed(hash);
        Pubkey::find_program_address(&[DOCUMENT_SEED, &seed], &self.program_id).0
    }

    fn whitelist_pubkey(&self, address: &Pubkey) -> Pubkey {
        Pubkey::find_program_address(&[WHITELIST_SEED, address.as_ref()], &self.program_id).0
    }

    async fn account_data(&self, pubkey: &Pubkey) -> LedgerResult<Option<Vec<u8>>> {
        let response = self
            .client
            .get_account_with_commitment(pubkey, CommitmentConfig::confirmed())
            .await
            .map_err(rpc_err)?;
        Ok(response.value.map(|account| account.data))
    }

    async fn send(&self, instruction: Instruction) -> LedgerResult<Signature> {
        let mut transaction =
            Transaction::new_with_payer(&[instruction], Some(&self.payer.pubkey()));
        let recent_blockhash = self.client.get_latest_blockhash().await.map_err(rpc_err)?;
        transaction.sign(&[&self.payer], recent_blockhash);
        let signature = self
            .client
            .send_and_confirm_transaction(&transaction)
            .await
            .map_err(rpc_err)?;
        debug!(%signature, "registry transaction confirmed");
        Ok(signature)
    }

    fn whitelist_instruction(&self, name: &str, address: &str) -> LedgerResult<Instruction> {
        let target = parse_address(address)?;
        let mut data = instruction_discriminator(name).to_vec();
        data.extend_from_slice(target.as_ref());
        Ok(Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new_readonly(self.config_pubkey(), false),
                AccountMeta::new(self.whitelist_pubkey(&target), false),
                AccountMeta::new(self.payer.pubkey(), true),
                AccountMeta::new_readonly(solana_program::system_program::ID, false),
            ],
            data,
        })
    }
}

fn parse_address(address: &str) -> LedgerResult<Pubkey> {
    Pubkey::from_str(address.trim()).map_err(|_| LedgerError::InvalidAddress(address.to_string()))
}

fn push_borsh_string(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

/// Cursor over account bytes that fails with [`LedgerError::InvalidAccount`] when short.
struct AccountReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> AccountReader<'a> {
    /// Checks the discriminator and positions the cursor after it.
    fn new(data: &'a [u8], account: &str) -> LedgerResult<Self> {
        if data.len() < 8 || data[..8] != account_discriminator(account) {
            return Err(LedgerError::InvalidAccount(format!(
                "{} account has wrong discriminator",
                account
            )));
        }
        Ok(Self { data, pos: 8 })
    }

    fn take(&mut self, n: usize) -> LedgerResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| LedgerError::InvalidAccount("account data too short".into()))?;
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn u32(&mut self) -> LedgerResult<u32> {
        let mut b = [0u8; 4];
        b.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(b))
    }

    fn i64(&mut self) -> LedgerResult<i64> {
        let mut b = [0u8; 8];
        b.copy_from_slice(self.take(8)?);
        Ok(i64::from_le_bytes(b))
    }

    fn string(&mut self) -> LedgerResult<String> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| LedgerError::InvalidAccount("string is not utf-8".into()))
    }

    fn pubkey(&mut self) -> LedgerResult<Pubkey> {
        let mut b = [0u8; 32];
        b.copy_from_slice(self.take(32)?);
        Ok(Pubkey::new_from_array(b))
    }
}

fn decode_document(data: &[u8]) -> LedgerResult<LedgerDocument> {
    let mut reader = AccountReader::new(data, "Document")?;
    let name = reader.string()?;
    let hash = reader.string()?;
    let timestamp = reader.i64()?;
    let added_by = reader.pubkey()?;
    Ok(LedgerDocument {
        name,
        hash,
        timestamp: timestamp.max(0) as u64,
        added_by: added_by.to_string(),
    })
}

fn decode_owner(data: &[u8]) -> LedgerResult<Pubkey> {
    AccountReader::new(data, "RegistryConfig")?.pubkey()
}

fn decode_whitelisted(data: &[u8]) -> LedgerResult<bool> {
    let mut reader = AccountReader::new(data, "WhitelistEntry")?;
    Ok(reader.take(1)?[0] != 0)
}

#[async_trait]
impl LedgerGateway for SolanaLedgerGateway {
    fn network(&self) -> &str {
        &self.network
    }

    async fn read_document(&self, hash: &str) -> LedgerResult<Option<LedgerDocument>> {
        let pda = self.document_pubkey(hash);
        match self.account_data(&pda).await? {
            Some(data) => decode_document(&data).map(Some),
            None => Ok(None),
        }
    }

    async fn store_document(
        &self,
        name: &str,
        hash: &str,
        _metadata: &DocumentMetadata,
    ) -> LedgerResult<Receipt> {
        let document = self.document_pubkey(hash);
        let mut data = instruction_discriminator("store_document").to_vec();
        push_borsh_string(&mut data, name);
        push_borsh_string(&mut data, hash);
        data.extend_from_slice(&document_seed(hash));

        let instruction = Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new_readonly(self.config_pubkey(), false),
                AccountMeta::new_readonly(self.whitelist_pubkey(&self.payer.pubkey()), false),
                AccountMeta::new(document, false),
                AccountMeta::new(self.payer.pubkey(), true),
                AccountMeta::new_readonly(solana_program::system_program::ID, false),
            ],
            data,
        };
        let signature = self.send(instruction).await?;
        info!(%signature, hash, "document stored on chain");
        let mut receipt = Receipt::success(signature.to_string());
        receipt.on_chain_id = Some(document.to_string());
        Ok(receipt)
    }

    async fn verify_document(&self, hash: &str) -> LedgerResult<Option<VerifiedDocument>> {
        Ok(self.read_document(hash).await?.map(VerifiedDocument::from))
    }

    async fn is_whitelisted(&self, address: &str) -> LedgerResult<bool> {
        let target = parse_address(address)?;
        match self.account_data(&self.whitelist_pubkey(&target)).await? {
            Some(data) => decode_whitelisted(&data),
            None => Ok(false),
        }
    }

    async fn init_contract(&self) -> LedgerResult<Receipt> {
        let config = self.config_pubkey();
        if self.account_data(&config).await?.is_some() {
            return Err(LedgerError::Rejected("already initialized".into()));
        }
        let mut data = instruction_discriminator("init").to_vec();
        data.extend_from_slice(self.payer.pubkey().as_ref());
        let instruction = Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new(config, false),
                AccountMeta::new(self.payer.pubkey(), true),
                AccountMeta::new_readonly(solana_program::system_program::ID, false),
            ],
            data,
        };
        let signature = self.send(instruction).await?;
        info!(%signature, owner = %self.payer.pubkey(), "registry initialized");
        let mut receipt = Receipt::success(signature.to_string());
        receipt.on_chain_id = Some(config.to_string());
        Ok(receipt)
    }

    async fn whitelist_address(&self, address: &str) -> LedgerResult<Receipt> {
        let instruction = self.whitelist_instruction("whitelist_address", address)?;
        let signature = self.send(instruction).await?;
        info!(%signature, address, "address whitelisted");
        Ok(Receipt::success(signature.to_string()))
    }

    async fn remove_from_whitelist(&self, address: &str) -> LedgerResult<Receipt> {
        let instruction = self.whitelist_instruction("remove_from_whitelist", address)?;
        let signature = self.send(instruction).await?;
        info!(%signature, address, "address removed from whitelist");
        Ok(Receipt::success(signature.to_string()))
    }

    async fn owner_address(&self) -> LedgerResult<String> {
        match self.account_data(&self.config_pubkey()).await? {
            Some(data) => Ok(decode_owner(&data)?.to_string()),
            None => Err(LedgerError::Rejected("contract not initialized".into())),
        }
    }

    async fn transfer_ownership(&self, new_owner: &str) -> LedgerResult<Receipt> {
        let target = parse_address(new_owner)?;
        let mut data = instruction_discriminator("transfer_ownership").to_vec();
        data.extend_from_slice(target.as_ref());
        let instruction = Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new(self.config_pubkey(), false),
                AccountMeta::new_readonly(self.payer.pubkey(), true),
            ],
            data,
        };
        let signature = self.send(instruction).await?;
        info!(%signature, new_owner = %target, "registry ownership transferred");
        Ok(Receipt::success(signature.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document_account(name: &str, hash: &str, timestamp: i64, added_by: &Pubkey) -> Vec<u8> {
        let mut data = account_discriminator("Document").to_vec();
        push_borsh_string(&mut data, name);
        push_borsh_string(&mut data, hash);
        data.extend_from_slice(&timestamp.to_le_bytes());
        data.extend_from_slice(added_by.as_ref());
        data
    }

    #[test]
    fn decodes_document_account() {
        let added_by = Pubkey::new_from_array([7u8; 32]);
        let data = document_account("OfferLetter.pdf", "abc123", 1_800_000_000, &added_by);
        let doc = decode_document(&data).unwrap();
        assert_eq!(doc.name, "OfferLetter.pdf");
        assert_eq!(doc.hash, "abc123");
        assert_eq!(doc.timestamp, 1_800_000_000);
        assert_eq!(doc.added_by, added_by.to_string());
    }

    #[test]
    fn truncated_document_is_rejected() {
        let added_by = Pubkey::new_from_array([1u8; 32]);
        let data = document_account("n", "h", 1, &added_by);
        let err = decode_document(&data[..data.len() - 1]).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAccount(_)));
    }

    #[test]
    fn wrong_discriminator_is_rejected() {
        let mut data = account_discriminator("WhitelistEntry").to_vec();
        data.push(1);
        assert!(decode_whitelisted(&data).unwrap());
        assert!(decode_document(&data).is_err());
        assert!(decode_owner(&data).is_err());
    }
}
