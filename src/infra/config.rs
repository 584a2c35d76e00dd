//! Centralized configuration (environment variables + defaults).

use anyhow::{anyhow, Context};
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_KEYPAIR_PATH: &str = "~/.config/solana/id.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerBackend {
    Solana,
    Memory,
}

#[derive(Debug, Clone)]
pub struct SolanaConfig {
    pub rpc_url: String,
    pub program_id: String,
    pub keypair_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub store_backend: StoreBackend,
    /// Required when `store_backend` is `Postgres`.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub ledger_backend: LedgerBackend,
    /// Required when `ledger_backend` is `Solana`.
    pub solana: Option<SolanaConfig>,
    /// Label stored on certificates and transactions (e.g. `devnet`).
    pub ledger_network: String,
    pub storage_root: PathBuf,
}

fn var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(name: &str) -> anyhow::Result<String> {
    var(name).ok_or_else(|| anyhow!("{} must be set", name))
}

/// Solana settings read on their own; the preflight binary needs only these.
pub fn solana_config() -> anyhow::Result<SolanaConfig> {
    let keypair_path = var("SOLANA_KEYPAIR_PATH").unwrap_or_else(|| DEFAULT_KEYPAIR_PATH.to_string());
    Ok(SolanaConfig {
        rpc_url: required("SOLANA_RPC_URL")?,
        program_id: required("SOLANA_PROGRAM_ID")?,
        keypair_path: PathBuf::from(shellexpand::tilde(&keypair_path).into_owned()),
    })
}

impl AppConfig {
    /// Loads `.env` (if present) and reads the environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:3000".to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR must be a socket address")?;

        let store_backend = match var("STORE_BACKEND").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => return Err(anyhow!("unknown STORE_BACKEND '{}'", other)),
        };
        let database_url = match store_backend {
            StoreBackend::Postgres => Some(required("DATABASE_URL")?),
            StoreBackend::Memory => var("DATABASE_URL"),
        };
        let db_max_connections = match var("DB_MAX_CONNECTIONS") {
            Some(v) => v
                .parse::<u32>()
                .context("DB_MAX_CONNECTIONS must be a valid u32")?
                .max(1),
            None => 5,
        };

        let ledger_backend = match var("LEDGER_BACKEND").as_deref() {
            None | Some("solana") => LedgerBackend::Solana,
            Some("memory") => LedgerBackend::Memory,
            Some(other) => return Err(anyhow!("unknown LEDGER_BACKEND '{}'", other)),
        };
        let solana = match ledger_backend {
            LedgerBackend::Solana => Some(solana_config()?),
            LedgerBackend::Memory => None,
        };

        Ok(Self {
            bind_addr,
            store_backend,
            database_url,
            db_max_connections,
            ledger_backend,
            solana,
            ledger_network: var("LEDGER_NETWORK").unwrap_or_else(|| "devnet".to_string()),
            storage_root: PathBuf::from(var("STORAGE_ROOT").unwrap_or_else(|| "./uploads".to_string())),
        })
    }
}
