use anyhow::Context;
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use certchain::infra::config;
use certchain::infra::ledger::LedgerGateway;
use certchain::solana::SolanaLedgerGateway;

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight -- [--init-if-missing]\n\
         \n\
         Requires env vars:\n\
           SOLANA_RPC_URL, SOLANA_PROGRAM_ID\n\
         Optional:\n\
           SOLANA_KEYPAIR_PATH (default ~/.config/solana/id.json), LEDGER_NETWORK\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }
    let init_if_missing = args.iter().any(|a| a == "--init-if-missing");

    let solana = config::solana_config()?;
    let network = std::env::var("LEDGER_NETWORK").unwrap_or_else(|_| "devnet".to_string());
    info!(rpc_url = %solana.rpc_url, program_id = %solana.program_id, %network, "preflight");

    let gateway = SolanaLedgerGateway::new(&solana, network)?;
    let client = gateway.rpc();

    let version = client.get_version().await.context("RPC unreachable")?;
    info!(version = %version.solana_core, "RPC reachable");

    let payer = gateway.payer_pubkey();
    let balance = client.get_balance(&payer).await?;
    info!(
        %payer,
        lamports = balance,
        sol = balance as f64 / LAMPORTS_PER_SOL as f64,
        "payer balance"
    );
    if balance < 10_000_000 {
        warn!("payer balance looks low; registry transactions may fail");
    }

    let program = client
        .get_account(gateway.program_id())
        .await
        .with_context(|| format!("program account not found on cluster: {}", gateway.program_id()))?;
    if program.executable {
        info!("program account is deployed and executable");
    } else {
        warn!("program account exists but is not marked executable");
    }

    let config_pda = gateway.config_pubkey();
    if gateway.config_account_exists().await? {
        info!(%config_pda, "registry config account exists");
    } else if init_if_missing {
        info!(%config_pda, "registry config missing, initializing");
        let receipt = gateway.init_contract().await?;
        info!(tx_hash = ?receipt.tx_hash(), "registry initialized");
    } else {
        anyhow::bail!("registry config account {} does not exist. Re-run with --init-if-missing", config_pda);
    }

    let owner = gateway.owner_address().await?;
    info!(%owner, payer_is_owner = owner == payer.to_string(), "registry owner readable");
    if owner != payer.to_string() && !gateway.is_whitelisted(&payer.to_string()).await? {
        warn!("payer is neither owner nor whitelisted; store_document calls will be rejected");
    }

    info!("preflight OK");
    Ok(())
}
