// src/bin/api_server.rs

use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use certchain::infra::config::{AppConfig, LedgerBackend, StoreBackend};
use certchain::infra::ledger::LedgerGateway;
use certchain::solana::SolanaLedgerGateway;
use certchain::storage::{FileStorage, LocalFileStorage, MemoryStore, PgStore};
use certchain::transport;
use certchain::{CertificateService, InMemoryLedger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;

    // --- Ledger ---
    let ledger: Arc<dyn LedgerGateway> = match config.ledger_backend {
        LedgerBackend::Solana => {
            let solana = config
                .solana
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("Solana settings missing for LEDGER_BACKEND=solana"))?;
            let gateway = SolanaLedgerGateway::new(solana, config.ledger_network.clone())?;
            info!(payer = %gateway.payer_pubkey(), program_id = %gateway.program_id(), "Solana ledger gateway ready");
            Arc::new(gateway)
        }
        LedgerBackend::Memory => {
            warn!("LEDGER_BACKEND=memory: documents are not anchored on any chain");
            Arc::new(InMemoryLedger::initialized("service-signer"))
        }
    };

    // --- Files ---
    let local_files = LocalFileStorage::new(config.storage_root.clone()).await?;
    info!(root = %local_files.root().display(), provider = local_files.provider(), "file storage ready");
    let files: Arc<dyn FileStorage> = Arc::new(local_files);

    // --- Persistence ---
    let (service, db) = match config.store_backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?;
            let store = PgStore::connect(url, config.db_max_connections).await?;
            info!(max_connections = config.db_max_connections, "connected to Postgres, schema ensured");
            let service = CertificateService::with_store(ledger, Arc::new(store.clone()), files);
            (service, Some(store))
        }
        StoreBackend::Memory => {
            warn!("STORE_BACKEND=memory: records are lost on restart");
            let service = CertificateService::with_store(ledger, Arc::new(MemoryStore::new()), files);
            (service, None)
        }
    };

    let app_state = transport::http::AppState {
        service: Arc::new(service),
        db,
    };

    // --- API Server ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = transport::http::create_router(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", transport::http::ApiDoc::openapi()))
        .layer(cors);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "API server listening");
    info!("Swagger UI available at http://{}/swagger-ui", config.bind_addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}
