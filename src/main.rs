use std::sync::Arc;

use eth_sui_bridge::api::{self, AppState};
use eth_sui_bridge::config::Config;
use eth_sui_bridge::coordinator::BridgeCoordinator;
use eth_sui_bridge::db::{self, IntentStore, PgIntentStore};
use eth_sui_bridge::ledgers::{EthAdapter, SuiAdapter, SuiLedger};
use eth_sui_bridge::sui_client::SuiClient;
use eth_sui_bridge::validation::RequestValidator;
use eyre::WrapErr;

fn main() -> eyre::Result<()> {
    // Install color-eyre for better error reporting
    color_eyre::install()?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> eyre::Result<()> {
    init_logging();

    tracing::info!("Starting Eth-Sui bridge");

    let config = Config::load()?;
    tracing::info!(
        network = ?config.network,
        sui_rpc = %config.sui.rpc_url,
        eth_contract = %config.eth.contract_address,
        "Configuration loaded"
    );

    let pool = db::create_pool(&config.database.url).await?;
    tracing::info!("Database connected");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let intents: Arc<dyn IntentStore> = Arc::new(PgIntentStore::new(pool));

    let eth = Arc::new(EthAdapter::new(&config.eth)?);
    let sui_client = Arc::new(SuiClient::new(&config.sui.rpc_url, &config.sui.private_key_hex)?);
    let sui = Arc::new(SuiAdapter::new(&config.sui, sui_client));

    // Fail fast if the authority objects are missing on this network
    let refs = sui
        .refresh_object_refs(&config.sui.authority_object_ids())
        .await
        .wrap_err("Sui authority objects unavailable")?;
    for r in &refs {
        tracing::info!(object_id = %r.object_id, version = r.version, "Authority object found");
    }

    let validator = RequestValidator::new(config.eth.decimals, config.sui.decimals);
    let coordinator = Arc::new(BridgeCoordinator::new(eth, sui, intents.clone(), validator));

    let state = AppState::new(coordinator, intents);
    api::start_api_server(
        &config.server.bind_address,
        config.server.port,
        state,
        wait_for_shutdown_signal(),
    )
    .await?;

    tracing::info!("Eth-Sui bridge stopped");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,eth_sui_bridge=debug"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(true))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .with(filter)
            .init();
    }
}

/// Wait for shutdown signals (SIGINT/SIGTERM)
async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
