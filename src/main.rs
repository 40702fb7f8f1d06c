use std::sync::Arc;

use checkout_bridge::config::ConfigValidator;
use checkout_bridge::infrastructure::adapters::{
    CredentialLedger, InMemoryCartStore, InMemoryOrderRepository, SessionStore,
};
use checkout_bridge::shared::{CheckoutMetrics, LoggingUtils};
use checkout_bridge::{AppConfig, CheckoutCoordinator, CheckoutDependencies, CheckoutExtensions, HttpServer};
use redis::aio::ConnectionManager;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Load configuration before logging so the configured level applies
    let config = AppConfig::load();
    let level = config.as_ref().map(|c| c.logging.level.clone()).unwrap_or_else(|_| "info".to_string());
    if let Err(e) = LoggingUtils::initialize(&level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!("Starting checkout bridge...");

    let config = match config {
        Ok(config) => {
            info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = ConfigValidator::validate_config(&config) {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let coordinator = match build_coordinator(&config).await {
        Ok(coordinator) => {
            info!(available = coordinator.is_available(), "Checkout coordinator initialized");
            Arc::new(coordinator)
        }
        Err(e) => {
            error!("Failed to initialize checkout coordinator: {}", e);
            std::process::exit(1);
        }
    };

    coordinator.start_expiry_sweep().await;

    let server = HttpServer::new(config, coordinator);
    info!("Server starting on {}", server.config().server_address());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
    };
    if let Err(e) = server.run(shutdown).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn build_coordinator(config: &AppConfig) -> checkout_bridge::Result<CheckoutCoordinator> {
    let redis = match &config.session_store.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str())?;
            info!("Using Redis for sessions and spent credentials");
            Some(Arc::new(ConnectionManager::new(client).await?))
        }
        None => None,
    };

    let deps = CheckoutDependencies {
        orders: Arc::new(InMemoryOrderRepository::new()),
        carts: Arc::new(InMemoryCartStore::new()),
        sessions: SessionStore::new(redis.clone()),
        ledger: CredentialLedger::new(redis),
        metrics: CheckoutMetrics::new()?,
    };

    CheckoutCoordinator::new(config, deps, CheckoutExtensions::new(&config.gateway.gateway_id))
}
