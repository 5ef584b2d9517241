//! Product Search Main Entry Point
//!
//! Serves product search over HTTP and runs the popular term roll-up job.

use std::env;
use std::net::SocketAddr;

use dotenv::dotenv;
use product_search::server::{create_app, serve};
use product_search::{Dependencies, ServiceError};
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("product_search=info,product_search_repository=info"));

    let json_logs = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .init();

        info!(
            service_name = "product-search",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with JSON format"
        );
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .init();

        info!(
            service_name = "product-search",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with console output"
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), ServiceError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing();

    info!("Starting product search service");

    let deps = match Dependencies::new().await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let aggregator_handle = deps.aggregator.map(|aggregator| {
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move { aggregator.run(shutdown_rx).await })
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], deps.settings.server_port));
    let app = create_app(deps.service, &deps.settings.cors_allowed_origins);
    let server_result = serve(app, addr, shutdown_tx, tokio::signal::ctrl_c()).await;

    if let Some(handle) = aggregator_handle {
        if let Err(e) = handle.await {
            error!(error = %e, "Aggregator task failed");
        }
    }

    match server_result {
        Ok(()) => {
            info!("Product search service stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Server failed");
            Err(e)
        }
    }
}
