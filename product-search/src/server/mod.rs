//! HTTP server setup and routing.

pub mod handlers;
pub mod state;

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use product_search_repository::ProductSearchService;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use self::state::AppState;
use crate::errors::ServiceError;

/// Create the CORS layer for the configured storefront origins.
///
/// Origins that are not valid header values are skipped.
pub fn create_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(handlers::REQUESTER_HEADER)])
}

/// Create the Axum application router with all routes and middleware
pub fn create_app(service: Arc<ProductSearchService>, allowed_origins: &[String]) -> Router {
    let state = AppState { service };

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/search", get(handlers::search))
        .route("/search/popular", get(handlers::popular_searches))
        .route("/search/recent", get(handlers::recent_searches))
        .route("/autocomplete", get(handlers::autocomplete))
        .route("/products/index", post(handlers::index_products))
        .layer(create_cors_layer(allowed_origins))
        .with_state(state)
}

/// Run the server on the specified address until `shutdown` fires.
pub async fn run_server(
    app: Router,
    addr: SocketAddr,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), ServiceError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("- Search endpoint: http://{}/search", addr);
    info!("- Autocomplete endpoint: http://{}/autocomplete", addr);
    info!("- Health endpoint: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
        .map_err(|e| ServiceError::server(e.to_string()))?;

    info!("Server stopped");
    Ok(())
}

/// Run the server until `signal` resolves or the server itself exits.
///
/// Either way shutdown is broadcast on `shutdown_tx` so background jobs stop
/// with the server. A server that fails to start returns its error at once.
pub async fn serve<S>(
    app: Router,
    addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    signal: S,
) -> Result<(), ServiceError>
where
    S: Future<Output = io::Result<()>>,
{
    let mut server_handle = tokio::spawn(run_server(app, addr, shutdown_tx.subscribe()));

    let server_result = tokio::select! {
        received = signal => {
            if let Err(e) = received {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
            server_handle.await
        }
        result = &mut server_handle => {
            error!("Server exited before shutdown was requested");
            let _ = shutdown_tx.send(());
            result
        }
    };

    server_result.map_err(|e| ServiceError::server(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use product_search_repository::memory::{
        MemoryPopularTerms, MemoryProductIndex, MemorySearchHistory,
    };
    use std::time::Duration;

    fn app() -> Router {
        let service = ProductSearchService::new(
            Arc::new(MemoryProductIndex::new()),
            Arc::new(MemorySearchHistory::new()),
            Arc::new(MemoryPopularTerms::new()),
        );
        create_app(Arc::new(service), &[])
    }

    #[tokio::test]
    async fn test_serve_returns_bind_error_and_broadcasts_shutdown() {
        let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = occupied.local_addr().unwrap();

        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let result = tokio::time::timeout(
            Duration::from_secs(2),
            serve(app(), addr, shutdown_tx, std::future::pending()),
        )
        .await
        .unwrap();

        assert!(matches!(result, Err(ServiceError::ServerError(_))));
        assert!(shutdown_rx.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_serve_stops_on_signal() {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            serve(app(), addr, shutdown_tx, async { Ok(()) }),
        )
        .await
        .unwrap();

        assert!(result.is_ok());
        assert!(shutdown_rx.recv().await.is_ok());
    }
}
