//! # HTTP Server
//!
//! Combines the report and resource routers under both API prefixes, adds
//! the health check, CORS and request tracing, and answers everything
//! unmatched with a 404 envelope.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, HeaderName, Method, Uri};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::config::ServiceConfig;
use super::errors::ApiError;
use super::report_routes::{report_routes, EXPORT_MESSAGES_HEADER, EXPORT_TRUNCATED_HEADER};
use super::resource_routes::{health_routes, resource_routes};
use super::state::AppState;
use crate::file_cache::StorageBackend;

/// Prefixes the API is served under
pub const API_PREFIXES: [&str; 2] = ["/api", "/ghgp/api"];

/// Fallback for unknown paths and unsupported methods
pub async fn route_not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::RouteNotFound {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}

/// HTTP Server for the report API
pub struct HttpServer {
    config: ServiceConfig,
    router: Router,
}

impl HttpServer {
    /// Create a server reading from `backend`
    pub fn new(config: ServiceConfig, backend: StorageBackend) -> Self {
        let state = Arc::new(AppState::new(config.clone(), backend));
        let router = Self::build_router(state);
        Self { config, router }
    }

    /// Build the combined router with all endpoints
    pub fn build_router(state: Arc<AppState>) -> Router {
        let cors = Self::cors_layer(state.config());

        let mut router = Router::new().merge(health_routes());
        for prefix in API_PREFIXES {
            router = router.nest(prefix, report_routes().merge(resource_routes()));
        }

        router
            .fallback(route_not_found)
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(state)
    }

    fn cors_layer(config: &ServiceConfig) -> CorsLayer {
        let exposed = [
            header::CONTENT_DISPOSITION,
            HeaderName::from_static(EXPORT_TRUNCATED_HEADER),
            HeaderName::from_static(EXPORT_MESSAGES_HEADER),
        ];

        let origins = if config.cors_origins.is_empty() {
            AllowOrigin::any()
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();
            AllowOrigin::list(origins)
        };

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(exposed)
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Serve until interrupted
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self
            .config
            .socket_addr()
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("{}", e)))?;

        let listener = TcpListener::bind(addr).await?;
        tracing::info!(
            event = "SERVER_START",
            %addr,
            prefixes = ?API_PREFIXES,
            scratch_dir = %self.config.scratch_dir.display(),
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!(event = "SERVER_STOP");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
