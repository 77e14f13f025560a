use crate::config::{CorsConfig, ServerConfig};
use crate::service::BackupService;
use crate::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::get,
    routing::post,
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::auth::{auth_middleware, KeyChecker};
use super::routes;

pub struct ApiServer {
    service: Arc<BackupService>,
    checker: Arc<KeyChecker>,
    cors_config: CorsConfig,
    max_body_size: usize,
}

impl ApiServer {
    pub fn new(service: Arc<BackupService>, server: &ServerConfig, checker: KeyChecker) -> Self {
        Self {
            service,
            checker: Arc::new(checker),
            cors_config: server.cors.clone(),
            max_body_size: server.max_body_size,
        }
    }

    /// Build CORS layer from configuration
    fn build_cors_layer(&self) -> CorsLayer {
        if !self.cors_config.enabled {
            return CorsLayer::new();
        }

        let origins: Vec<HeaderValue> = self
            .cors_config
            .origins
            .iter()
            .filter(|o| o.as_str() != "*")
            .filter_map(|o| o.parse().ok())
            .collect();

        let has_wildcard = self.cors_config.origins.iter().any(|o| o == "*");

        let cors = if has_wildcard {
            CorsLayer::new().allow_origin(tower_http::cors::Any)
        } else if origins.is_empty() {
            CorsLayer::new()
        } else {
            CorsLayer::new().allow_origin(origins)
        };

        cors.allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(tower_http::cors::Any)
    }

    pub fn router(&self) -> Router {
        let media_route = format!("{}*path", self.service.media().prefix());

        let checker = self.checker.clone();
        let routes = Router::new()
            .route("/admin/export/start", post(routes::start_export))
            .route(
                "/admin/export/poll",
                get(routes::poll_export).post(routes::poll_export),
            )
            .route("/admin/import/upload", post(routes::upload_import))
            .route("/admin/import/start", post(routes::start_import))
            .route(
                "/admin/import/poll",
                get(routes::poll_import).post(routes::poll_import),
            )
            .route(&media_route, get(routes::serve_media))
            .route("/health", get(routes::health))
            .with_state(self.service.clone())
            .layer(middleware::from_fn(
                move |req: axum::extract::Request, next: middleware::Next| {
                    auth_middleware(checker.clone(), req, next)
                },
            ))
            .layer(DefaultBodyLimit::max(self.max_body_size));

        Router::new()
            .merge(routes)
            .layer(self.build_cors_layer())
            .layer(TraceLayer::new_for_http())
    }

    pub async fn serve(self, addr: &str) -> Result<()> {
        self.serve_router(addr, self.router()).await
    }

    /// Serve `extra` merged with the API routes, e.g. a metrics endpoint.
    pub async fn serve_with(self, addr: &str, extra: Router) -> Result<()> {
        let app = self.router().merge(extra);
        self.serve_router(addr, app).await
    }

    async fn serve_router(&self, addr: &str, app: Router) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .await
            .map_err(|e| crate::Error::Internal(e.to_string()))?;

        Ok(())
    }
}
