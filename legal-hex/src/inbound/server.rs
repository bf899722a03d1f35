//! HTTP Server configuration and startup.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use legal_types::AccountStore;

use super::auth::auth_middleware;
use super::handlers::{self, AppState};
use super::rate_limit::{RateLimiterState, rate_limit_middleware};
use crate::openapi::ApiDoc;

/// HTTP Server for the Legal Assist API.
pub struct HttpServer<R: AccountStore> {
    state: Arc<AppState<R>>,
    rate_limiter: Arc<RateLimiterState>,
}

impl<R: AccountStore> HttpServer<R> {
    /// Creates a server allowing `requests_per_minute` per bearer token.
    pub fn new(state: AppState<R>, requests_per_minute: u32) -> Self {
        Self {
            state: Arc::new(state),
            rate_limiter: Arc::new(RateLimiterState::new(
                requests_per_minute,
                Duration::from_secs(60),
            )),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        // Build HTTP metrics layer (uses globally set MeterProvider)
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        let public = Router::new()
            .route("/health", get(handlers::health))
            .route("/users/register", post(handlers::register_client::<R>))
            .route("/users/login", post(handlers::login_client::<R>))
            .route("/lawyers/register", post(handlers::register_lawyer::<R>))
            .route("/lawyers/login", post(handlers::login_lawyer::<R>));

        let protected = Router::new()
            .route("/users/profile", get(handlers::profile::<R>))
            .route(
                "/users/available-lawyers",
                get(handlers::available_lawyers::<R>),
            )
            .route("/lawyers/profile", get(handlers::lawyer_profile::<R>))
            .route("/lawyers/update", put(handlers::update_lawyer::<R>))
            .route("/lawyers/clients", get(handlers::lawyer_clients::<R>))
            .route(
                "/payments/create-order/subscription",
                post(handlers::create_subscription_order::<R>),
            )
            .route(
                "/payments/create-order/{target_id}",
                post(handlers::create_consultation_order::<R>),
            )
            .route("/payments/verify", post(handlers::verify_payment::<R>))
            .route("/chat/send", post(handlers::send_chat::<R>))
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth_middleware::<R>,
            ));

        public
            .merge(protected)
            .with_state(self.state.clone())
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
            .layer(metrics)
            .layer(middleware::from_fn_with_state(
                self.rate_limiter.clone(),
                rate_limit_middleware,
            ))
            .layer(TraceLayer::new_for_http())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
