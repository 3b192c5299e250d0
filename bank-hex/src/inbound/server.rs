//! HTTP Server configuration and startup.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use bank_types::BankRepository;

use super::handlers::{self, AppState};
use super::rate_limit::{RateLimiterState, rate_limit_middleware};
use crate::BankService;
use crate::openapi::ApiDoc;
use crate::rpc::DEFAULT_TICK;

/// HTTP and WebSocket server for the Bank API.
pub struct HttpServer<R: BankRepository> {
    state: Arc<AppState<R>>,
    rate_limiter: Arc<RateLimiterState>,
}

impl<R: BankRepository> HttpServer<R> {
    /// Creates a new HTTP server with the given service.
    pub fn new(service: BankService<R>) -> Self {
        Self {
            state: Arc::new(AppState {
                service,
                rate_tick: DEFAULT_TICK,
            }),
            rate_limiter: Arc::new(RateLimiterState::default()), // 100 req/min default
        }
    }

    /// Creates a new HTTP server with custom rate limiting and rate feed tick.
    pub fn with_config(
        service: BankService<R>,
        requests_per_minute: u32,
        rate_tick: Duration,
    ) -> Self {
        Self {
            state: Arc::new(AppState { service, rate_tick }),
            rate_limiter: Arc::new(RateLimiterState::new(
                requests_per_minute,
                Duration::from_secs(60),
            )),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        let api = Router::new()
            .route("/health", get(handlers::health))
            .route("/api/accounts", post(handlers::create_account::<R>))
            .route("/api/accounts/{number}", get(handlers::get_account::<R>))
            .route(
                "/api/accounts/{number}/balance",
                get(handlers::get_balance::<R>),
            )
            .route(
                "/api/accounts/{number}/transactions",
                get(handlers::list_transactions::<R>),
            )
            .route("/api/transfers/{id}", get(handlers::get_transfer::<R>))
            .route("/rpc/exchange-rates", get(handlers::exchange_rates::<R>))
            .route(
                "/rpc/transactions/summarize",
                get(handlers::summarize_transactions::<R>),
            )
            .route("/rpc/transfers", get(handlers::transfer_multiple::<R>))
            .layer(middleware::from_fn_with_state(
                self.rate_limiter.clone(),
                rate_limit_middleware,
            ))
            .with_state(self.state.clone());

        Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
            .merge(api)
            .layer(TraceLayer::new_for_http())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        self.serve(listener, shutdown_signal()).await
    }

    /// Serves on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(
        self,
        listener: tokio::net::TcpListener,
        shutdown: F,
    ) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
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
