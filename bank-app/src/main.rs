//! # Bank Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the repository adapter
//! - Create the bank service
//! - Start the synthetic rate generator
//! - Start the HTTP/WebSocket server

mod config;
mod generator;

use std::sync::Arc;

use opentelemetry::global;
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace as sdktrace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bank_hex::{BankService, inbound::HttpServer, rpc::CallContext};
use bank_repo::build_repo;
use bank_types::CurrencyCode;
use exchange_rates::SyntheticRates;

fn init_tracer() -> anyhow::Result<(sdktrace::Tracer, sdktrace::SdkTracerProvider)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // Use gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok((provider.tracer("bank-service"), provider))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // OpenTelemetry export only when a collector is configured
    let otel = match std::env::var_os("OTEL_EXPORTER_OTLP_ENDPOINT") {
        Some(_) => Some(init_tracer()?),
        None => None,
    };
    let telemetry = otel
        .as_ref()
        .map(|(tracer, _)| tracing_opentelemetry::layer().with_tracer(tracer.clone()));

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,bank_app=debug,bank_hex=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry)
        .init();

    // Load configuration
    let config = config::Config::from_env()?;

    tracing::info!("Starting bank server on port {}", config.port);
    tracing::info!("Using {} database", config.database_scheme());

    // Build repository (handles connection and migration)
    let repo = Arc::new(build_repo(&config.database_url).await?);
    let service = BankService::from_shared(repo);

    // Synthetic USD/IDR rates, stopped together with the server
    let (generator_ctx, stop_generator) = CallContext::new();
    let generator = tokio::spawn(generator::run(
        service.rates().clone(),
        SyntheticRates::new(
            CurrencyCode::USD,
            CurrencyCode::IDR,
            config.rate_generator_interval,
        ),
        generator_ctx,
    ));

    // Create and run the HTTP server
    let server = HttpServer::with_config(
        service,
        config.rate_limit_per_minute,
        config.rate_feed_tick,
    );
    let addr = format!("0.0.0.0:{}", config.port);

    let result = server.run(&addr).await;

    stop_generator.cancel();
    if let Err(e) = generator.await {
        tracing::error!(error = %e, "rate generator task failed");
    }

    // Ensure traces are flushed before exit
    if let Some((_, provider)) = otel {
        let _ = provider.shutdown();
    }
    result
}
