//! # Legal Assist Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the store adapter
//! - Create the payment gateway and text generation clients
//! - Create the account, payment and chat services
//! - Start the HTTP server

mod config;

use std::sync::Arc;

use opentelemetry::global;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace as sdktrace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use legal_hex::inbound::{AppState, HttpServer, TokenKeys};
use legal_hex::outbound::{GeminiGenerator, RazorpayGateway, RetryPolicy};
use legal_hex::{AccountService, AccountSettings, ChatService, PaymentService, PaymentSettings};
use legal_repo::{build_repo, security::DEFAULT_COST};

fn init_tracer(
    endpoint: &str,
) -> anyhow::Result<(sdktrace::Tracer, sdktrace::SdkTracerProvider)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // Use gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok((provider.tracer("legal-assist"), provider))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = config::Config::from_env()?;

    // OpenTelemetry export only when a collector is configured
    let otel = config
        .otlp_endpoint
        .as_deref()
        .map(init_tracer)
        .transpose()?;
    let telemetry = otel
        .as_ref()
        .map(|(tracer, _)| tracing_opentelemetry::layer().with_tracer(tracer.clone()));

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,legal_app=debug,legal_hex=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry)
        .init();

    tracing::info!("Starting legal assist server on port {}", config.port);

    // Build store (handles connection and migration)
    let repo = Arc::new(build_repo(&config.database_url).await?);

    let retry = RetryPolicy {
        max_retries: config.upstream_max_retries,
        ..RetryPolicy::default()
    };
    let gateway = RazorpayGateway::new(
        config.razorpay_key_id.clone(),
        config.razorpay_key_secret.clone(),
        config.upstream_timeout,
        retry,
    )?;
    let generator = GeminiGenerator::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.upstream_timeout,
        retry,
    )?;

    let state = AppState {
        accounts: AccountService::new(
            repo.clone(),
            AccountSettings {
                bcrypt_cost: DEFAULT_COST,
            },
        ),
        payments: PaymentService::new(
            repo.clone(),
            Arc::new(gateway),
            PaymentSettings {
                key_secret: config.razorpay_key_secret.clone(),
                currency: config.currency,
                subscription_price: config.subscription_price,
                default_consultation_charge: config.default_consultation_charge,
            },
        ),
        chat: ChatService::new(repo, Arc::new(generator)),
        tokens: TokenKeys::new(config.jwt_secret.as_bytes(), config.token_ttl),
    };

    // Create and run the HTTP server
    let server = HttpServer::new(state, config.rate_limit_per_minute);
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    // Ensure traces are flushed before exit
    if let Some((_, provider)) = otel {
        let _ = provider.shutdown();
    }
    Ok(())
}
