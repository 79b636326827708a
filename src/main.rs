//! Lead intake service: REST API over the submission store with
//! fire-and-forget email notifications.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{Level, info, warn};

use contact_service::config::Config;
use contact_service::db::{Database, create_pool};
use contact_service::email::{EmailConfig, EmailService};
use contact_service::middleware::{MetricsLayer, RateLimiter, RequestIdLayer};
use contact_service::routes::{AppState, router};
use contact_service::service::IntakeService;
use contact_service::telemetry::{init_metrics, setup_telemetry, shutdown_telemetry};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::init()?;
    let otel_provider = setup_telemetry(&config);
    let metrics_handle = init_metrics();

    info!(
        version = VERSION,
        address = %config.http_address,
        otlp = config.otlp_endpoint.is_some(),
        environment = config.environment.as_deref().unwrap_or("development"),
        pid = std::process::id(),
        "Starting contact-service"
    );

    // Database
    let pool = create_pool(&config).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Connected to database");
    let database = Database::new(pool);

    // Notifier (optional: the service runs without email configured)
    let notifier = init_email(&config).await;

    let intake = IntakeService::new(database, notifier, config.duplicate_window_secs);

    // One-shot retention sweep mode for external scheduling (cron etc.)
    if config.retention_sweep {
        let removed = intake.sweep_expired().await?;
        info!(removed, "Retention sweep finished, exiting");
        shutdown_telemetry(otel_provider);
        return Ok(());
    }

    let state = AppState {
        intake,
        contact_limiter: Arc::new(RateLimiter::new(
            config.contact_rate_limit,
            config.contact_rate_window(),
        )),
        demo_call_limiter: Arc::new(RateLimiter::new(
            config.demo_call_rate_limit,
            config.demo_call_rate_window(),
        )),
    };

    let cors = build_cors(config.cors_allow_origins.as_deref());

    // Middleware stack (executes top-to-bottom on request)
    let middleware = ServiceBuilder::new()
        .layer(RequestIdLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &http::Request<_>| {
                    tracing::info_span!(
                        "request",
                        method = %req.method(),
                        uri = %req.uri(),
                        request_id = tracing::field::Empty,
                    )
                })
                .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .layer(MetricsLayer::new())
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(cors);

    let app = router(state)
        .route(
            "/metrics",
            get(move || async move { metrics_handle.render() }),
        )
        .layer(middleware);

    let addr: SocketAddr = config.http_address.parse()?;
    info!(address = %addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    shutdown_telemetry(otel_provider);
    info!("Shutdown complete");
    Ok(())
}

async fn init_email(config: &Config) -> Option<EmailService> {
    let (Some(smtp_url), Some(sales_email)) = (&config.smtp_url, &config.sales_email) else {
        info!("Email not configured, notifications disabled");
        return None;
    };

    let mut email_config =
        match EmailConfig::from_url(smtp_url, &config.from_email, sales_email, &config.app_domain) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Invalid SMTP configuration, notifications disabled");
                return None;
            }
        };
    email_config.demo_phone = config.demo_phone_number.clone();

    match EmailService::new(email_config) {
        Ok(service) => {
            if let Err(e) = service.test_connection().await {
                warn!(error = %e, "SMTP connection test failed, continuing anyway");
            }
            Some(service)
        }
        Err(e) => {
            warn!(error = %e, "Failed to initialize email service, notifications disabled");
            None
        }
    }
}

fn build_cors(origins: Option<&str>) -> CorsLayer {
    let cors = match origins {
        Some(o) if o.trim() == "*" => CorsLayer::permissive(),
        Some(o) => {
            let origins: Vec<_> = o.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            CorsLayer::new().allow_origin(origins)
        }
        None => CorsLayer::permissive(),
    };

    cors.allow_headers(Any)
        .expose_headers(["x-request-id".parse().expect("valid header name")])
        .allow_methods(Any)
        .max_age(std::time::Duration::from_secs(3600))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
