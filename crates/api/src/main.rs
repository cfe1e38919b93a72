//! API server entry point.

use api::config::Config;
use fanout::TracingDeadLetterSink;
use registrar::{DataCiteClient, TenantConfigProvider};
use saga::{HttpResourceResolver, TracingEventSink};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Load tenants once; they are read-only from here on
    let tenants = TenantConfigProvider::from_json_file(&config.tenant_config_path)
        .expect("failed to load tenant configuration");
    tracing::info!(
        path = %config.tenant_config_path.display(),
        tenants = tenants.len(),
        "tenant configuration loaded"
    );

    // 4. Remote collaborators
    let registrar =
        DataCiteClient::new(config.registrar_timeout).expect("failed to build registrar client");
    let resolver = HttpResourceResolver::new(config.registrar_timeout)
        .expect("failed to build resource resolver");

    // 5. Build the application
    let state = api::create_state(
        registrar,
        resolver,
        tenants,
        TracingEventSink,
        TracingDeadLetterSink,
        config.fanout_max_attempts,
    );
    let app = api::create_app(state, metrics_handle);

    // 6. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
