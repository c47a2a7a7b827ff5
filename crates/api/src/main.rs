//! API server entry point.

use std::time::Duration;

use api::config::Config;
use api::middleware::RequestMetrics;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::signal;

const METRICS_UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

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

/// Periodically drains histogram buffers held by the Prometheus recorder.
fn spawn_metrics_upkeep(handle: PrometheusHandle) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(METRICS_UPKEEP_INTERVAL);
        loop {
            interval.tick().await;
            handle.run_upkeep();
        }
    });
}

#[tokio::main]
async fn main() {
    // 1. Configuration, logging and trace export
    let config = Config::from_env();
    let telemetry =
        api::telemetry::init_telemetry(&config).expect("failed to initialize telemetry");

    // 2. Prometheus recorder, injected rather than installed globally
    let (meter, metrics_handle) =
        api::telemetry::prometheus_meter().expect("failed to build Prometheus recorder");
    spawn_metrics_upkeep(metrics_handle.clone());

    // 3. Downstream client, orchestrator and store
    let state = api::create_state(&config, meter.clone()).expect("failed to build HTTP client");

    // 4. Build the application
    let app = api::create_app(state, metrics_handle, RequestMetrics::new(meter));

    // 5. Start server
    let addr = config.addr();
    tracing::info!(
        %addr,
        inventory = %config.inventory_url,
        payment = %config.payment_url,
        timeout_ms = config.downstream_timeout.as_millis() as u64,
        "starting order service"
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");

    // 6. Flush buffered spans and logs
    tokio::task::spawn_blocking(move || telemetry.shutdown())
        .await
        .expect("telemetry shutdown task panicked");
}
