pub mod utils;

use std::time::Duration;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const FINAL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
/// Time in-flight downloads get to finish after SIGTERM.
const REQUEST_GRACE_PERIOD: Duration = Duration::from_secs(10);

use common::gate::SECURITY_TARGET;

use crate::http_server;
use crate::{ServiceConfig, ServiceState};

/// Handle for gracefully shutting down the daemon service.
pub struct ShutdownHandle {
    graceful_waiter: tokio::task::JoinHandle<()>,
    handles: Vec<tokio::task::JoinHandle<()>>,
    shutdown_tx: watch::Sender<()>,
}

impl ShutdownHandle {
    /// Block until the service shuts down (via signal or explicit shutdown).
    pub async fn wait(self) {
        shutdown_and_join(self.graceful_waiter, self.handles).await;
    }

    /// Trigger shutdown programmatically.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Initialize logging and the panic handler, then report the startup config.
/// Returns guards that must be kept alive for the duration of the program.
///
/// With a log directory configured, everything is also written to a daily
/// `privy.log`, and rejected download links additionally to `security.log`.
fn init_logging(
    service_config: &ServiceConfig,
) -> Vec<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::filter::Targets;
    use tracing_subscriber::fmt::format::FmtSpan;

    let mut guards = Vec::new();
    let env_filter = || {
        EnvFilter::builder()
            .with_default_directive(service_config.log_level.into())
            .from_env_lossy()
    };

    // Stdout layer
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    guards.push(stdout_guard);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(stdout_writer)
        .with_filter(env_filter());

    let registry = tracing_subscriber::registry().with(stdout_layer);

    match &service_config.log_dir {
        Some(log_dir) => {
            if let Err(e) = std::fs::create_dir_all(log_dir) {
                eprintln!(
                    "Warning: Failed to create log directory {:?}: {}",
                    log_dir, e
                );
            }

            let (file_writer, file_guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, "privy.log"));
            guards.push(file_guard);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_span_events(FmtSpan::CLOSE)
                .with_filter(env_filter());

            let (security_writer, security_guard) = tracing_appender::non_blocking(
                tracing_appender::rolling::daily(log_dir, "security.log"),
            );
            guards.push(security_guard);
            let security_layer = tracing_subscriber::fmt::layer()
                .with_writer(security_writer)
                .with_ansi(false)
                .with_filter(Targets::new().with_target(SECURITY_TARGET, tracing::Level::INFO));

            registry.with(file_layer).with(security_layer).init();
        }
        None => registry.init(),
    }

    utils::register_panic_logger();
    utils::report_startup(service_config);

    guards
}

/// Create service state from config, exiting on error.
fn create_state(service_config: &ServiceConfig) -> ServiceState {
    match ServiceState::from_config(service_config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("error creating server state: {}", e);
            std::process::exit(3);
        }
    }
}

/// Wait for shutdown and join all handles with timeout.
async fn shutdown_and_join(
    graceful_waiter: tokio::task::JoinHandle<()>,
    handles: Vec<tokio::task::JoinHandle<()>>,
) {
    let _ = graceful_waiter.await;

    if timeout(FINAL_SHUTDOWN_TIMEOUT, join_all(handles))
        .await
        .is_err()
    {
        tracing::error!(
            "Failed to shut down within {} seconds",
            FINAL_SHUTDOWN_TIMEOUT.as_secs()
        );
        std::process::exit(4);
    }
}

/// Create state and spawn both HTTP servers, returning the state handle.
///
/// The returned `ShutdownHandle` must be kept alive; dropping it does not stop the service.
pub async fn start_service(service_config: &ServiceConfig) -> (ServiceState, ShutdownHandle) {
    let (graceful_waiter, shutdown_tx, shutdown_rx) =
        match utils::shutdown_signal(REQUEST_GRACE_PERIOD) {
            Ok(signal) => signal,
            Err(e) => {
                tracing::error!("failed to install signal handlers: {}", e);
                std::process::exit(2);
            }
        };
    let state = create_state(service_config);

    let mut handles = Vec::new();

    // Spawn API server
    let api_addr = service_config.api_addr();
    let api_state = state.clone();
    let api_config = http_server::Config::new(api_addr, service_config.log_level);
    let api_rx = shutdown_rx.clone();
    let api_handle = tokio::spawn(async move {
        if let Err(e) = http_server::run_api(api_config, api_state, api_rx).await {
            tracing::error!("API server error: {}", e);
        }
    });
    handles.push(api_handle);

    // Spawn gateway server
    let gw_addr = service_config.gateway_addr();
    let gw_state = state.clone();
    let gw_config = http_server::Config::new(gw_addr, service_config.log_level);
    let gw_rx = shutdown_rx.clone();
    let gw_handle = tokio::spawn(async move {
        if let Err(e) = http_server::run_gateway(gw_config, gw_state, gw_rx).await {
            tracing::error!("Gateway server error: {}", e);
        }
    });
    handles.push(gw_handle);

    tracing::info!(api = %api_addr, gateway = %gw_addr, "privy running");

    let handle = ShutdownHandle {
        graceful_waiter,
        handles,
        shutdown_tx,
    };

    (state, handle)
}

/// Spawns the daemon service: API server + gateway server.
/// Blocks until shutdown signal is received. Use for CLI binary usage.
pub async fn spawn_service(service_config: &ServiceConfig) {
    let _guards = init_logging(service_config);
    let (_, handle) = start_service(service_config).await;
    handle.wait().await;
}
