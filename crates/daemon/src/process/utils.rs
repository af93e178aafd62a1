use std::io;
use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use common::auth::Role;

use crate::ServiceConfig;

/// Watches for SIGINT and SIGTERM and broadcasts shutdown on the returned watch.
///
/// SIGINT stops at once. SIGTERM first waits `grace` so in-flight
/// downloads can finish. The sender allows programmatic shutdown.
pub fn shutdown_signal(
    grace: Duration,
) -> io::Result<(JoinHandle<()>, watch::Sender<()>, watch::Receiver<()>)> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let (tx, rx) = watch::channel(());
    let signal_tx = tx.clone();
    let mut programmatic = rx.clone();

    let handle = tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => {
                tracing::info!("SIGINT received, stopping now");
            }
            _ = sigterm.recv() => {
                tracing::info!(grace_secs = grace.as_secs(), "SIGTERM received, draining downloads");
                tokio::time::sleep(grace).await;
            }
            _ = programmatic.changed() => {
                tracing::debug!("shutdown requested");
                return;
            }
        }

        let _ = signal_tx.send(());
    });

    Ok((handle, tx, rx))
}

/// Logs panics through `tracing` so they land in the log files too.
pub fn register_panic_logger() {
    std::panic::set_hook(Box::new(|panic| match panic.location() {
        Some(loc) => {
            tracing::error!(
                message = %panic,
                panic.file = loc.file(),
                panic.line = loc.line(),
                "privy panicked"
            );
        }
        None => tracing::error!(message = %panic, "privy panicked"),
    }));
}

/// Logs the build and the effective configuration, minus the link key.
pub fn report_startup(config: &ServiceConfig) {
    let build = common::prelude::build_info();
    let (administrators, members) = session_counts(config);

    tracing::info!(
        version = %build.version,
        build_profile = %build.build_profile,
        built = %build.build_timestamp,
        "privy starting up"
    );
    tracing::info!(
        private_dir = %config.private_base_dir.display(),
        public_uploads = %config.public_upload_root.display(),
        site_url = %config.site_url,
        link_ttl_secs = config.link_ttl.as_secs(),
        administrators,
        members,
        "configuration loaded"
    );
    if administrators + members == 0 {
        tracing::warn!("no sessions configured, every download will be refused");
    }
}

fn session_counts(config: &ServiceConfig) -> (usize, usize) {
    let administrators = config
        .sessions
        .values()
        .filter(|session| session.role == Role::Administrator)
        .count();
    (administrators, config.sessions.len() - administrators)
}
