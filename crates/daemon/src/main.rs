// SPDX-License-Identifier: MIT

//! sessiongraph daemon (sgd)
//!
//! Watches configured session directories, enqueues quiescent sessions onto
//! the durable queue, and runs a worker pool against them. No socket, no
//! CLI subcommands: every knob is an environment variable (see `sg_daemon::env`).

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use sg_daemon::composition::{Daemon, DaemonInit};
use sg_daemon::lifecycle::{acquire_lock, LifecycleError, Paths};
use sg_daemon::{config, env};
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let state_dir = env::state_dir()?;
    let paths = Paths::new(state_dir);

    let _log_guard = setup_logging(&paths)?;

    let lock_guard = match acquire_lock(&paths) {
        Ok(guard) => guard,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&paths.lock_path).unwrap_or_default();
            eprintln!("sgd is already running (pid {})", pid.trim());
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    info!("starting sessiongraph daemon");

    let config = config::load();
    let init = DaemonInit {
        local_roots: env::watch_roots(),
        spoke_roots: env::spoke_roots(),
        prompt_path: env::prompt_path(),
        required_skills: env::required_skills(),
        analyzer_command: env::analyzer_command(),
        worker_count: env::worker_count(),
    };

    let daemon = Daemon::start(&paths, &config, init)?;
    info!(
        queue_lock_duration_secs = config.queue.lock_duration.as_secs(),
        "daemon running, watching for sessions"
    );

    wait_for_shutdown_signal().await?;
    info!("shutdown signal received, draining workers");

    daemon.shutdown().await;
    drop(lock_guard);
    info!("daemon stopped cleanly");

    Ok(())
}

async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => {}
        _ = sigint.recv() => {}
    }
    Ok(())
}

fn setup_logging(paths: &Paths) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = paths.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        paths.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        paths.log_path.file_name().ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
