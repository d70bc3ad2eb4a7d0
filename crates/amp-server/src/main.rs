//! `amp-server` - the standalone node binary: CLI/config/logging/HTTP status
//! UI wiring around `amp-core`'s real-time audio pipeline.
//!
//! Grounded in the teacher's `apps/server/src/main.rs`: clap parsing,
//! `env_logger` init, config load-with-CLI-override, spawning the HTTP
//! server, and a `tokio::select!`-based graceful shutdown on Ctrl-C/SIGTERM.
//! The one structural departure from the teacher is spec §5's primary loop:
//! it runs on its own dedicated OS thread rather than inside the tokio
//! runtime, since it must never block on async I/O or take a lock for
//! longer than an atomic pointer load.

mod cli;
mod crash;
mod device_discovery;
mod http;
mod primary_loop;
mod service;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use parking_lot::RwLock;

use amp_core::{NodeConfig, StatusPublisher};

use cli::Args;

fn init_logging(trace: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if trace {
        builder.filter_level(log::LevelFilter::Trace);
    }
    builder.init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.trace);
    crash::install_panic_hook();

    let config_path = args.resolved_config_path();
    let mut config = match NodeConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            log::error!("config load failed, using defaults: {e}");
            NodeConfig::default()
        }
    };
    if args.httpport != 0 {
        config.http_port = args.httpport;
    }

    let status = Arc::new(StatusPublisher::new());
    let config_cell = Arc::new(RwLock::new(config.clone()));

    let (reload_tx, reload_rx) = std::sync::mpsc::channel::<NodeConfig>();

    let service_handle = service::spawn(status.clone());

    let http_state = Arc::new(http::AppState {
        status: status.clone(),
        config: RwLock::new(config.clone()),
        config_path: config_path.clone(),
        reload_tx,
    });
    let http_port = config.http_port;
    let http_handle = std::thread::Builder::new()
        .name("amp-http".into())
        .spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("failed to build HTTP runtime");
            runtime.block_on(run_http(http_state, http_port));
        })
        .expect("failed to spawn HTTP thread");

    let stop = Arc::new(AtomicBool::new(false));
    let stop_for_loop = stop.clone();
    let primary_handle = std::thread::Builder::new()
        .name("amp-primary".into())
        .spawn(move || {
            primary_loop::run(config_cell, reload_rx, status, stop_for_loop);
        })
        .expect("failed to spawn primary loop thread");

    wait_for_shutdown_signal();
    stop.store(true, Ordering::SeqCst);

    let _ = primary_handle.join();
    drop(http_handle);
    drop(service_handle);

    Ok(())
}

async fn run_http(state: Arc<http::AppState>, port: u16) {
    let router = http::build_router(state);
    let listener = match tokio::net::TcpListener::bind(("0.0.0.0", port)).await {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("failed to bind HTTP status UI on port {port}: {e}");
            return;
        }
    };
    log::info!("HTTP status UI listening on port {port}");
    if let Err(e) = axum::serve(listener, router).await {
        log::error!("HTTP status UI exited: {e}");
    }
}

fn wait_for_shutdown_signal() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build shutdown-signal runtime");
    runtime.block_on(async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => log::info!("received Ctrl-C, shutting down"),
                _ = sigterm.recv() => log::info!("received SIGTERM, shutting down"),
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            log::info!("received Ctrl-C, shutting down");
        }
    });
}
