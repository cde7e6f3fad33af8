//! Application entry point for the `airly-aqi` service.
//!
//! This binary orchestrates the full startup sequence:
//! - Initializing structured logging/tracing
//! - Loading configuration from environment variables or `.env`
//! - Building the refresh engine and starting the poller
//! - Binding the Axum status API and serving until Ctrl-C
//!
//! # Environment Variables
//! - `AIRLY_API_KEY` (**required**) – Airly API key
//! - `AIRLY_LATITUDE`, `AIRLY_LONGITUDE` (**required**) – location
//! - `AIRLY_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `AIRLY_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! See `config` for the remaining optional settings.
use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Result;
use axum::Router;
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use tokio::sync::watch;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use airly_aqi::{
    config, routes, AccessoryState, HttpTransport, MeasurementRequest, Poller, RefreshEngine,
};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    init_tracing();
    dotenv().ok();

    // Configuration errors are fatal before anything is scheduled.
    let cfg = config::load_from_env()?;
    cfg.log_config();

    let accessory = AccessoryState::new(cfg.name.clone());
    let transport = HttpTransport::new()?;
    let engine = RefreshEngine::new(
        Arc::new(transport),
        Arc::new(accessory.clone()),
        MeasurementRequest::from_config(&cfg),
    );
    tracing::info!("Airly API v2 accessory initialized");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller = Poller::new(engine.clone(), cfg.refresh_interval, shutdown_rx.clone());
    poller.start();

    let app: Router = routes::router(engine, accessory);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.http_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received");
                shutdown_tx.send_replace(true);
            }
            Err(err) => {
                // Dropping the sender would read as a shutdown; keep it alive.
                tracing::error!("Unable to listen for shutdown signal: {}", err);
                let _keep_open = shutdown_tx;
                std::future::pending::<()>().await;
            }
        }
    });

    let mut server_shutdown = shutdown_rx;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.wait_for(|stop| *stop).await;
        })
        .await?;

    poller.stop();
    Ok(())
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `AIRLY_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by `RUST_LOG`, else the `AIRLY_LOG_LEVEL` env var
///
/// This should be called once at application startup before any logging
/// or tracing macros are invoked.
fn init_tracing() {
    // ---
    let span_events = match env::var("AIRLY_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("AIRLY_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},hyper=info,reqwest=info"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
