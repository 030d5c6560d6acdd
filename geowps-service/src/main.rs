//! GeoWPS Service - demo OGC Web Processing Service over HTTP.
//!
//! ## Usage
//!
//! ```text
//! geowps-service [LISTEN] [-d|--debug] [-w|--waitress] [--ogr2ogr PATH] [--work-dir DIR]
//! ```
//!
//! `LISTEN` is `host:port` and defaults to `localhost:5000`. Log filtering
//! follows `RUST_LOG` when set.
//!
//! ## Endpoints
//!
//! - `GET /` - Landing page with the endpoint URL
//! - `GET /wps`, `POST /wps` - WPS 1.0.0 requests (KVP or XML)
//! - `GET /datafile/<id>` - Results produced by the `centroids` process

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use geowps::WpsServiceBuilder;
use geowps_service::{app, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Demo OGC WPS server
#[derive(Parser, Debug)]
#[command(name = "geowps-service")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to listen on, as host:port
    #[arg(default_value = "localhost:5000")]
    listen: String,

    /// Verbose logging and error details in exception reports
    #[arg(short, long)]
    debug: bool,

    /// Serve with the multi-threaded production runtime
    #[arg(short, long)]
    waitress: bool,

    /// ogr2ogr executable used by the centroids process
    #[arg(long, default_value = geowps::ogr::DEFAULT_PROGRAM)]
    ogr2ogr: PathBuf,

    /// Directory for per-request scratch directories (default: system temp dir)
    #[arg(long)]
    work_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug {
        "geowps=debug,geowps_service=debug,tower_http=debug"
    } else {
        "geowps=info,geowps_service=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let runtime = if cli.waitress {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?
    } else {
        // Development backend: one request at a time
        tokio::runtime::Builder::new_current_thread()
            .max_blocking_threads(1)
            .enable_all()
            .build()?
    };

    runtime.block_on(serve(cli))
}

async fn serve(cli: Cli) -> Result<()> {
    let (host, port) = parse_listen(&cli.listen)?;

    let mut builder = WpsServiceBuilder::new().ogr2ogr(&cli.ogr2ogr);
    if let Some(dir) = &cli.work_dir {
        builder = builder.work_dir(dir);
    }
    let wps = builder.build();

    match wps.converter().version() {
        Ok(version) => tracing::info!(version = %version, "Found converter"),
        Err(e) => tracing::warn!(
            error = %e,
            "Converter not available, the centroids process will fail"
        ),
    }

    tracing::info!(
        listen = %cli.listen,
        debug = cli.debug,
        backend = if cli.waitress { "multi-thread" } else { "current-thread" },
        converter = %wps.converter().program().display(),
        cache_capacity = wps.data_files().capacity(),
        "Starting GeoWPS service"
    );

    let state = Arc::new(
        AppState::new(wps, &cli.listen, cli.debug)
            .with_context(|| format!("invalid listen address {}", cli.listen))?,
    );

    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("failed to bind {}", cli.listen))?;

    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app(state)).await?;

    Ok(())
}

/// Split `host:port`; brackets around an IPv6 host are removed.
fn parse_listen(listen: &str) -> Result<(String, u16)> {
    let (host, port) = listen
        .rsplit_once(':')
        .with_context(|| format!("expected host:port, got {}", listen))?;
    let port: u16 = port
        .parse()
        .with_context(|| format!("invalid port in {}", listen))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        anyhow::bail!("missing host in {}", listen);
    }
    Ok((host.to_string(), port))
}
