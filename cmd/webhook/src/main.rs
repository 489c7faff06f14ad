use svclabel_k8s_util::client::new_client;
use svclabel_k8s_util::namespace::KubeNamespaces;
use svclabel_k8s_util::telemetry;
use svclabel_mutator::engine::Engine;

use std::future::{Future, IntoFuture};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use clap::{Parser, crate_authors, crate_description, crate_version};
use rustls::crypto::aws_lc_rs::default_provider;
use tokio::net::TcpListener;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::Notify;

mod handlers;
mod state;
mod tls;

use state::WebhookState;

const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(
    name = "svclabel-webhook",
    about = crate_description!(),
    version = crate_version!(),
    author = crate_authors!("\n"),
)]
struct Args {
    /// Listen address (use "::" for IPv6, "0.0.0.0" for IPv4)
    #[arg(long, default_value = "0.0.0.0", env)]
    listen_address: IpAddr,

    /// Listen on given port
    #[arg(short, long, default_value_t = 8080, env)]
    port: u16,

    /// Set logging filter directive for `tracing_subscriber::filter::EnvFilter`. Example: "info,svclabel_mutator=debug"
    #[arg(short, long, default_value = "info", env)]
    log_filter: String,

    /// Set log format
    #[arg(long, value_enum, default_value_t = telemetry::LogFormat::Text, env)]
    log_format: telemetry::LogFormat,

    /// URL for the OpenTelemetry tracing endpoint.
    ///
    /// This optional argument specifies the URL to which traces will be sent using
    /// OpenTelemetry. If not provided, tracing will be disabled.
    #[arg(short, long, env = "OPENTELEMETRY_ENDPOINT_URL")]
    tracing_url: Option<String>,

    /// Sampling ratio for tracing.
    ///
    /// Specifies the ratio of traces to sample. A value of `1.0` will sample all traces,
    /// while a lower value will sample fewer traces. The default is `0.1`, meaning 10%
    /// of traces are sampled.
    #[arg(short, long, default_value_t = 0.1, env)]
    sample_ratio: f64,

    /// Path to TLS certificate file. Serves plain HTTP when unset.
    #[arg(long, env, requires = "tls_key")]
    tls_cert: Option<PathBuf>,

    /// Path to TLS private key file
    #[arg(long, env, requires = "tls_cert")]
    tls_key: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    let args: Args = Args::parse();

    let telemetry_guard = telemetry::init(
        &args.log_filter,
        args.log_format,
        args.tracing_url.as_deref(),
        args.sample_ratio,
    )
    .await?;

    // built once, shared by every admission call
    let client = new_client().await?;
    let engine = Engine::new(KubeNamespaces::new(client));
    let state = WebhookState::new(engine);

    let app = handlers::router(state.clone());
    let socket_addr = SocketAddr::new(args.listen_address, args.port);

    let shutdown = {
        let state = state.clone();
        async move {
            shutdown_signal().await;
            state.set_not_ready();
            tracing::info!("Received shutdown signal, starting graceful shutdown");
        }
    };

    let served = match (args.tls_cert, args.tls_key) {
        (Some(tls_cert), Some(tls_key)) => {
            serve_https(app, socket_addr, tls_cert, tls_key, shutdown).await
        }
        _ => serve_http(app, socket_addr, shutdown).await,
    };

    telemetry_guard.shutdown();
    served
}

async fn serve_http(
    app: axum::Router,
    socket_addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    tracing::info!("Starting HTTP server on {}", socket_addr);
    let listener = TcpListener::bind(socket_addr).await?;

    let stopping = Arc::new(Notify::new());
    let graceful = {
        let stopping = stopping.clone();
        async move {
            shutdown.await;
            stopping.notify_one();
        }
    };

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(graceful)
        .into_future();
    bounded_shutdown(server, stopping.notified(), SHUTDOWN_GRACE_PERIOD).await?;
    Ok(())
}

/// Wait for `server` to finish, giving up on in-flight requests `grace` after `stopping`
/// resolves.
async fn bounded_shutdown<S, E>(
    server: S,
    stopping: impl Future<Output = ()>,
    grace: Duration,
) -> Result<(), E>
where
    S: Future<Output = Result<(), E>>,
{
    tokio::select! {
        result = server => result,
        _ = async {
            stopping.await;
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!("graceful shutdown did not finish within {:?}, exiting", grace);
            Ok(())
        }
    }
}

async fn serve_https(
    app: axum::Router,
    socket_addr: SocketAddr,
    tls_cert: PathBuf,
    tls_key: PathBuf,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    tracing::info!("Starting HTTPS server on {}", socket_addr);
    let tls_config = tls::load_tls_config(&tls_cert, &tls_key)?;
    let rustls_config = RustlsConfig::from_config(Arc::new(tls_config));

    let handle = Handle::new();
    let shutdown_handle = handle.clone();

    tokio::spawn(async move {
        shutdown.await;
        shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE_PERIOD));
    });

    let server = axum_server::bind_rustls(socket_addr, rustls_config.clone())
        .handle(handle)
        .serve(app.into_make_service());

    tls::serve_with_reload(server, tls_cert, tls_key, rustls_config).await?;
    Ok(())
}

async fn shutdown_signal() {
    let mut sigterm =
        signal(SignalKind::terminate()).expect("failed to install SIGTERM signal handler");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigterm.recv() => {},
    }
}
