//! HTTP server binary for pdf-workbench.
//!
//! Every session gets its own workspace under `--sessions-root`. Sessions
//! live until deleted, or until `--session-ttl-secs` elapses when a TTL is
//! configured.

use anyhow::{Context, Result};
use clap::Parser;
use pdf_workbench::server::{router, AppState, DEFAULT_BODY_LIMIT};
use pdf_workbench::{
    cleanup_older_than, Collaborators, MemorySessionStore, SessionStore, WorkbenchConfig,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often the TTL sweep runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Multi-session PDF workspace API.
#[derive(Parser, Debug)]
#[command(name = "pdfwb-server", version, about = "Multi-session PDF workspace API")]
struct Args {
    #[arg(long, env = "PDFWB_HOST", default_value = "0.0.0.0")]
    host: std::net::IpAddr,

    #[arg(long, env = "PDFWB_PORT", default_value_t = 8000)]
    port: u16,

    /// Directory holding one workspace per session.
    /// Default: <system temp>/pdf_processing.
    #[arg(long, env = "PDFWB_SESSIONS_ROOT")]
    sessions_root: Option<PathBuf>,

    /// Concurrent document operations. Default: available parallelism.
    #[arg(long, env = "PDFWB_WORKERS")]
    workers: Option<usize>,

    /// Maximum request body size in bytes.
    #[arg(long, env = "PDFWB_BODY_LIMIT", default_value_t = DEFAULT_BODY_LIMIT)]
    body_limit: usize,

    /// Destroy sessions older than this many seconds. Unset: never.
    #[arg(long, env = "PDFWB_SESSION_TTL_SECS")]
    session_ttl_secs: Option<u64>,

    /// Rendering DPI for OCR and vision Markdown (72–600).
    #[arg(long, env = "PDFWB_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Vision model ID.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present, before clap reads env-backed flags
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_workbench=info,pdfwb_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(build_config(&args)?);
    std::fs::create_dir_all(&config.sessions_root).with_context(|| {
        format!("Failed to create sessions root {}", config.sessions_root.display())
    })?;

    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(&config.sessions_root));
    if let Some(ttl) = args.session_ttl_secs {
        start_cleanup_task(Arc::clone(&store), ttl);
    }

    let state = AppState::new(store, Collaborators::from_config(&config), Arc::clone(&config));
    info!(
        workers = state.pool.size(),
        sessions_root = %config.sessions_root.display(),
        "Starting pdfwb-server v{}",
        env!("CARGO_PKG_VERSION")
    );
    let app = router(state, args.body_limit);

    let addr = SocketAddr::new(args.host, args.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

fn build_config(args: &Args) -> Result<WorkbenchConfig> {
    let mut builder = WorkbenchConfig::builder().dpi(args.dpi);
    if let Some(ref root) = args.sessions_root {
        builder = builder.sessions_root(root.clone());
    }
    if let Some(workers) = args.workers {
        builder = builder.workers(workers);
    }
    if let Some(ref model) = args.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider.clone());
    }
    builder.build().context("Invalid configuration")
}

/// Periodically destroy sessions older than `ttl_secs`.
fn start_cleanup_task(store: Arc<dyn SessionStore>, ttl_secs: u64) {
    let max_age = chrono::Duration::seconds(ttl_secs.min(u64::from(u32::MAX)) as i64);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let store = Arc::clone(&store);
            let sweep =
                tokio::task::spawn_blocking(move || cleanup_older_than(store.as_ref(), max_age));
            if let Err(e) = sweep.await {
                tracing::warn!(error = %e, "Session sweep failed");
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
