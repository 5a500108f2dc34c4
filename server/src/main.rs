use anyhow::{Context, Result};
use axum::Router;
use clap::{ArgGroup, Parser};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};
use wordex_core::work_queue::thread_count;
use wordex_indexer::{Engine, Options, Source};
use wordex_server::{build_app, build_app_with_static};

#[derive(Parser)]
#[command(group(ArgGroup::new("source").args(["text", "html"])))]
struct Args {
    /// Text file or directory to index
    #[arg(long)]
    text: Option<PathBuf>,
    /// Seed URL to crawl
    #[arg(long)]
    html: Option<String>,
    /// Worker threads used while building the index
    #[arg(long)]
    threads: Option<Option<String>>,
    /// Maximum number of pages to crawl
    #[arg(long, default_value_t = 1)]
    max: usize,
    /// Match query words as prefixes
    #[arg(long, default_value_t = false)]
    partial: bool,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Directory with a built front end to serve next to the API
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let source = match (args.text, args.html) {
        (Some(path), _) => Some(Source::Text(path)),
        (None, Some(seed)) => Some(Source::Html { seed, max: args.max }),
        (None, None) => None,
    };
    let opts = Options {
        source,
        threads: args.threads.map(|raw| thread_count(raw.as_deref())),
        partial: args.partial,
        ..Options::default()
    };

    // ingestion blocks on the worker pool; keep it off the async runtime
    let engine: Engine = tokio::task::spawn_blocking(move || wordex_indexer::run(&opts))
        .await
        .context("index build task")??;
    let handler = engine.queries().clone();
    engine.shutdown();

    let app: Router = match &args.static_dir {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "serving static files");
            build_app_with_static(handler, dir)
        }
        None => build_app(handler),
    };
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
