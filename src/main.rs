use anyhow::Context;
use bytes::Bytes;
use clap::Parser;
use http::Request;
use http_body_util::BodyExt;
use httpcache::cache::X_FROM_CACHE;
use httpcache::config::Config;
use httpcache::{storage, CachedClient, HyperTransport};
use std::path::PathBuf;
use std::sync::Arc;

/// httpcache - fetch URLs through a private HTTP cache
#[derive(Parser, Debug)]
#[command(name = "httpcache")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of times to fetch each URL
    #[arg(short, long, default_value_t = 1)]
    repeat: u32,

    /// URLs to fetch (plain http only)
    #[arg(required = true)]
    urls: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };
    config.validate().context("Invalid configuration")?;

    httpcache::logging::init_subscriber(&config.logging)
        .context("Failed to initialize logging subsystem")?;

    tracing::info!(
        backend = ?config.storage.backend,
        ttl_seconds = config.cache.ttl_seconds,
        urls = args.urls.len(),
        repeat = args.repeat,
        "Configuration loaded successfully"
    );

    let storage = storage::open(&config.storage).context("Failed to open storage backend")?;
    let client = CachedClient::new(Arc::new(HyperTransport::new()), storage)
        .with_options(config.cache_options());

    for round in 1..=args.repeat {
        for url in &args.urls {
            let request = Request::get(url.as_str())
                .body(Bytes::new())
                .with_context(|| format!("Invalid URL: {}", url))?;

            let response = client
                .execute(request)
                .await
                .with_context(|| format!("Request to {} failed", url))?;

            let status = response.status();
            let from_cache = response.headers().contains_key(X_FROM_CACHE);
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to read body of {}: {}", url, e))?
                .to_bytes();

            println!(
                "[{}] {} {} from_cache={} bytes={}",
                round,
                status.as_u16(),
                url,
                from_cache,
                body.len()
            );
        }
    }

    Ok(())
}
