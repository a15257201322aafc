use anyhow::{bail, Context};
use ax_snapshot::{Config, SnapshotError, SnapshotService};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Accessibility-tree snapshots of web pages, for language models.
#[derive(Parser)]
#[command(name = "ax-snapshot", version)]
struct Cli {
    #[command(flatten)]
    browser: BrowserArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct BrowserArgs {
    /// Maximum number of pages open at once
    #[arg(long, global = true, env = "SNAPSHOT_POOL_SIZE")]
    pool_size: Option<usize>,

    /// Overall per-request deadline in seconds
    #[arg(long, global = true, env = "SNAPSHOT_REQUEST_TIMEOUT_SECS")]
    timeout: Option<u64>,

    /// Show the browser window
    #[arg(long, global = true)]
    headed: bool,

    /// Chrome or Chromium binary to launch
    #[arg(long, global = true, env = "CHROME_PATH")]
    chrome_path: Option<PathBuf>,

    /// Comma-separated hosts whose snapshots are cached
    #[arg(long, global = true, value_delimiter = ',')]
    hot_urls: Option<Vec<String>>,
}

#[derive(Subcommand)]
enum Command {
    /// Snapshot one or more URLs and print one JSON object per line
    Snapshot {
        #[arg(required = true)]
        urls: Vec<String>,

        /// Skip the cache for lookups and storage
        #[arg(long)]
        no_cache: bool,
    },
    /// Match a prompt against snapshot text read from a file or stdin
    Match {
        /// Snapshot file, or `-` for stdin
        #[arg(long)]
        file: PathBuf,

        #[arg(long)]
        prompt: String,

        /// Matches to print; the total is always reported
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Pre-seed the cache with every hot URL
    Warm,
    /// Check that a browser can be launched
    Probe,
}

impl BrowserArgs {
    fn into_config(self) -> anyhow::Result<Config> {
        let mut config = Config::from_env()?;
        if let Some(pool_size) = self.pool_size {
            config.session.pool_size = pool_size;
        }
        if let Some(secs) = self.timeout {
            config.session.request_timeout_ms = secs.saturating_mul(1000);
        }
        if self.headed {
            config.browser.headless = false;
        }
        if self.chrome_path.is_some() {
            config.browser.chrome_path = self.chrome_path;
        }
        if let Some(hot_urls) = self.hot_urls {
            config.cache.hot_urls = hot_urls;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Command::Match {
        file,
        prompt,
        limit,
    } = &cli.command
    {
        let snapshot = read_snapshot(file)?;
        let result = ax_snapshot::match_prompt(&snapshot, prompt).limited(*limit);
        println!("{}", serde_json::to_string(&result)?);
        return Ok(());
    }

    let config = cli.browser.into_config()?;
    let service = Arc::new(SnapshotService::with_chrome(&config)?);

    if let Err(e) = service.probe().await {
        error!("cannot start: {}", e);
        return Err(e.into());
    }
    if config.cache.prewarm {
        Arc::clone(&service).warm_hot_urls().await;
    }

    let outcome = match cli.command {
        Command::Snapshot { urls, no_cache } => snapshot_all(&service, urls, !no_cache).await,
        Command::Warm => {
            let warmed = Arc::clone(&service).warm_hot_urls().await;
            println!("{}", json!({ "warmed": warmed, "cached": service.cache().len() }));
            Ok(())
        }
        Command::Probe => {
            println!("{}", json!({ "ok": true }));
            Ok(())
        }
        Command::Match { .. } => Ok(()),
    };

    service.shutdown().await;
    outcome
}

/// Run every URL concurrently and print results in input order.
async fn snapshot_all(
    service: &Arc<SnapshotService<ax_snapshot::ChromeEngine>>,
    urls: Vec<String>,
    use_cache: bool,
) -> anyhow::Result<()> {
    let handles: Vec<_> = urls
        .into_iter()
        .map(|url| {
            let service = Arc::clone(service);
            tokio::spawn(async move { service.generate_snapshot(&url, use_cache).await })
        })
        .collect();

    let total = handles.len();
    let mut failed = 0;
    for handle in handles {
        match handle.await? {
            Ok(result) => println!("{}", serde_json::to_string(&result)?),
            Err(e) => {
                failed += 1;
                println!("{}", error_json(&e));
                if e.is_fatal() {
                    return Err(e.into());
                }
            }
        }
    }

    info!(total, failed, "done");
    if failed > 0 {
        bail!("{failed} of {total} snapshots failed");
    }
    Ok(())
}

fn error_json(err: &SnapshotError) -> serde_json::Value {
    json!({ "error": { "kind": err.kind(), "message": err.to_string() } })
}

/// Accepts raw snapshot text or the JSON line printed by `snapshot`.
fn read_snapshot(path: &Path) -> anyhow::Result<String> {
    let raw = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading snapshot from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("reading snapshot from {}", path.display()))?
    };

    if let Ok(serde_json::Value::Object(fields)) = serde_json::from_str(raw.trim()) {
        if let Some(text) = fields.get("snapshot").and_then(|v| v.as_str()) {
            return Ok(text.to_string());
        }
    }
    Ok(raw)
}
