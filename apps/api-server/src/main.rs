use anyhow::{anyhow, bail, Context, Result};
use axum::Router;
use catalog::{Catalog, CatalogConfig};
use clap::{Parser, Subcommand};
use modkit::HttpConfig;
use runtime::{AppConfig, CliArgs, StoreConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Expand a sqlite URL into an absolute-path URL using a base directory.
/// - Keeps "sqlite::memory:" as-is.
/// - Normalizes backslashes into forward slashes (important on Windows).
fn absolutize_sqlite_url(url: &str, base_dir: &Path, create_dirs: bool) -> Result<String> {
    if url.eq_ignore_ascii_case("sqlite::memory:") || url.eq_ignore_ascii_case("sqlite://:memory:")
    {
        return Ok("sqlite::memory:".to_string());
    }
    let db_path = url
        .strip_prefix("sqlite://")
        .ok_or_else(|| anyhow!("store URL must start with sqlite:// (got: {})", url))?;

    let (path_str, query) = match db_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (db_path, None),
    };

    let mut p = PathBuf::from(path_str);
    if p.as_os_str().is_empty() {
        return Err(anyhow!("Empty SQLite path in store URL"));
    }
    if p.is_relative() {
        p = base_dir.join(p);
    }

    if let Some(dir) = p.parent() {
        if create_dirs {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create directory {}", dir.display()))?;
        }
    }

    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    Ok(out)
}

/// Detect the store backend from the URL scheme.
fn detect_backend(cfg: &StoreConfig) -> Result<&'static str> {
    let raw = cfg.url.trim();
    if raw.is_empty() {
        bail!("Store URL not configured");
    }

    let url = Url::parse(raw).map_err(|e| anyhow!("Invalid store URL '{}': {}", raw, e))?;

    match url.scheme() {
        "memory" => Ok("memory"),
        "sqlite" => Ok("sqlite"),
        other => Err(anyhow!("Unsupported store type: {}", other)),
    }
}

fn http_config(config: &AppConfig) -> HttpConfig {
    let timeout = match config.server.timeout_sec {
        0 => DEFAULT_TIMEOUT,
        secs => Duration::from_secs(secs),
    };
    HttpConfig {
        timeout,
        body_limit_bytes: config.server.body_limit_bytes,
        ..HttpConfig::default()
    }
}

/// Catalog API Server - paginated CRUD over products, categories and tags
#[derive(Parser)]
#[command(name = "api-server")]
#[command(about = "Catalog API Server - paginated CRUD over products, categories and tags")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use the in-memory store
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    if let Some(path) = cli.config.as_deref() {
        if !path.is_file() {
            bail!("config file not found: {}", path.display());
        }
    }

    // home_dir is normalized and created while loading
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("Catalog API server starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config, args).await,
        Commands::Check => check_config(config, args).await,
    }
}

async fn run_server(config: AppConfig, args: CliArgs) -> Result<()> {
    let store_cfg = config.effective_store(&args);
    let backend = detect_backend(&store_cfg)?;

    let mut url = store_cfg.url.trim().to_owned();
    if backend == "sqlite" {
        url = absolutize_sqlite_url(&url, Path::new(&config.server.home_dir), true)?;
    }
    tracing::info!(backend, "Connecting to document store: {}", url);
    let store = docstore::connect(&url)
        .await
        .with_context(|| format!("failed to open store '{url}'"))?;

    tracing::info!("Initializing modules...");
    let catalog_cfg: CatalogConfig = config.module_config("catalog")?;
    let catalog = Catalog::with_logging_events(store, &catalog_cfg);

    let router = catalog.register_rest(Router::new());
    let router = modkit::with_middleware(router, &http_config(&config));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind address {addr}"))?;

    modkit::serve(listener, router, async {
        if let Err(e) = modkit::wait_for_shutdown().await {
            tracing::warn!(error = %e, "signal handling failed; shutting down");
        }
    })
    .await
}

async fn check_config(config: AppConfig, args: CliArgs) -> Result<()> {
    tracing::info!("Checking configuration...");

    let store_cfg = config.effective_store(&args);
    let backend = detect_backend(&store_cfg)?;
    if backend == "sqlite" {
        absolutize_sqlite_url(store_cfg.url.trim(), Path::new(&config.server.home_dir), false)?;
    }
    let catalog_cfg: CatalogConfig = config.module_config("catalog")?;
    if catalog_cfg.default_page_size > catalog_cfg.max_page_size {
        tracing::warn!(
            default_page_size = catalog_cfg.default_page_size,
            max_page_size = catalog_cfg.max_page_size,
            "default page size exceeds the maximum and will be capped"
        );
    }

    tracing::info!(backend, "Configuration is valid");
    println!("Configuration check passed");
    println!("Server config:");
    println!("{}", config.to_yaml()?);

    Ok(())
}
