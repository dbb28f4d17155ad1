//! opds-shelf server entry point.

use clap::Parser;
use opds_shelf::{
    Library,
    config::{CacheCommand, Cli, Command, Config, ServeArgs},
    server,
};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "opds_shelf=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Find or load config
    let config_path = cli.config.clone().or_else(Config::find_config_file);

    let config = if let Some(ref path) = config_path {
        Config::load(path)?
    } else {
        Config::default()
    };

    match cli.command {
        Some(Command::Init { force }) => cmd_init(force),
        Some(Command::Scan { books, cache_dir }) => cmd_scan(config, books, cache_dir),
        Some(Command::Cache { action }) => cmd_cache(action, config),
        Some(Command::Serve(args)) => cmd_serve(config, args).await,
        None => cmd_serve(config, cli.serve).await,
    }
}

/// Write a default config file.
fn cmd_init(force: bool) -> anyhow::Result<()> {
    let config_path = PathBuf::from("config.toml");

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, Config::generate_default())?;
    println!("Created config file: {}", config_path.display());
    println!("\nEdit config.toml to point at your books, then run: opds-shelf serve");

    Ok(())
}

/// Scan the book root now and replace the cached result.
fn cmd_scan(
    mut config: Config,
    books: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    if let Some(books) = books {
        config.library.path = books;
    }
    if let Some(dir) = cache_dir {
        config.cache.dir = dir;
    }

    let library = Library::from_config(&config)?;
    let entry = library.rescan()?;

    if entry.books.is_empty() {
        println!("No books found in {}", library.root().display());
        return Ok(());
    }

    println!("{:<36} {:<6} {:>12}  PATH", "ID", "FORMAT", "SIZE");
    println!("{}", "-".repeat(80));
    for book in &entry.books {
        println!(
            "{:<36} {:<6} {:>12}  {}",
            book.id,
            book.format.extension(),
            book.size_bytes,
            book.relative_path
        );
    }
    println!("\n{} books cached at {}", entry.books.len(), entry.generated_at);

    Ok(())
}

/// Cache maintenance.
fn cmd_cache(action: CacheCommand, mut config: Config) -> anyhow::Result<()> {
    match action {
        CacheCommand::Clear { cache_dir } => {
            if let Some(dir) = cache_dir {
                config.cache.dir = dir;
            }

            let dir = &config.cache.dir;
            match std::fs::remove_dir_all(dir) {
                Ok(()) => println!("Cleared cache: {}", dir.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    println!("Cache already empty: {}", dir.display())
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}

/// Start the server.
async fn cmd_serve(mut config: Config, args: ServeArgs) -> anyhow::Result<()> {
    config.apply_overrides(&args);

    let state = server::AppState::from_config(config.clone())?;

    tracing::info!(
        bind = %config.server.bind,
        books = %state.library.root().display(),
        cache = %config.cache.dir.display(),
        ttl_seconds = config.scan.ttl_seconds,
        "Starting opds-shelf server"
    );

    let app = server::create_router(state);

    let listener = TcpListener::bind(config.server.bind).await?;
    tracing::info!(address = %config.server.bind, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
