use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// OPDS catalog server for a directory of ebooks.
#[derive(Parser, Debug, Clone)]
#[command(name = "opds-shelf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file.
    #[arg(short, long, env = "OPDS_SHELF_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Server overrides used when no subcommand is given.
    #[command(flatten)]
    pub serve: ServeArgs,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the server (default if no command given).
    Serve(ServeArgs),

    /// Rescan the book directory now and store the result in the cache.
    Scan {
        /// Book directory to scan.
        #[arg(short, long, env = "BOOKS_DIR")]
        books: Option<PathBuf>,

        /// Cache directory shared with the server workers.
        #[arg(long, env = "CACHE_DIR")]
        cache_dir: Option<PathBuf>,
    },

    /// Cache maintenance commands.
    Cache {
        /// Cache subcommand action.
        #[command(subcommand)]
        action: CacheCommand,
    },

    /// Create a default config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
}

/// Overrides accepted by `serve`, each also readable from the environment.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Address to bind the server to.
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,

    /// Port to listen on, keeping the configured host.
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Book directory to serve.
    #[arg(long, env = "BOOKS_DIR")]
    pub books: Option<PathBuf>,

    /// Catalog title.
    #[arg(long, env = "SERVER_TITLE")]
    pub title: Option<String>,

    /// Seconds a scan result is served before the tree is walked again.
    #[arg(long, env = "SCAN_TTL")]
    pub ttl: Option<u64>,

    /// Cache directory shared by every worker.
    #[arg(long, env = "CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Cache subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum CacheCommand {
    /// Delete the whole cache directory.
    Clear {
        /// Cache directory to clear.
        #[arg(long, env = "CACHE_DIR")]
        cache_dir: Option<PathBuf>,
    },
}

/// Main configuration from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Book directory configuration.
    #[serde(default)]
    pub library: LibraryConfig,

    /// Scan configuration.
    #[serde(default)]
    pub scan: ScanConfig,

    /// Cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    /// Catalog title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Prefix for links in generated feeds. Empty means host-relative links.
    #[serde(default)]
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            title: default_title(),
            base_url: String::new(),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::new(
        std::net::IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0)),
        8080,
    )
}

fn default_title() -> String {
    "OPDS Library".to_string()
}

/// Book directory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Root of the book tree. Never written to.
    #[serde(default = "default_books_dir")]
    pub path: PathBuf,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            path: default_books_dir(),
        }
    }
}

fn default_books_dir() -> PathBuf {
    PathBuf::from("/books")
}

/// Scan configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Maximum age in seconds of a scan result before the tree is walked again.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
        }
    }
}

impl ScanConfig {
    /// Scan time-to-live as a duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

fn default_ttl_seconds() -> u64 {
    300
}

/// Cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding the scan slot and cover entries.
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("data/cache")
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &PathBuf) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to parse config file: {}", e))
        })
    }

    /// Find config file in default locations.
    pub fn find_config_file() -> Option<PathBuf> {
        let candidates = [
            PathBuf::from("config.toml"),
            PathBuf::from("opds-shelf.toml"),
            dirs::config_dir()
                .map(|p| p.join("opds-shelf").join("config.toml"))
                .unwrap_or_default(),
            PathBuf::from("/etc/opds-shelf/config.toml"),
        ];

        candidates.into_iter().find(|p| p.exists())
    }

    /// Apply `serve` overrides from the command line or environment.
    pub fn apply_overrides(&mut self, args: &ServeArgs) {
        if let Some(addr) = args.bind {
            self.server.bind = addr;
        }
        if let Some(port) = args.port {
            self.server.bind.set_port(port);
        }
        if let Some(ref books) = args.books {
            self.library.path = books.clone();
        }
        if let Some(ref title) = args.title {
            self.server.title = title.clone();
        }
        if let Some(ttl) = args.ttl {
            self.scan.ttl_seconds = ttl;
        }
        if let Some(ref dir) = args.cache_dir {
            self.cache.dir = dir.clone();
        }
    }

    /// Generate default config file content.
    pub fn generate_default() -> String {
        r#"# opds-shelf configuration

[server]
bind = "0.0.0.0:8080"
title = "OPDS Library"
# Prefix for feed links, e.g. "https://books.example.org". Empty = relative links.
base_url = ""

[library]
path = "/books"

[scan]
# Seconds a scan result is served before the book tree is walked again
ttl_seconds = 300

[cache]
# Shared by every worker process; deleting it is always safe
dir = "data/cache"
"#
        .to_string()
    }
}

/// Supported book formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookFormat {
    /// EPUB (zip container with OPF package metadata).
    Epub,
    /// Portable Document Format.
    Pdf,
    /// Mobipocket eBook.
    Mobi,
    /// Kindle AZW.
    Azw,
    /// Kindle KF8.
    Azw3,
    /// FictionBook.
    Fb2,
    /// Comic Book ZIP archive.
    Cbz,
    /// Comic Book RAR archive.
    Cbr,
}

impl BookFormat {
    /// Every supported format.
    pub const ALL: [BookFormat; 8] = [
        BookFormat::Epub,
        BookFormat::Pdf,
        BookFormat::Mobi,
        BookFormat::Azw,
        BookFormat::Azw3,
        BookFormat::Fb2,
        BookFormat::Cbz,
        BookFormat::Cbr,
    ];

    /// Get the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            BookFormat::Epub => "application/epub+zip",
            BookFormat::Pdf => "application/pdf",
            BookFormat::Mobi => "application/x-mobipocket-ebook",
            BookFormat::Azw | BookFormat::Azw3 => "application/vnd.amazon.ebook",
            BookFormat::Fb2 => "application/x-fictionbook+xml",
            BookFormat::Cbz => "application/vnd.comicbook+zip",
            BookFormat::Cbr => "application/vnd.comicbook-rar",
        }
    }

    /// Canonical lowercase file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            BookFormat::Epub => "epub",
            BookFormat::Pdf => "pdf",
            BookFormat::Mobi => "mobi",
            BookFormat::Azw => "azw",
            BookFormat::Azw3 => "azw3",
            BookFormat::Fb2 => "fb2",
            BookFormat::Cbz => "cbz",
            BookFormat::Cbr => "cbr",
        }
    }

    /// Try to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }

    /// Detect the format of a path from its extension.
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Whether books of this format may carry an extractable cover.
    ///
    /// Only zip containers with package metadata qualify; every other
    /// format resolves to "no cover" without the file being opened.
    pub fn has_embedded_cover(&self) -> bool {
        matches!(self, BookFormat::Epub)
    }
}
