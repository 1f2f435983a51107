use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use communify_core::config::{Config, DirectoryBackend};
use communify_core::core_community::{
    CommunityDirectory, JoinService, MemoryDirectory, SqliteDirectory,
};
use communify_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use communify_core::metrics::init_metrics;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "communify")]
#[command(author, version, about = "Communify community membership", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    /// SQLite database path (overrides config)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert demo communities, or those in a JSON file
    Seed {
        /// JSON array of communities
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Create a community
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        created_by: String,

        /// Browsable by everyone, no invitation code
        #[arg(long)]
        open: bool,

        /// Invitation code to use instead of a generated one
        #[arg(long)]
        code: Option<String>,
    },

    /// Join a closed community with its invitation code
    Join {
        #[arg(long)]
        user: String,

        code: String,
    },

    /// List the newest open communities
    Open {
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List the closed communities a user created or joined
    Mine {
        #[arg(long)]
        user: String,
    },
}

/// Defaults, then the config file, then COMMUNIFY_* variables, then flags
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::parse_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    config.apply_overrides(|key| std::env::var(key).ok())?;

    if let Some(level) = &args.log_level {
        config.logging.level = level.to_lowercase();
    }
    if args.json_logs {
        config.logging.json_format = true;
    }
    if let Some(path) = &args.database {
        config.directory.backend = DirectoryBackend::Sqlite;
        config.directory.database_path = path.clone();
    }

    config.validate()?;
    Ok(config)
}

fn open_directory(config: &Config) -> Result<Arc<dyn CommunityDirectory>> {
    match config.directory.backend {
        DirectoryBackend::Memory => Ok(Arc::new(MemoryDirectory::new())),
        DirectoryBackend::Sqlite => {
            let raw = config.directory.database_path.to_string_lossy();
            let path = PathBuf::from(shellexpand::tilde(&raw).into_owned());
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }

            debug!(path = %path.display(), "Opening SQLite directory");
            let directory = SqliteDirectory::open(
                &path,
                config.directory.pool_size,
                config.directory.busy_timeout,
            )?;
            Ok(Arc::new(directory))
        }
    }
}

async fn run(command: Command, config: &Config, directory: Arc<dyn CommunityDirectory>) -> Result<()> {
    let mut out = std::io::stdout();

    match command {
        Command::Seed { file } => commands::seed(directory.as_ref(), file.as_deref(), &mut out).await,
        Command::Create {
            name,
            created_by,
            open,
            code,
        } => commands::create(directory.as_ref(), name, created_by, open, code, &mut out).await,
        Command::Join { user, code } => {
            let service = JoinService::with_max_attempts(directory, config.join.max_attempts);
            commands::join(&service, user, &code, &mut out).await
        }
        Command::Open { limit } => {
            let limit = limit.unwrap_or(config.dashboard.open_preview_limit);
            commands::open(directory.as_ref(), limit, &mut out).await
        }
        Command::Mine { user } => commands::mine(directory.as_ref(), user, &mut out).await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    // validate() has already rejected unknown levels
    let log_level = LogLevel::from_str(&config.logging.level).unwrap_or_default();
    let log_config = LogConfig::new(log_level)
        .with_target(config.logging.with_target)
        .json_format(config.logging.json_format);
    init_logging_with_config(log_config)?;
    init_metrics();

    info!(backend = ?config.directory.backend, "Communify CLI started");

    let directory = open_directory(&config)?;
    run(args.command, &config, directory).await
}
