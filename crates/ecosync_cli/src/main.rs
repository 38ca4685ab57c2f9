//! ecosync CLI - runs the incremental sync engine.

mod commands;
mod config;
#[cfg(feature = "github")]
mod shutdown;

use clap::{Parser, Subcommand};
use ecosync::RepoType;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ecosync")]
#[command(version)]
#[command(about = "Incremental sync of open-source ecosystem activity")]
#[command(
    long_about = "ecosync keeps a database of tracked repositories, their branches, commits, \
developers and contribution totals current with GitHub, fetching only what changed since \
the last pass, and maintains weekly aggregates over them."
)]
#[command(after_long_help = r#"EXAMPLES
    Track a repository:
        $ ecosync track rust-lang rust --type dependent

    Track every repository listed in the config file:
        $ ecosync track --from-config

    Run one pass:
        $ ecosync sync

    Poll until Ctrl+C:
        $ ecosync run

CONFIGURATION
    ecosync reads configuration from:
      1. ~/.config/ecosync/config.toml (or $XDG_CONFIG_HOME/ecosync/config.toml)
      2. ./ecosync.toml
      3. Environment variables (ECOSYNC_* prefix, e.g. ECOSYNC_SYNC__CONCURRENCY)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    ECOSYNC_DATABASE_URL      Database connection string (default: ~/.local/state/ecosync/ecosync.db)
    ECOSYNC_GITHUB_TOKEN      GitHub personal access token
    RUST_LOG                  Log filter (default: ecosync=info,ecosync_cli=info)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Add a repository to the tracked set, or reclassify it
    Track {
        /// Organization or user owning the repository
        #[arg(required_unless_present = "from_config")]
        organization: Option<String>,

        /// Repository name
        #[arg(required_unless_present = "from_config")]
        name: Option<String>,

        /// Why the repository is tracked
        #[arg(short, long = "type", default_value_t = RepoType::Whitelisted)]
        repo_type: RepoType,

        /// Ecosystem dependency (repeatable)
        #[arg(short, long = "dependency")]
        dependencies: Vec<String>,

        /// Track every [[repositories]] entry from the config file
        #[arg(long, conflicts_with_all = ["organization", "name"])]
        from_config: bool,
    },
    /// Run a single sync pass and print its report
    #[cfg(feature = "github")]
    Sync,
    /// Run sync passes until interrupted
    #[cfg(feature = "github")]
    Run,
    /// Recompute derived aggregates (all when none are named)
    Refresh {
        /// View names, e.g. weekly_commit_totals
        views: Vec<String>,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("ecosync=info,ecosync_cli=info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    // Load configuration (config file -> env vars -> defaults)
    let config = config::Config::load()?;

    let database_url = config
        .database_url()
        .ok_or("Could not determine a database URL; set database.url or ECOSYNC_DATABASE_URL")?;

    // Ensure the database directory exists for SQLite
    if database_url.starts_with("sqlite://") {
        let db_path = database_url.trim_start_matches("sqlite://");
        // Strip query parameters (e.g., ?mode=rwc) before path operations
        let db_path = db_path.split('?').next().unwrap_or(db_path);
        let db_path = std::path::Path::new(db_path);

        if db_path.is_relative() && !db_path.as_os_str().is_empty() {
            tracing::warn!(
                "Database path '{}' is relative - behavior depends on current directory. \
                 Consider using an absolute path.",
                db_path.display()
            );
        }

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
    }

    match cli.command {
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url).await?;
        }
        Commands::Track {
            organization,
            name,
            repo_type,
            dependencies,
            from_config,
        } => {
            let target = organization.zip(name);
            commands::track::handle_track(
                target,
                repo_type,
                dependencies,
                from_config,
                &config,
                &database_url,
            )
            .await?;
        }
        #[cfg(feature = "github")]
        Commands::Sync => {
            let shutdown = shutdown::setup_shutdown_handler();
            commands::sync::handle_sync(&config, &database_url, shutdown).await?;
        }
        #[cfg(feature = "github")]
        Commands::Run => {
            let shutdown = shutdown::setup_shutdown_handler();
            commands::sync::handle_run(&config, &database_url, shutdown).await?;
        }
        Commands::Refresh { views } => {
            commands::refresh::handle_refresh(views, &database_url).await?;
        }
    }

    Ok(())
}
