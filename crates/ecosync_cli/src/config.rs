//! Configuration file support for ecosync.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (`ECOSYNC_` prefix, `__` between nested keys,
//!    e.g. `ECOSYNC_SYNC__CONCURRENCY`; `ECOSYNC_GITHUB_TOKEN` and
//!    `ECOSYNC_DATABASE_URL` are also accepted)
//! 3. Config file (`./ecosync.toml`, then `~/.config/ecosync/config.toml`)
//! 4. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "sqlite:///var/lib/ecosync/ecosync.db?mode=rwc"  # optional
//!
//! [github]
//! token = "ghp_..."
//! api_url = "https://api.github.com"
//!
//! [sync]
//! interval_secs = 3600
//! concurrency = 4
//! requests_per_second = 10
//! page_size = 100
//! repo_timeout_secs = 600
//! refresh = "per-pass"
//!
//! [[repositories]]
//! organization = "eco"
//! name = "core"
//! repo_type = "whitelisted"
//! dependencies = []
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, ConfigError, Environment, File, FileFormat};
use directories::ProjectDirs;
use ecosync::TrackRequest;
use ecosync::platform::{DEFAULT_PAGE_SIZE, rate_limits};
use ecosync::sync::{
    DEFAULT_CONCURRENCY, DEFAULT_INTERVAL, DEFAULT_REPO_TIMEOUT, RefreshPolicy, SyncOptions,
};
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub github: GitHubConfig,
    pub sync: SyncConfig,
    /// Seed list for `track --from-config`.
    pub repositories: Vec<TrackRequest>,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL (`sqlite://` or `postgres://`). Defaults to a SQLite
    /// file in the XDG state directory.
    pub url: Option<String>,
}

/// GitHub configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub token: Option<String>,
    /// REST API base URL, for GitHub Enterprise.
    pub api_url: Option<String>,
}

/// Sync loop settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Pause between passes.
    pub interval_secs: u64,
    /// Repositories synced concurrently.
    pub concurrency: usize,
    /// Global upstream request budget.
    pub requests_per_second: u32,
    pub page_size: u32,
    /// Soft timeout for one repository's activity fetch.
    pub repo_timeout_secs: u64,
    pub refresh: RefreshPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL.as_secs(),
            concurrency: DEFAULT_CONCURRENCY,
            requests_per_second: rate_limits::GITHUB_DEFAULT_RPS,
            page_size: DEFAULT_PAGE_SIZE,
            repo_timeout_secs: DEFAULT_REPO_TIMEOUT.as_secs(),
            refresh: RefreshPolicy::default(),
        }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    /// Engine options built from these settings.
    pub fn options(&self) -> SyncOptions {
        SyncOptions {
            concurrency: self.concurrency.max(1),
            page_size: self.page_size.clamp(1, 100),
            repo_timeout: Duration::from_secs(self.repo_timeout_secs.max(1)),
            refresh: self.refresh,
            ..SyncOptions::default()
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (`~/.config/ecosync/config.toml`)
    /// 3. Local config file (`./ecosync.toml`)
    /// 4. Environment variables with the `ECOSYNC_` prefix
    ///
    /// A malformed file is a startup error rather than a silent fallback.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("ecosync.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./ecosync.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // e.g. ECOSYNC_SYNC__REPO_TIMEOUT_SECS -> sync.repo_timeout_secs
        builder = builder.add_source(
            Environment::with_prefix("ECOSYNC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // Flat names for the two settings most often set from the environment.
        builder = builder
            .set_override_option("github.token", env::var("ECOSYNC_GITHUB_TOKEN").ok())?
            .set_override_option("database.url", env::var("ECOSYNC_DATABASE_URL").ok())?;

        builder.build()?.try_deserialize()
    }

    /// The database URL, falling back to `ecosync.db` in the state directory.
    ///
    /// The `mode=rwc` parameter creates the SQLite file if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("ecosync.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    /// The GitHub token, ignoring blank values.
    pub fn github_token(&self) -> Option<String> {
        self.github
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
    }

    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "ecosync").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// The default state directory.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/ecosync` or `~/.local/state/ecosync`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "ecosync").map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecosync::RepoType;

    fn parse(toml_content: &str) -> Config {
        ConfigBuilder::builder()
            .add_source(config::File::from_str(toml_content, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.database.url.is_none());
        assert!(config.github.token.is_none());
        assert_eq!(config.sync.interval_secs, 3600);
        assert_eq!(config.sync.concurrency, 4);
        assert_eq!(config.sync.requests_per_second, 10);
        assert_eq!(config.sync.page_size, 100);
        assert_eq!(config.sync.repo_timeout_secs, 600);
        assert_eq!(config.sync.refresh, RefreshPolicy::PerPass);
        assert!(config.repositories.is_empty());
    }

    #[test]
    fn test_config_builder_with_toml_string() {
        let config = parse(
            r#"
            [database]
            url = "sqlite:///tmp/test.db"

            [github]
            token = "ghp_test123"

            [sync]
            interval_secs = 60
            concurrency = 8
            refresh = "per-repository"

            [[repositories]]
            organization = "eco"
            name = "core"

            [[repositories]]
            organization = "eco"
            name = "core-fork"
            repo_type = "whitelisted-fork"
            dependencies = ["eco/core"]
            "#,
        );

        assert_eq!(config.database.url.as_deref(), Some("sqlite:///tmp/test.db"));
        assert_eq!(config.github_token().as_deref(), Some("ghp_test123"));
        assert_eq!(config.sync.interval(), Duration::from_secs(60));
        assert_eq!(config.sync.concurrency, 8);
        assert_eq!(config.sync.refresh, RefreshPolicy::PerRepository);
        assert_eq!(config.sync.page_size, 100, "unset keys keep defaults");

        assert_eq!(config.repositories.len(), 2);
        assert_eq!(config.repositories[0].repo_type, RepoType::Whitelisted);
        assert_eq!(config.repositories[1].repo_type, RepoType::WhitelistedFork);
        assert_eq!(config.repositories[1].dependencies, vec!["eco/core"]);
    }

    #[test]
    fn test_sync_options_are_clamped() {
        let config = parse(
            r#"
            [sync]
            concurrency = 0
            page_size = 500
            repo_timeout_secs = 30
            "#,
        );

        let options = config.sync.options();
        assert_eq!(options.concurrency, 1);
        assert_eq!(options.page_size, 100);
        assert_eq!(options.repo_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_blank_token_is_missing() {
        let config = parse(
            r#"
            [github]
            token = "   "
            "#,
        );
        assert!(config.github_token().is_none());
    }

    #[test]
    fn test_database_url_defaults_to_state_dir() {
        let config = Config::default();
        if let Some(url) = config.database_url() {
            assert!(url.starts_with("sqlite://"));
            assert!(url.ends_with("ecosync.db?mode=rwc"));
        }
    }
}
