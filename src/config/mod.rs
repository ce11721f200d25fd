//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "discuss";
const ENV_PREFIX: &str = "DISCUSS";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_CACHE_REPLY_THREAD_LIMIT: usize = 2_000;
const DEFAULT_CACHE_REF_TOPICS_LIMIT: usize = 500;
const DEFAULT_INDEX_QUEUE_CAPACITY: usize = 1_024;
const DEFAULT_INDEX_BULK_CHUNK_SIZE: usize = 10;
const DEFAULT_INDEX_BULK_DELAY_MS: u64 = 500;
const DEFAULT_SEARCH_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_FIRST_REPLIES: u32 = 10;
const DEFAULT_REF_TOPICS_PAGE_SIZE: u32 = 10;
const DEFAULT_REPLY_PAGE_SIZE: u32 = 20;

/// Command-line arguments for the discuss binary.
#[derive(Debug, Parser)]
#[command(name = "discuss", version, about = "Threaded discussion maintenance tool")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "DISCUSS_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Apply pending database migrations.
    Migrate,
    /// Resubmit every topic and reply to the search index.
    Reindex,
}

#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL", global = true)]
    pub database_url: Option<String>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the search engine endpoint.
    #[arg(long = "search-endpoint", value_name = "URL", global = true)]
    pub search_endpoint: Option<String>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub indexing: IndexingSettings,
    pub search: SearchSettings,
    pub discuss: DiscussSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub reply_thread_limit: usize,
    pub ref_topics_limit: usize,
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct IndexingSettings {
    pub queue_capacity: NonZeroUsize,
    pub bulk_chunk_size: NonZeroUsize,
    pub bulk_delay_ms: u64,
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Base URL of the search engine; `None` disables indexing calls.
    pub endpoint: Option<Url>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DiscussSettings {
    pub first_replies: NonZeroU32,
    pub ref_topics_page_size: NonZeroU32,
    pub reply_page_size: NonZeroU32,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
    indexing: RawIndexingSettings,
    search: RawSearchSettings,
    discuss: RawDiscussSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(endpoint) = overrides.search_endpoint.as_ref() {
            self.search.endpoint = Some(endpoint.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            database,
            cache,
            indexing,
            search,
            discuss,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cache: build_cache_settings(cache),
            indexing: build_indexing_settings(indexing)?,
            search: build_search_settings(search)?,
            discuss: build_discuss_settings(discuss)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = non_blank(database.url);
    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> CacheSettings {
    CacheSettings {
        reply_thread_limit: cache
            .reply_thread_limit
            .unwrap_or(DEFAULT_CACHE_REPLY_THREAD_LIMIT),
        ref_topics_limit: cache
            .ref_topics_limit
            .unwrap_or(DEFAULT_CACHE_REF_TOPICS_LIMIT),
        ttl_seconds: cache.ttl_seconds.unwrap_or(0),
    }
}

fn build_indexing_settings(indexing: RawIndexingSettings) -> Result<IndexingSettings, LoadError> {
    let queue_capacity = non_zero_usize(
        indexing
            .queue_capacity
            .unwrap_or(DEFAULT_INDEX_QUEUE_CAPACITY),
        "indexing.queue_capacity",
    )?;
    let bulk_chunk_size = non_zero_usize(
        indexing
            .bulk_chunk_size
            .unwrap_or(DEFAULT_INDEX_BULK_CHUNK_SIZE),
        "indexing.bulk_chunk_size",
    )?;

    Ok(IndexingSettings {
        queue_capacity,
        bulk_chunk_size,
        bulk_delay_ms: indexing.bulk_delay_ms.unwrap_or(DEFAULT_INDEX_BULK_DELAY_MS),
    })
}

fn build_search_settings(search: RawSearchSettings) -> Result<SearchSettings, LoadError> {
    let endpoint = match non_blank(search.endpoint) {
        Some(value) => {
            let url = Url::parse(&value).map_err(|err| {
                LoadError::invalid("search.endpoint", format!("invalid URL `{value}`: {err}"))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(LoadError::invalid(
                    "search.endpoint",
                    "scheme must be http or https",
                ));
            }
            Some(url)
        }
        None => None,
    };

    let timeout_ms = search.timeout_ms.unwrap_or(DEFAULT_SEARCH_TIMEOUT_MS);
    if timeout_ms == 0 {
        return Err(LoadError::invalid(
            "search.timeout_ms",
            "must be greater than zero",
        ));
    }

    Ok(SearchSettings {
        endpoint,
        timeout: Duration::from_millis(timeout_ms),
    })
}

fn build_discuss_settings(discuss: RawDiscussSettings) -> Result<DiscussSettings, LoadError> {
    Ok(DiscussSettings {
        first_replies: non_zero_u32(
            discuss.first_replies.unwrap_or(DEFAULT_FIRST_REPLIES).into(),
            "discuss.first_replies",
        )?,
        ref_topics_page_size: non_zero_u32(
            discuss
                .ref_topics_page_size
                .unwrap_or(DEFAULT_REF_TOPICS_PAGE_SIZE)
                .into(),
            "discuss.ref_topics_page_size",
        )?,
        reply_page_size: non_zero_u32(
            discuss
                .reply_page_size
                .unwrap_or(DEFAULT_REPLY_PAGE_SIZE)
                .into(),
            "discuss.reply_page_size",
        )?,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    reply_thread_limit: Option<usize>,
    ref_topics_limit: Option<usize>,
    ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawIndexingSettings {
    queue_capacity: Option<usize>,
    bulk_chunk_size: Option<usize>,
    bulk_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSearchSettings {
    endpoint: Option<String>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDiscussSettings {
    first_replies: Option<u32>,
    ref_topics_page_size: Option<u32>,
    reply_page_size: Option<u32>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_zero_usize(value: usize, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
