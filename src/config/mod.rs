//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroUsize},
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::cache::{MAX_REGION_TTL, RegionTtlOverrides};

mod cli;

pub use cli::{CliArgs, Command, DatabaseOverride, MigrateArgs, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "manga-catalog";
const ENV_PREFIX: &str = "MANGA_CATALOG";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_ADMIN_HOST: &str = "127.0.0.1";
const DEFAULT_PUBLIC_PORT: u16 = 8080;
const DEFAULT_ADMIN_PORT: u16 = 8081;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 5;
pub(crate) const DEFAULT_CDN_CACHE_MAX_AGE_SECS: u64 = 2_592_000;
const DEFAULT_CACHE_MAX_ENTRIES_PER_REGION: usize = 1000;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cdn: CdnSettings,
    pub cache: CacheSettings,
    pub showcase: ShowcaseSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub public_addr: SocketAddr,
    pub admin_addr: SocketAddr,
    pub graceful_shutdown: Duration,
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
    pub acquire_timeout: Duration,
}

/// Content-delivery origin settings.
///
/// A missing or malformed `base_url` is not fatal: asset paths are then served relative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdnSettings {
    pub base_url: Option<String>,
    pub enabled: bool,
    pub fallback_url: Option<String>,
    /// Seconds clients and proxies may keep an asset.
    pub cache_max_age: u64,
}

impl Default for CdnSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            enabled: true,
            fallback_url: None,
            cache_max_age: DEFAULT_CDN_CACHE_MAX_AGE_SECS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub max_entries_per_region: NonZeroUsize,
    pub ttl_seconds: RegionTtlOverrides,
}

#[derive(Debug, Clone, Default)]
pub struct ShowcaseSettings {
    pub banners: Vec<BannerSettings>,
    pub avatars: AvatarSettings,
    pub announcements: Vec<AnnouncementSettings>,
}

/// Accepts snake_case keys from files and camelCase keys from inline JSON.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BannerSettings {
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default, alias = "mangaId")]
    pub manga_id: Option<i64>,
    #[serde(default, alias = "sortOrder")]
    pub sort_order: i32,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AvatarSettings {
    pub prefix: String,
    pub suffix: String,
    pub names: Vec<String>,
}

/// A front-page notice. `type` is free-form (`info`, `warning`, `error`, `success`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnnouncementSettings {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_announcement_type", rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default, alias = "sortOrder")]
    pub sort_order: i32,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

fn default_announcement_type() -> String {
    "info".to_string()
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

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Migrate(args)) => raw.apply_database_override(&args.database),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cdn: RawCdnSettings,
    cache: RawCacheSettings,
    showcase: RawShowcaseSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(host) = overrides.server_admin_host.as_ref() {
            self.server.admin_host = Some(host.clone());
        }
        if let Some(port) = overrides.public_port {
            self.server.public_port = Some(port);
        }
        if let Some(port) = overrides.admin_port {
            self.server.admin_port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(base) = overrides.cdn_base_url.as_ref() {
            self.cdn.base_url = Some(base.clone());
        }
        if let Some(enabled) = overrides.cdn_enabled {
            self.cdn.enabled = Some(enabled);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            cdn,
            cache,
            showcase,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cdn: build_cdn_settings(cdn),
            cache: build_cache_settings(cache)?,
            showcase: build_showcase_settings(showcase)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let admin_host = server
        .admin_host
        .unwrap_or_else(|| DEFAULT_ADMIN_HOST.to_string());
    let public_port = server.public_port.unwrap_or(DEFAULT_PUBLIC_PORT);
    if public_port == 0 {
        return Err(LoadError::invalid(
            "server.public_port",
            "port must be greater than zero",
        ));
    }
    let admin_port = server.admin_port.unwrap_or(DEFAULT_ADMIN_PORT);
    if admin_port == 0 {
        return Err(LoadError::invalid(
            "server.admin_port",
            "port must be greater than zero",
        ));
    }

    let public_addr = parse_socket_addr(&host, public_port)
        .map_err(|reason| LoadError::invalid("server.public_addr", reason))?;
    let admin_addr = parse_socket_addr(&admin_host, admin_port)
        .map_err(|reason| LoadError::invalid("server.admin_addr", reason))?;
    if public_addr == admin_addr {
        return Err(LoadError::invalid(
            "server.admin_port",
            "admin listener must not share the public address",
        ));
    }

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        public_addr,
        admin_addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
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
    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
        "database.max_connections",
    )?;
    let acquire_secs = database
        .acquire_timeout_seconds
        .unwrap_or(DEFAULT_DB_ACQUIRE_TIMEOUT_SECS);
    if acquire_secs == 0 {
        return Err(LoadError::invalid(
            "database.acquire_timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(DatabaseSettings {
        url: non_blank(database.url),
        max_connections,
        acquire_timeout: Duration::from_secs(acquire_secs),
    })
}

/// Origins are validated by the translator, which degrades to pass-through on bad input.
fn build_cdn_settings(cdn: RawCdnSettings) -> CdnSettings {
    CdnSettings {
        base_url: non_blank(cdn.base_url),
        enabled: cdn.enabled.unwrap_or(true),
        fallback_url: non_blank(cdn.fallback_url),
        cache_max_age: cdn.cache_max_age.unwrap_or(DEFAULT_CDN_CACHE_MAX_AGE_SECS),
    }
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let max_entries = cache
        .max_entries_per_region
        .unwrap_or(DEFAULT_CACHE_MAX_ENTRIES_PER_REGION);
    let max_entries_per_region = NonZeroUsize::new(max_entries).ok_or_else(|| {
        LoadError::invalid("cache.max_entries_per_region", "must be greater than zero")
    })?;

    let ttl = &cache.ttl_seconds;
    let overrides = [
        ("cache.ttl_seconds.manga_list", ttl.manga_list),
        ("cache.ttl_seconds.manga_detail", ttl.manga_detail),
        ("cache.ttl_seconds.manga_search", ttl.manga_search),
        ("cache.ttl_seconds.chapter_list", ttl.chapter_list),
        ("cache.ttl_seconds.recommended", ttl.recommended),
        ("cache.ttl_seconds.featured", ttl.featured),
        ("cache.ttl_seconds.tags", ttl.tags),
    ];
    let max_secs = MAX_REGION_TTL.as_secs();
    for (key, value) in overrides {
        match value {
            Some(0) => return Err(LoadError::invalid(key, "ttl must be greater than zero")),
            Some(secs) if secs > max_secs => {
                return Err(LoadError::invalid(
                    key,
                    format!("ttl must not exceed {max_secs} seconds"),
                ));
            }
            _ => {}
        }
    }

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        max_entries_per_region,
        ttl_seconds: cache.ttl_seconds,
    })
}

/// Inline JSON (`banners_json`, `avatars_json`, `announcements_json`) replaces the table form
/// when present.
fn build_showcase_settings(showcase: RawShowcaseSettings) -> Result<ShowcaseSettings, LoadError> {
    let banners = match non_blank(showcase.banners_json) {
        Some(json) => serde_json::from_str(&json)
            .map_err(|err| LoadError::invalid("showcase.banners_json", err.to_string()))?,
        None => showcase.banners,
    };
    let avatars = match non_blank(showcase.avatars_json) {
        Some(json) => serde_json::from_str(&json)
            .map_err(|err| LoadError::invalid("showcase.avatars_json", err.to_string()))?,
        None => showcase.avatars,
    };
    let announcements = match non_blank(showcase.announcements_json) {
        Some(json) => serde_json::from_str(&json)
            .map_err(|err| LoadError::invalid("showcase.announcements_json", err.to_string()))?,
        None => showcase.announcements,
    };
    Ok(ShowcaseSettings {
        banners,
        avatars,
        announcements,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    admin_host: Option<String>,
    public_port: Option<u16>,
    admin_port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
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
    acquire_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCdnSettings {
    base_url: Option<String>,
    enabled: Option<bool>,
    fallback_url: Option<String>,
    cache_max_age: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    max_entries_per_region: Option<usize>,
    ttl_seconds: RegionTtlOverrides,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawShowcaseSettings {
    banners: Vec<BannerSettings>,
    banners_json: Option<String>,
    avatars: AvatarSettings,
    avatars_json: Option<String>,
    announcements: Vec<AnnouncementSettings>,
    announcements_json: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u32, key: &'static str) -> Result<NonZeroU32, LoadError> {
    NonZeroU32::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}
