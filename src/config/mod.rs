//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

pub use cli::{CliArgs, Command, DatabaseOverride, MigrateArgs, ServeArgs, ServeOverrides};

use std::{net::SocketAddr, num::NonZeroU32, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::domain::subscriptions::DEFAULT_TOKEN_TTL_DAYS;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "lumblog";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_SITE_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_SITE_NAME: &str = "Lum Tools Blog";
const DEFAULT_ADMIN_SESSION_MAX_AGE_SECS: u64 = 12 * 60 * 60;
const DEFAULT_ADMIN_PLATFORM_TIMEOUT_SECS: u64 = 5;
const DEFAULT_EMAIL_API_URL: &str = "https://api.resend.com/emails";
const DEFAULT_EMAIL_FROM: &str = "Blog <noreply@lum.tools>";
const DEFAULT_EMAIL_TIMEOUT_SECS: u64 = 10;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub site: SiteSettings,
    pub admin: AdminSettings,
    pub email: EmailSettings,
    pub subscriptions: SubscriptionSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
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
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    /// Public origin without a trailing slash.
    pub base_url: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct AdminSettings {
    pub api_key: Option<String>,
    pub platform_auth_url: Option<Url>,
    pub platform_auth_timeout: Duration,
    pub session_max_age: Duration,
}

#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub api_url: Url,
    /// Without a key outgoing mail is only logged.
    pub api_key: Option<String>,
    pub from: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SubscriptionSettings {
    pub token_ttl_days: NonZeroU32,
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

    builder = builder.add_source(Environment::with_prefix("LUMBLOG").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Migrate(args)) => raw.apply_database_override(&args.database),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    site: RawSiteSettings,
    admin: RawAdminSettings,
    email: RawEmailSettings,
    subscriptions: RawSubscriptionSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(url) = overrides.site_base_url.as_ref() {
            self.site.base_url = Some(url.clone());
        }
        if let Some(name) = overrides.site_name.as_ref() {
            self.site.name = Some(name.clone());
        }
        if let Some(key) = overrides.admin_api_key.as_ref() {
            self.admin.api_key = Some(key.clone());
        }
        if let Some(url) = overrides.admin_platform_auth_url.as_ref() {
            self.admin.platform_auth_url = Some(url.clone());
        }
        if let Some(key) = overrides.email_api_key.as_ref() {
            self.email.api_key = Some(key.clone());
        }
        if let Some(from) = overrides.email_from.as_ref() {
            self.email.from = Some(from.clone());
        }
        if let Some(days) = overrides.subscriptions_token_ttl_days {
            self.subscriptions.token_ttl_days = Some(days);
        }

        self.apply_database_override(&overrides.database);
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
            site,
            admin,
            email,
            subscriptions,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            site: build_site_settings(site)?,
            admin: build_admin_settings(admin)?,
            email: build_email_settings(email)?,
            subscriptions: build_subscription_settings(subscriptions)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr =
        parse_socket_addr(&host, port).map_err(|reason| LoadError::invalid("server.addr", reason))?;

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
        addr,
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

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let raw_url = non_blank(site.base_url).unwrap_or_else(|| DEFAULT_SITE_BASE_URL.to_string());
    parse_url(&raw_url, "site.base_url")?;
    let base_url = raw_url.trim_end_matches('/').to_string();

    let name = non_blank(site.name).unwrap_or_else(|| DEFAULT_SITE_NAME.to_string());

    Ok(SiteSettings { base_url, name })
}

fn build_admin_settings(admin: RawAdminSettings) -> Result<AdminSettings, LoadError> {
    let platform_auth_url = non_blank(admin.platform_auth_url)
        .map(|value| parse_url(&value, "admin.platform_auth_url"))
        .transpose()?;

    let max_age_secs = admin
        .session_max_age_seconds
        .unwrap_or(DEFAULT_ADMIN_SESSION_MAX_AGE_SECS);
    if max_age_secs == 0 {
        return Err(LoadError::invalid(
            "admin.session_max_age_seconds",
            "must be greater than zero",
        ));
    }

    let timeout_secs = admin
        .platform_auth_timeout_seconds
        .unwrap_or(DEFAULT_ADMIN_PLATFORM_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "admin.platform_auth_timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(AdminSettings {
        api_key: non_blank(admin.api_key),
        platform_auth_url,
        platform_auth_timeout: Duration::from_secs(timeout_secs),
        session_max_age: Duration::from_secs(max_age_secs),
    })
}

fn build_email_settings(email: RawEmailSettings) -> Result<EmailSettings, LoadError> {
    let api_url = parse_url(
        &non_blank(email.api_url).unwrap_or_else(|| DEFAULT_EMAIL_API_URL.to_string()),
        "email.api_url",
    )?;

    let timeout_secs = email.timeout_seconds.unwrap_or(DEFAULT_EMAIL_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "email.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(EmailSettings {
        api_url,
        api_key: non_blank(email.api_key),
        from: non_blank(email.from).unwrap_or_else(|| DEFAULT_EMAIL_FROM.to_string()),
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_subscription_settings(
    subscriptions: RawSubscriptionSettings,
) -> Result<SubscriptionSettings, LoadError> {
    let days = subscriptions
        .token_ttl_days
        .unwrap_or(DEFAULT_TOKEN_TTL_DAYS);

    Ok(SubscriptionSettings {
        token_ttl_days: non_zero_u32(days.into(), "subscriptions.token_ttl_days")?,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
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
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    base_url: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAdminSettings {
    api_key: Option<String>,
    platform_auth_url: Option<String>,
    platform_auth_timeout_seconds: Option<u64>,
    session_max_age_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawEmailSettings {
    api_url: Option<String>,
    api_key: Option<String>,
    from: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSubscriptionSettings {
    token_ttl_days: Option<u32>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn parse_url(value: &str, key: &'static str) -> Result<Url, LoadError> {
    let url = Url::parse(value)
        .map_err(|err| LoadError::invalid(key, format!("invalid URL `{value}`: {err}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(LoadError::invalid(
            key,
            format!("unsupported scheme `{other}`"),
        )),
    }
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

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
