use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the lumblog binary.
#[derive(Debug, Parser)]
#[command(name = "lumblog", version, about = "Lumblog content and newsletter server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "LUMBLOG_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service.
    Serve(Box<ServeArgs>),
    /// Apply pending database migrations and exit.
    Migrate(MigrateArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the public base URL used in links and the sitemap.
    #[arg(long = "site-base-url", value_name = "URL")]
    pub site_base_url: Option<String>,

    /// Override the site name shown in emails.
    #[arg(long = "site-name", value_name = "NAME")]
    pub site_name: Option<String>,

    /// Override the admin key accepted by the admin session endpoint.
    #[arg(long = "admin-api-key", env = "ADMIN_API_KEY", value_name = "KEY", hide_env_values = true)]
    pub admin_api_key: Option<String>,

    /// Override the platform identity endpoint consulted for admin requests.
    #[arg(long = "admin-platform-auth-url", value_name = "URL")]
    pub admin_platform_auth_url: Option<String>,

    /// Override the mail provider API key.
    #[arg(long = "email-api-key", value_name = "KEY", hide_env_values = true)]
    pub email_api_key: Option<String>,

    /// Override the sender address for outgoing mail.
    #[arg(long = "email-from", value_name = "ADDRESS")]
    pub email_from: Option<String>,

    /// Override the unsubscribe token lifetime.
    #[arg(long = "subscriptions-token-ttl-days", value_name = "DAYS")]
    pub subscriptions_token_ttl_days: Option<u32>,
}
