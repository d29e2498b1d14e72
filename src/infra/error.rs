//! Startup failures of the process-level adapters.

use std::net::SocketAddr;

use thiserror::Error;
use tracing_subscriber::util::TryInitError;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("database url is not configured")]
    MissingDatabaseUrl,
    #[error("failed to connect to the database: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("failed to apply migrations: {0}")]
    Migrate(#[source] sqlx::Error),
    #[error("failed to build the {client} http client: {source}")]
    HttpClient {
        client: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to install tracing subscriber: {0}")]
    Telemetry(#[from] TryInitError),
}

impl InfraError {
    pub fn http_client(client: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| Self::HttpClient { client, source }
    }
}
