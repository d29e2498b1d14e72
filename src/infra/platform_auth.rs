use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url, header};

use crate::application::auth::{IdentityDelegate, IdentityError};

use super::error::InfraError;

/// Asks the hosting platform whether the forwarded cookies belong to a
/// signed-in user. Any 2xx answer counts as authenticated.
#[derive(Clone)]
pub struct PlatformIdentity {
    client: Client,
    endpoint: Url,
}

impl PlatformIdentity {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(concat!("lumblog/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(InfraError::http_client("identity"))?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl IdentityDelegate for PlatformIdentity {
    async fn is_authenticated(&self, cookie_header: &str) -> Result<bool, IdentityError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .header(header::COOKIE, cookie_header)
            .send()
            .await
            .map_err(|err| IdentityError(err.to_string()))?;

        Ok(response.status().is_success())
    }
}
