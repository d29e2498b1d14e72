//! Admin authorization.
//!
//! A request is an admin request when the platform identity service vouches
//! for its cookies, or when its `admin_key` cookie matches the configured
//! admin key.

use std::sync::Arc;

use async_trait::async_trait;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, warn};

pub const ADMIN_COOKIE_NAME: &str = "admin_key";

#[derive(Debug, Error)]
#[error("identity check failed: {0}")]
pub struct IdentityError(pub String);

/// Remote identity check that receives the caller's forwarded cookies.
#[async_trait]
pub trait IdentityDelegate: Send + Sync {
    async fn is_authenticated(&self, cookie_header: &str) -> Result<bool, IdentityError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminPrincipal {
    Platform,
    AdminKey,
}

impl AdminPrincipal {
    pub fn actor(self) -> &'static str {
        match self {
            AdminPrincipal::Platform => "platform",
            AdminPrincipal::AdminKey => "admin_key",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AdminCredentials<'a> {
    pub cookie_header: Option<&'a str>,
    pub admin_key_cookie: Option<&'a str>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Admin key not configured")]
    NotConfigured,
    #[error("Invalid admin key")]
    InvalidKey,
}

#[derive(Clone)]
pub struct AdminGate {
    admin_key: Option<String>,
    delegate: Option<Arc<dyn IdentityDelegate>>,
}

impl AdminGate {
    pub fn new(admin_key: Option<String>, delegate: Option<Arc<dyn IdentityDelegate>>) -> Self {
        Self {
            admin_key: admin_key.filter(|key| !key.is_empty()),
            delegate,
        }
    }

    /// The delegate is consulted first; its errors fall through to the
    /// cookie comparison.
    pub async fn authorize(&self, credentials: AdminCredentials<'_>) -> Option<AdminPrincipal> {
        if let Some(delegate) = &self.delegate {
            match delegate
                .is_authenticated(credentials.cookie_header.unwrap_or_default())
                .await
            {
                Ok(true) => return Some(AdminPrincipal::Platform),
                Ok(false) => debug!(
                    target = "lumblog::application::auth",
                    "platform identity rejected request"
                ),
                Err(err) => warn!(
                    target = "lumblog::application::auth",
                    error = %err,
                    "platform identity check failed"
                ),
            }
        }

        match (self.admin_key.as_deref(), credentials.admin_key_cookie) {
            (Some(expected), Some(presented)) if keys_match(expected, presented) => {
                Some(AdminPrincipal::AdminKey)
            }
            _ => None,
        }
    }

    /// Check a key submitted to open an admin session. On success the
    /// configured key is returned for use as the cookie value.
    pub fn open_session(&self, presented: Option<&str>) -> Result<&str, SessionError> {
        let expected = self
            .admin_key
            .as_deref()
            .ok_or(SessionError::NotConfigured)?;
        match presented {
            Some(presented) if keys_match(expected, presented) => Ok(expected),
            _ => Err(SessionError::InvalidKey),
        }
    }
}

fn keys_match(expected: &str, presented: &str) -> bool {
    !presented.is_empty() && bool::from(expected.as_bytes().ct_eq(presented.as_bytes()))
}
