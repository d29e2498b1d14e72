use thiserror::Error;

/// Input the domain rules refuse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("unsupported locale `{0}`")]
    UnsupportedLocale(String),
}
