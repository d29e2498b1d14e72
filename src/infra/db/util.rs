use sqlx::error::{DatabaseError, ErrorKind};

use crate::application::repos::RepoError;

/// SQLSTATE `query_canceled`, raised when `statement_timeout` fires.
const QUERY_CANCELED: &str = "57014";
/// SQLSTATE class 22 covers bad literals such as malformed uuids or enum
/// values.
const DATA_EXCEPTION_CLASS: &str = "22";

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        sqlx::Error::Database(db) => map_database_error(db.as_ref()),
        other => RepoError::from_persistence(other),
    }
}

fn map_database_error(db: &dyn DatabaseError) -> RepoError {
    let code = db.code();
    let code = code.as_deref().unwrap_or_default();

    match db.kind() {
        ErrorKind::UniqueViolation => RepoError::Duplicate {
            constraint: db.constraint().unwrap_or("unknown").to_string(),
        },
        ErrorKind::ForeignKeyViolation => RepoError::InvalidInput {
            message: db.message().to_string(),
        },
        ErrorKind::NotNullViolation | ErrorKind::CheckViolation => RepoError::Integrity {
            message: db.message().to_string(),
        },
        _ if code == QUERY_CANCELED => RepoError::Timeout,
        _ if code.starts_with(DATA_EXCEPTION_CLASS) => RepoError::InvalidInput {
            message: db.message().to_string(),
        },
        _ => RepoError::from_persistence(db.message()),
    }
}
