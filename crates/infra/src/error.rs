//! Storage error model.
//!
//! SQLx errors are mapped onto [`StoreError`] as follows:
//!
//! | SQLx error | StoreError | Scenario |
//! |------------|------------|----------|
//! | Database (unique violation) | `Domain(Conflict)` | Duplicate name / barcode |
//! | Database (foreign key violation) | `Domain(NotFound)` | Referenced row does not exist |
//! | Database (check constraint violation) | `Domain(Validation)` | Row rejected by a CHECK |
//! | RowNotFound | `Domain(NotFound)` | `fetch_one` on a missing row |
//! | Anything else | `Database` | Connection loss, pool closed, I/O |
//!
//! `Database` carries the driver detail for logs only; the HTTP layer never
//! echoes it to clients.

use thiserror::Error;

use almox_core::DomainError;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    /// The domain error, if this is one.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            StoreError::Domain(e) => Some(e),
            StoreError::Database(_) => None,
        }
    }

    pub(crate) fn corrupt_row(what: &str, err: impl std::fmt::Display) -> Self {
        StoreError::Database(format!("failed to decode {what} row: {err}"))
    }
}

/// Map SQLx errors to [`StoreError`].
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("{operation}: {}", db_err.message());
            if db_err.is_unique_violation() {
                DomainError::conflict(msg).into()
            } else if db_err.is_foreign_key_violation() {
                DomainError::NotFound.into()
            } else if db_err.is_check_violation() {
                DomainError::validation(msg).into()
            } else {
                StoreError::Database(msg)
            }
        }
        sqlx::Error::RowNotFound => DomainError::NotFound.into(),
        sqlx::Error::PoolClosed => {
            StoreError::Database(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Database(format!("sqlx error in {operation}: {other}")),
    }
}

/// Like [`map_sqlx_error`], but a unique violation becomes a conflict with a
/// caller-supplied message.
pub(crate) fn unique_as_conflict(
    operation: &str,
    err: sqlx::Error,
    message: impl FnOnce() -> String,
) -> StoreError {
    if is_unique_violation(&err) {
        return DomainError::conflict(message()).into();
    }
    map_sqlx_error(operation, err)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_domain_not_found() {
        let err = map_sqlx_error("get_item", sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Domain(DomainError::NotFound)));
    }

    #[test]
    fn pool_closed_is_an_infrastructure_failure() {
        let err = map_sqlx_error("list_items", sqlx::Error::PoolClosed);
        assert!(matches!(err, StoreError::Database(msg) if msg.contains("list_items")));
        assert!(map_sqlx_error("x", sqlx::Error::PoolClosed).as_domain().is_none());
    }
}
