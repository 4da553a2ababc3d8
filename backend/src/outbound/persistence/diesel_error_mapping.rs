//! Shared translation of pool and Diesel failures into port errors.
//!
//! Every clinic repository error has the same two variants, so adapters pass
//! their `connection` and `query` constructors and get consistent messages.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

pub(crate) fn map_pool_error<E>(error: PoolError, connection: impl FnOnce(String) -> E) -> E {
    connection(error.to_string())
}

pub(crate) fn map_diesel_error<E>(
    error: DieselError,
    query: impl FnOnce(String) -> E,
    connection: impl FnOnce(String) -> E,
) -> E {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(
                ?kind,
                message = info.message(),
                constraint = info.constraint_name(),
                "diesel operation failed"
            );
        }
        _ => debug!(error = %error, "diesel operation failed"),
    }

    match error {
        DieselError::NotFound => query("record not found".to_owned()),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            connection("database connection closed".to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => query(format!(
            "referenced record does not exist ({})",
            info.constraint_name().unwrap_or("unknown constraint")
        )),
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            query("duplicate record".to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
            query("concurrent update conflict".to_owned())
        }
        DieselError::QueryBuilderError(_) => query("database query error".to_owned()),
        DieselError::DeserializationError(err) => query(format!("row decode failed: {err}")),
        _ => query("database error".to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::domain::ports::OperationRepositoryError;

    fn map(error: DieselError) -> OperationRepositoryError {
        map_diesel_error(
            error,
            OperationRepositoryError::query,
            OperationRepositoryError::connection,
        )
    }

    #[rstest]
    fn pool_errors_become_connection_errors() {
        let mapped = map_pool_error(
            PoolError::checkout("timed out"),
            OperationRepositoryError::connection,
        );
        assert!(matches!(
            mapped,
            OperationRepositoryError::Connection { ref message } if message.contains("timed out")
        ));
    }

    #[rstest]
    fn closed_connection_is_a_connection_error() {
        let mapped = map(DieselError::DatabaseError(
            DatabaseErrorKind::ClosedConnection,
            Box::new("server closed the connection".to_owned()),
        ));
        assert!(matches!(mapped, OperationRepositoryError::Connection { .. }));
    }

    #[rstest]
    fn not_found_is_a_query_error() {
        assert_eq!(
            map(DieselError::NotFound),
            OperationRepositoryError::query("record not found")
        );
    }

    #[rstest]
    fn unique_violation_is_a_query_error() {
        let mapped = map(DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key".to_owned()),
        ));
        assert_eq!(mapped, OperationRepositoryError::query("duplicate record"));
    }
}
