//! Conversions from external infrastructure errors into domain errors.

use beacon_domain::BeaconError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub BeaconError);

impl From<InfraError> for BeaconError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<BeaconError> for InfraError {
    fn from(value: BeaconError) -> Self {
        InfraError(value)
    }
}

/// Whether a sqlite failure means the database file itself is beyond repair
/// and should be recreated empty rather than blocking telemetry forever.
pub fn is_corruption(err: &SqlError) -> bool {
    use rusqlite::ffi::ErrorCode;

    match err {
        SqlError::SqliteFailure(inner, message) => {
            matches!(inner.code, ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase)
                || message
                    .as_deref()
                    .is_some_and(|m| m.to_ascii_lowercase().contains("not a database"))
        }
        _ => false,
    }
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → BeaconError */
/* -------------------------------------------------------------------------- */

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        let mapped = match value {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match err.code {
                    ErrorCode::DatabaseBusy => BeaconError::Storage("database is busy".into()),
                    ErrorCode::DatabaseLocked => BeaconError::Storage("database is locked".into()),
                    ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase => {
                        BeaconError::Storage(format!("database is corrupted: {message}"))
                    }
                    _ => BeaconError::Storage(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => BeaconError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                BeaconError::Storage(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                BeaconError::Storage(format!("invalid column type: {ty}"))
            }
            RE::InvalidPath(path) => {
                BeaconError::Storage(format!("invalid database path: {}", path.to_string_lossy()))
            }
            RE::InvalidQuery => BeaconError::Storage("invalid SQL query".into()),
            other => BeaconError::Storage(other.to_string()),
        };

        InfraError(mapped)
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → BeaconError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(BeaconError::Storage(format!("connection pool error: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → BeaconError */
/* -------------------------------------------------------------------------- */

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        if value.is_timeout() {
            return InfraError(BeaconError::Network("HTTP request timed out".into()));
        }

        if value.is_connect() {
            return InfraError(BeaconError::Network("HTTP connection failure".into()));
        }

        if let Some(status) = value.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            let mapped = match code {
                401 | 403 => BeaconError::Auth(message),
                404 => BeaconError::NotFound(message),
                400..=499 => BeaconError::InvalidInput(message),
                _ => BeaconError::Network(message),
            };
            return InfraError(mapped);
        }

        InfraError(BeaconError::Network(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::ffi::{Error as FfiError, ErrorCode};

    use super::*;

    #[test]
    fn sqlite_busy_maps_to_storage_error() {
        let err = SqlError::SqliteFailure(
            FfiError { code: ErrorCode::DatabaseBusy, extended_code: 5 },
            Some("database is locked".into()),
        );

        let mapped: BeaconError = InfraError::from(err).into();
        match mapped {
            BeaconError::Storage(msg) => {
                assert!(msg.contains("busy") || msg.contains("locked"));
            }
            other => panic!("expected storage error, got {other:?}"),
        }
    }

    #[test]
    fn corruption_detection_matches_not_a_database() {
        let err = SqlError::SqliteFailure(
            FfiError { code: ErrorCode::NotADatabase, extended_code: 26 },
            Some("file is not a database".into()),
        );
        assert!(is_corruption(&err));

        let busy = SqlError::SqliteFailure(
            FfiError { code: ErrorCode::DatabaseBusy, extended_code: 5 },
            None,
        );
        assert!(!is_corruption(&busy));
    }
}
