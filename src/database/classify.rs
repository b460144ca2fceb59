//! # Failure Classification
//!
//! Decides whether a failed database call means "the database is not there"
//! (answer this call from the fallback store) or "the database said no"
//! (surface the error). Getting this boundary wrong either hides integrity
//! bugs behind fallback successes or makes outages fatal, so it lives in one
//! place and every call site goes through it.

use super::error_codes::PgErrorCode;

/// Coarse classification of a database failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// Unreachable server, timeout, dropped or exhausted pool
    Connectivity,
    /// Constraint violation reported by the server
    Integrity,
    /// Anything else: decode errors, missing rows, syntax errors
    Other,
}

/// Implemented by every error type that can come back from a database action
pub trait ClassifyFailure {
    fn failure_class(&self) -> FailureClass;

    fn is_connectivity_failure(&self) -> bool {
        self.failure_class() == FailureClass::Connectivity
    }
}

impl ClassifyFailure for sqlx::Error {
    fn failure_class(&self) -> FailureClass {
        match self {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => FailureClass::Connectivity,
            sqlx::Error::Database(db_error) => match db_error.code() {
                Some(code) if PgErrorCode::is_integrity_constraint_violation(&code) => {
                    FailureClass::Integrity
                }
                Some(code) if PgErrorCode::is_connectivity(&code) => FailureClass::Connectivity,
                _ => FailureClass::Other,
            },
            _ => FailureClass::Other,
        }
    }
}
