//! PostgreSQL Error Codes
//!
//! SQLSTATE codes the failover router cares about. A code is five characters:
//! the first two name the class, the last three the condition.
//!
//! ## Reference
//!
//! Full list: <https://www.postgresql.org/docs/current/errcodes-appendix.html>
//!
//! ## Usage
//!
//! ```rust,ignore
//! use marketplace_core::database::error_codes::PgErrorCode;
//!
//! match db_error.code() {
//!     Some(code) if PgErrorCode::is_unique_violation(&code) => {
//!         // Handle duplicate key
//!     }
//!     _ => return Err(db_error),
//! }
//! ```

/// PostgreSQL SQLSTATE error codes
///
/// Only codes used by the connectivity/integrity classification are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PgErrorCode;

impl PgErrorCode {
    // =========================================================================
    // Class 08: Connection Exception
    // =========================================================================

    /// Connection exception class prefix
    pub const CONNECTION_EXCEPTION_CLASS: &'static str = "08";

    /// Connection failure - Code 08006
    pub const CONNECTION_FAILURE: &'static str = "08006";

    /// Client unable to establish connection - Code 08001
    pub const SQLCLIENT_UNABLE_TO_ESTABLISH_SQLCONNECTION: &'static str = "08001";

    // =========================================================================
    // Class 23: Integrity Constraint Violation
    // =========================================================================

    /// Unique violation (duplicate key) - Code 23505
    ///
    /// Raised when two requests race to create the same block pair or the same
    /// payment transaction id.
    pub const UNIQUE_VIOLATION: &'static str = "23505";

    /// Foreign key violation - Code 23503
    pub const FOREIGN_KEY_VIOLATION: &'static str = "23503";

    /// Not null violation - Code 23502
    pub const NOT_NULL_VIOLATION: &'static str = "23502";

    /// Check constraint violation - Code 23514
    pub const CHECK_VIOLATION: &'static str = "23514";

    // =========================================================================
    // Class 53: Insufficient Resources
    // =========================================================================

    /// Too many connections - Code 53300
    pub const TOO_MANY_CONNECTIONS: &'static str = "53300";

    // =========================================================================
    // Class 57: Operator Intervention
    // =========================================================================

    /// Query canceled - Code 57014
    ///
    /// Raised when `statement_timeout` fires; treated like a network timeout.
    pub const QUERY_CANCELED: &'static str = "57014";

    /// Admin shutdown - Code 57P01
    pub const ADMIN_SHUTDOWN: &'static str = "57P01";

    /// Crash shutdown - Code 57P02
    pub const CRASH_SHUTDOWN: &'static str = "57P02";

    /// Cannot connect now (server starting up) - Code 57P03
    pub const CANNOT_CONNECT_NOW: &'static str = "57P03";

    // =========================================================================
    // Helper Methods
    // =========================================================================

    /// Check if the error code is a unique constraint violation
    #[inline]
    pub fn is_unique_violation(code: &str) -> bool {
        code == Self::UNIQUE_VIOLATION
    }

    /// Check if the error code is any integrity constraint violation (Class 23)
    #[inline]
    pub fn is_integrity_constraint_violation(code: &str) -> bool {
        code.starts_with("23")
    }

    /// Check if the error code means the server is unreachable or refusing work
    ///
    /// Matches whole classes where possible (08, 53) and the specific
    /// operator-intervention codes that signal a dead or restarting server.
    #[inline]
    pub fn is_connectivity(code: &str) -> bool {
        code.starts_with(Self::CONNECTION_EXCEPTION_CLASS)
            || code.starts_with("53")
            || matches!(
                code,
                Self::QUERY_CANCELED
                    | Self::ADMIN_SHUTDOWN
                    | Self::CRASH_SHUTDOWN
                    | Self::CANNOT_CONNECT_NOW
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_detection() {
        assert!(PgErrorCode::is_unique_violation("23505"));
        assert!(!PgErrorCode::is_unique_violation("23503"));
        assert!(!PgErrorCode::is_unique_violation("08006"));
    }

    #[test]
    fn test_integrity_constraint_class() {
        assert!(PgErrorCode::is_integrity_constraint_violation("23505"));
        assert!(PgErrorCode::is_integrity_constraint_violation("23503"));
        assert!(PgErrorCode::is_integrity_constraint_violation("23502"));
        assert!(!PgErrorCode::is_integrity_constraint_violation("57014"));
    }

    #[test]
    fn test_connectivity_codes() {
        assert!(PgErrorCode::is_connectivity("08006"));
        assert!(PgErrorCode::is_connectivity("08001"));
        assert!(PgErrorCode::is_connectivity("53300"));
        assert!(PgErrorCode::is_connectivity("57P01"));
        assert!(PgErrorCode::is_connectivity("57014"));
        assert!(!PgErrorCode::is_connectivity("23505"));
        assert!(!PgErrorCode::is_connectivity("42P01"));
    }
}
