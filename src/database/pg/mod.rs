//! PostgreSQL implementations of the query traits in [`super::queries`].
//!
//! Identifiers cross the boundary as text (`id::text` on the way out,
//! `$n::uuid` on the way in) so the domain keeps a single [`EntityId`] type
//! for both backends.
//!
//! [`EntityId`]: crate::identity::EntityId

mod blocks;
mod credits;
mod jobs;
mod locations;
mod notifications;
mod tickets;
mod users;

use crate::database::error_codes::PgErrorCode;
use crate::error::MarketplaceError;

/// Convert a sqlx error, turning a unique violation into `Conflict`
pub(crate) fn conflict_on_unique(error: sqlx::Error, message: &str) -> MarketplaceError {
    match MarketplaceError::from(error) {
        MarketplaceError::ConstraintViolation { code, .. }
            if PgErrorCode::is_unique_violation(&code) =>
        {
            MarketplaceError::Conflict(message.to_string())
        }
        other => other,
    }
}

/// Decode a text column into one of the domain enums
pub(crate) fn decode_enum<T>(
    raw: &str,
    column: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, MarketplaceError> {
    parse(raw).ok_or_else(|| {
        MarketplaceError::DatabaseError(format!("unexpected value '{raw}' in column {column}"))
    })
}

/// `LIMIT`/`OFFSET` parameters as Postgres bigints
pub(crate) fn as_bigint(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
