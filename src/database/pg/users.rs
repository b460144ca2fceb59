use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::credits::apply_change_in;
use super::{as_bigint, decode_enum};
use crate::database::connection::PgDatabase;
use crate::database::queries::UserQueries;
use crate::error::{MarketplaceError, MarketplaceResult};
use crate::identity::EntityId;
use crate::models::{
    CreditChange, CreditEntry, PageRequest, PendingVerification, User, UserCounts, UserFilter,
    UserType, VerificationReview, VerificationStatus,
};

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    full_name: String,
    email: String,
    phone: String,
    user_type: String,
    profile_image_url: Option<String>,
    is_verified: bool,
    is_active: bool,
    verification_status: Option<String>,
    service_category: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = MarketplaceError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let verification_status = row
            .verification_status
            .as_deref()
            .map(|raw| {
                decode_enum(
                    raw,
                    "electrician_profiles.verification_status",
                    VerificationStatus::parse,
                )
            })
            .transpose()?;

        Ok(User {
            user_type: decode_enum(&row.user_type, "users.user_type", UserType::parse)?,
            verification_status,
            id: row.id.into(),
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            profile_image_url: row.profile_image_url,
            is_verified: row.is_verified,
            is_active: row.is_active,
            service_category: row.service_category,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PendingRow {
    user_id: String,
    full_name: String,
    email: String,
    phone: String,
    service_category: Option<String>,
    verification_documents: Option<serde_json::Value>,
}

impl From<PendingRow> for PendingVerification {
    fn from(row: PendingRow) -> Self {
        PendingVerification {
            user_id: row.user_id.into(),
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            service_category: row.service_category,
            verification_documents: row.verification_documents,
        }
    }
}

const USER_SELECT: &str = r#"
    SELECT u.id::text AS id, u.full_name, u.email, u.phone, u.user_type, u.profile_image_url,
           u.is_verified, u.is_active, p.verification_status, p.service_category, u.created_at
    FROM users u
    LEFT JOIN electrician_profiles p ON p.user_id = u.id
"#;

const USER_FILTER: &str = r#"
    WHERE ($1::text IS NULL OR u.user_type = $1)
      AND ($2::text IS NULL OR u.full_name ILIKE $2 OR u.email ILIKE $2 OR u.phone LIKE $2)
"#;

#[async_trait]
impl UserQueries for PgDatabase {
    async fn find_user(&self, user_id: &EntityId) -> MarketplaceResult<Option<User>> {
        let sql = format!("{USER_SELECT} WHERE u.id = $1::uuid");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user_id.as_str())
            .fetch_optional(self.pool())
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn pending_verifications(&self) -> MarketplaceResult<Vec<PendingVerification>> {
        let rows = sqlx::query_as::<_, PendingRow>(
            r#"
            SELECT u.id::text AS user_id, u.full_name, u.email, u.phone,
                   p.service_category, p.verification_documents
            FROM electrician_profiles p
            JOIN users u ON u.id = p.user_id
            WHERE p.verification_status = $1
            ORDER BY u.created_at ASC
            "#,
        )
        .bind(VerificationStatus::Pending.as_str())
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(PendingVerification::from).collect())
    }

    async fn apply_verification_decision(
        &self,
        review: &VerificationReview<'_>,
        bonus: Option<&CreditChange>,
    ) -> MarketplaceResult<Option<CreditEntry>> {
        let mut tx = self.pool().begin().await?;
        let verified = review.is_approval();

        let updated = sqlx::query(
            r#"
            UPDATE electrician_profiles
            SET verification_status = $2,
                verified_at = CASE WHEN $3 THEN NOW() ELSE NULL END,
                verified_by = $4::uuid,
                rejection_reason = $5
            WHERE user_id = $1::uuid
            "#,
        )
        .bind(review.user_id.as_str())
        .bind(review.status.as_str())
        .bind(verified)
        .bind(review.reviewer_id.as_str())
        .bind(review.rejection_reason)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(MarketplaceError::not_found(format!(
                "electrician profile for user {}",
                review.user_id
            )));
        }

        sqlx::query("UPDATE users SET is_verified = $2 WHERE id = $1::uuid")
            .bind(review.user_id.as_str())
            .bind(verified)
            .execute(&mut *tx)
            .await?;

        let entry = match bonus {
            Some(change) => Some(apply_change_in(&mut *tx, change).await?),
            None => None,
        };

        tx.commit().await?;
        Ok(entry)
    }

    async fn user_counts(&self) -> MarketplaceResult<UserCounts> {
        let (total, electricians, citizens, pending): (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE user_type = 'ELECTRICIAN'),
                   COUNT(*) FILTER (WHERE user_type = 'CITIZEN'),
                   (SELECT COUNT(*) FROM electrician_profiles WHERE verification_status = 'PENDING')
            FROM users
            "#,
        )
        .fetch_one(self.pool())
        .await?;

        Ok(UserCounts {
            total,
            electricians,
            citizens,
            pending_verifications: pending,
        })
    }

    async fn list_users(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> MarketplaceResult<(Vec<User>, i64)> {
        let user_type = filter.user_type.map(|t| t.as_str());
        let pattern = filter
            .search
            .as_deref()
            .filter(|term| !term.is_empty())
            .map(|term| format!("%{term}%"));

        let sql = format!("{USER_SELECT} {USER_FILTER} ORDER BY u.created_at DESC LIMIT $3 OFFSET $4");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user_type)
            .bind(pattern.as_deref())
            .bind(as_bigint(page.limit()))
            .bind(as_bigint(page.offset()))
            .fetch_all(self.pool())
            .await?;

        let count_sql = format!("SELECT COUNT(*) FROM users u {USER_FILTER}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(user_type)
            .bind(pattern.as_deref())
            .fetch_one(self.pool())
            .await?;

        let users = rows
            .into_iter()
            .map(User::try_from)
            .collect::<MarketplaceResult<Vec<_>>>()?;
        Ok((users, total))
    }
}
