use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use super::{as_bigint, conflict_on_unique, decode_enum};
use crate::database::connection::PgDatabase;
use crate::database::queries::CreditQueries;
use crate::error::{MarketplaceError, MarketplaceResult};
use crate::identity::EntityId;
use crate::models::{CreditChange, CreditEntry, CreditTransactionType, NewPayment};

#[derive(Debug, sqlx::FromRow)]
struct CreditRow {
    id: String,
    user_id: String,
    amount: i64,
    transaction_type: String,
    description: String,
    related_id: Option<String>,
    balance_after: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<CreditRow> for CreditEntry {
    type Error = MarketplaceError;

    fn try_from(row: CreditRow) -> Result<Self, Self::Error> {
        Ok(CreditEntry {
            transaction_type: decode_enum(
                &row.transaction_type,
                "credits.transaction_type",
                CreditTransactionType::parse,
            )?,
            id: row.id.into(),
            user_id: row.user_id.into(),
            amount: row.amount,
            description: row.description,
            related_id: row.related_id,
            balance_after: row.balance_after,
            created_at: row.created_at,
        })
    }
}

/// Lock the profile row, move the balance and append the ledger entry
pub(super) async fn apply_change_in(
    conn: &mut PgConnection,
    change: &CreditChange,
) -> MarketplaceResult<CreditEntry> {
    let balance: Option<i64> = sqlx::query_scalar(
        "SELECT credit_balance FROM electrician_profiles WHERE user_id = $1::uuid FOR UPDATE",
    )
    .bind(change.user_id.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    let Some(balance) = balance else {
        return Err(MarketplaceError::NotFound(format!(
            "electrician profile for user {}",
            change.user_id
        )));
    };
    let balance_after = balance.checked_add(change.amount).ok_or_else(|| {
        MarketplaceError::validation(format!(
            "credit change of {} overflows the balance of user {}",
            change.amount, change.user_id
        ))
    })?;

    sqlx::query("UPDATE electrician_profiles SET credit_balance = $2 WHERE user_id = $1::uuid")
        .bind(change.user_id.as_str())
        .bind(balance_after)
        .execute(&mut *conn)
        .await?;

    let sql = format!(
        "INSERT INTO credits (user_id, amount, transaction_type, description, related_id, balance_after) \
         VALUES ($1::uuid, $2, $3, $4, $5, $6) RETURNING {CREDIT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, CreditRow>(&sql)
        .bind(change.user_id.as_str())
        .bind(change.amount)
        .bind(change.transaction_type.as_str())
        .bind(&change.description)
        .bind(change.related_id.as_deref())
        .bind(balance_after)
        .fetch_one(&mut *conn)
        .await?;

    row.try_into()
}

const CREDIT_COLUMNS: &str = "id::text AS id, user_id::text AS user_id, amount, transaction_type, \
     description, related_id, balance_after, created_at";

#[async_trait]
impl CreditQueries for PgDatabase {
    async fn payment_exists(&self, transaction_id: &str) -> MarketplaceResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM payments WHERE transaction_id = $1)")
                .bind(transaction_id)
                .fetch_one(self.pool())
                .await?;
        Ok(exists)
    }

    async fn apply_purchase(
        &self,
        payment: &NewPayment,
        change: &CreditChange,
    ) -> MarketplaceResult<CreditEntry> {
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            "INSERT INTO payments (payer_id, payee_id, amount, payment_method, transaction_id, metadata) \
             VALUES ($1::uuid, $2, $3, $4, $5, $6)",
        )
        .bind(payment.payer_id.as_str())
        .bind(&payment.payee_id)
        .bind(payment.amount)
        .bind(&payment.payment_method)
        .bind(&payment.transaction_id)
        .bind(&payment.metadata)
        .execute(&mut *tx)
        .await
        .map_err(|error| conflict_on_unique(error, "purchase has already been processed"))?;

        let entry = apply_change_in(&mut *tx, change).await?;
        tx.commit().await?;
        Ok(entry)
    }

    async fn credit_history(
        &self,
        user_id: &EntityId,
        limit: usize,
    ) -> MarketplaceResult<Vec<CreditEntry>> {
        let sql = format!(
            "SELECT {CREDIT_COLUMNS} FROM credits WHERE user_id = $1::uuid \
             ORDER BY created_at DESC LIMIT $2"
        );
        let rows = sqlx::query_as::<_, CreditRow>(&sql)
            .bind(user_id.as_str())
            .bind(as_bigint(limit))
            .fetch_all(self.pool())
            .await?;
        rows.into_iter().map(CreditEntry::try_from).collect()
    }

    async fn total_purchased(&self) -> MarketplaceResult<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0)::bigint FROM credits WHERE transaction_type = $1",
        )
        .bind(CreditTransactionType::Purchase.as_str())
        .fetch_one(self.pool())
        .await?;
        Ok(total)
    }
}
