use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::as_bigint;
use crate::database::connection::PgDatabase;
use crate::database::queries::NotificationQueries;
use crate::error::MarketplaceResult;
use crate::identity::EntityId;
use crate::models::{NewNotification, Notification};

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: String,
    user_id: String,
    #[sqlx(rename = "type")]
    notification_type: String,
    title: String,
    message: String,
    related_type: Option<String>,
    related_id: Option<String>,
    action_url: Option<String>,
    is_read: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id: row.id.into(),
            user_id: row.user_id.into(),
            notification_type: row.notification_type,
            title: row.title,
            message: row.message,
            related_type: row.related_type,
            related_id: row.related_id,
            action_url: row.action_url,
            is_read: row.is_read,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const NOTIFICATION_COLUMNS: &str = "id::text AS id, user_id::text AS user_id, type, title, message, \
     related_type, related_id, action_url, is_read, created_at, updated_at";

#[async_trait]
impl NotificationQueries for PgDatabase {
    async fn insert_notification(&self, new: &NewNotification) -> MarketplaceResult<Notification> {
        let sql = format!(
            "INSERT INTO notifications (user_id, type, title, message, related_type, related_id, action_url) \
             VALUES ($1::uuid, $2, $3, $4, $5, $6, $7) RETURNING {NOTIFICATION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(new.user_id.as_str())
            .bind(&new.notification_type)
            .bind(&new.title)
            .bind(&new.message)
            .bind(new.related_type.as_deref())
            .bind(new.related_id.as_deref())
            .bind(new.action_url.as_deref())
            .fetch_one(self.pool())
            .await?;
        Ok(row.into())
    }

    async fn notifications_for(
        &self,
        user_id: &EntityId,
        limit: usize,
    ) -> MarketplaceResult<Vec<Notification>> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE user_id = $1::uuid ORDER BY created_at DESC LIMIT $2"
        );
        let rows = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(user_id.as_str())
            .bind(as_bigint(limit))
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(Notification::from).collect())
    }

    async fn unread_count(&self, user_id: &EntityId) -> MarketplaceResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1::uuid AND is_read = FALSE",
        )
        .bind(user_id.as_str())
        .fetch_one(self.pool())
        .await?;
        Ok(count)
    }

    async fn mark_read(
        &self,
        user_id: &EntityId,
        notification_id: &EntityId,
    ) -> MarketplaceResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, updated_at = NOW() \
             WHERE id = $1::uuid AND user_id = $2::uuid AND is_read = FALSE",
        )
        .bind(notification_id.as_str())
        .bind(user_id.as_str())
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected())
    }

    async fn mark_all_read(&self, user_id: &EntityId) -> MarketplaceResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, updated_at = NOW() \
             WHERE user_id = $1::uuid AND is_read = FALSE",
        )
        .bind(user_id.as_str())
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected())
    }

    async fn mark_related_read(
        &self,
        user_id: &EntityId,
        notification_type: &str,
        related_id: &str,
    ) -> MarketplaceResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, updated_at = NOW() \
             WHERE user_id = $1::uuid AND type = $2 AND related_id = $3 AND is_read = FALSE",
        )
        .bind(user_id.as_str())
        .bind(notification_type)
        .bind(related_id)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_notification(
        &self,
        user_id: &EntityId,
        notification_id: &EntityId,
    ) -> MarketplaceResult<u64> {
        let result =
            sqlx::query("DELETE FROM notifications WHERE id = $1::uuid AND user_id = $2::uuid")
                .bind(notification_id.as_str())
                .bind(user_id.as_str())
                .execute(self.pool())
                .await?;
        Ok(result.rows_affected())
    }
}
