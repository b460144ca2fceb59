use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::conflict_on_unique;
use crate::database::connection::PgDatabase;
use crate::database::queries::BlockQueries;
use crate::error::MarketplaceResult;
use crate::identity::EntityId;
use crate::models::{Block, BlockedUser, UserSummary};

#[derive(Debug, sqlx::FromRow)]
struct BlockRow {
    id: String,
    blocker_id: String,
    blocked_id: String,
    reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<BlockRow> for Block {
    fn from(row: BlockRow) -> Self {
        Block {
            id: row.id.into(),
            blocker_id: row.blocker_id.into(),
            blocked_id: row.blocked_id.into(),
            reason: row.reason,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BlockedUserRow {
    id: String,
    reason: Option<String>,
    created_at: DateTime<Utc>,
    user_id: String,
    full_name: Option<String>,
    profile_image_url: Option<String>,
}

impl From<BlockedUserRow> for BlockedUser {
    fn from(row: BlockedUserRow) -> Self {
        BlockedUser {
            id: row.id.into(),
            blocked_user: UserSummary {
                id: row.user_id.into(),
                full_name: row
                    .full_name
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| UserSummary::UNKNOWN_NAME.to_string()),
                profile_image_url: row.profile_image_url,
            },
            reason: row.reason,
            created_at: row.created_at,
        }
    }
}

const BLOCK_COLUMNS: &str =
    "id::text AS id, blocker_id::text AS blocker_id, blocked_id::text AS blocked_id, reason, created_at";

#[async_trait]
impl BlockQueries for PgDatabase {
    async fn find_block(
        &self,
        blocker_id: &EntityId,
        blocked_id: &EntityId,
    ) -> MarketplaceResult<Option<Block>> {
        let sql = format!(
            "SELECT {BLOCK_COLUMNS} FROM user_blocks WHERE blocker_id = $1::uuid AND blocked_id = $2::uuid"
        );
        let row = sqlx::query_as::<_, BlockRow>(&sql)
            .bind(blocker_id.as_str())
            .bind(blocked_id.as_str())
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(Block::from))
    }

    async fn insert_block(
        &self,
        blocker_id: &EntityId,
        blocked_id: &EntityId,
        reason: Option<&str>,
    ) -> MarketplaceResult<Block> {
        let sql = format!(
            "INSERT INTO user_blocks (blocker_id, blocked_id, reason) \
             VALUES ($1::uuid, $2::uuid, $3) RETURNING {BLOCK_COLUMNS}"
        );
        let row = sqlx::query_as::<_, BlockRow>(&sql)
            .bind(blocker_id.as_str())
            .bind(blocked_id.as_str())
            .bind(reason)
            .fetch_one(self.pool())
            .await
            .map_err(|error| conflict_on_unique(error, "user is already blocked"))?;
        Ok(row.into())
    }

    async fn delete_block(
        &self,
        blocker_id: &EntityId,
        blocked_id: &EntityId,
    ) -> MarketplaceResult<u64> {
        let result = sqlx::query(
            "DELETE FROM user_blocks WHERE blocker_id = $1::uuid AND blocked_id = $2::uuid",
        )
        .bind(blocker_id.as_str())
        .bind(blocked_id.as_str())
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected())
    }

    async fn blocked_users(&self, blocker_id: &EntityId) -> MarketplaceResult<Vec<BlockedUser>> {
        let rows = sqlx::query_as::<_, BlockedUserRow>(
            r#"
            SELECT b.id::text AS id, b.reason, b.created_at,
                   u.id::text AS user_id, u.full_name, u.profile_image_url
            FROM user_blocks b
            JOIN users u ON u.id = b.blocked_id
            WHERE b.blocker_id = $1::uuid
            ORDER BY b.created_at DESC
            "#,
        )
        .bind(blocker_id.as_str())
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(BlockedUser::from).collect())
    }

    async fn any_block_between(&self, a: &EntityId, b: &EntityId) -> MarketplaceResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM user_blocks
                WHERE (blocker_id = $1::uuid AND blocked_id = $2::uuid)
                   OR (blocker_id = $2::uuid AND blocked_id = $1::uuid)
            )
            "#,
        )
        .bind(a.as_str())
        .bind(b.as_str())
        .fetch_one(self.pool())
        .await?;
        Ok(exists)
    }
}
