//! User blocking, backed by `user_blocks` or the disk-persisted fallback list.

use crate::availability::Connector;
use crate::database::BlockQueries;
use crate::error::{MarketplaceError, MarketplaceResult};
use crate::identity::EntityId;
use crate::models::{Block, BlockStatus, BlockedUser};
use crate::router::PersistenceRouter;

const ALREADY_BLOCKED: &str = "user is already blocked";
const NOT_BLOCKED: &str = "user is not blocked";

pub struct BlockService<C: Connector> {
    router: PersistenceRouter<C>,
}

impl<C> BlockService<C>
where
    C: Connector,
    C::Connection: BlockQueries,
{
    pub fn new(router: PersistenceRouter<C>) -> Self {
        Self { router }
    }

    pub async fn block(
        &self,
        blocker_id: &EntityId,
        blocked_id: &EntityId,
        reason: Option<&str>,
    ) -> MarketplaceResult<Block> {
        if blocker_id == blocked_id {
            return Err(MarketplaceError::validation("users cannot block themselves"));
        }

        self.router
            .execute(
                "block_user",
                &[blocker_id, blocked_id],
                |db| async move {
                    if db.find_block(blocker_id, blocked_id).await?.is_some() {
                        return Err(MarketplaceError::Conflict(ALREADY_BLOCKED.to_string()));
                    }
                    db.insert_block(blocker_id, blocked_id, reason).await
                },
                |store| async move { store.blocks.block(blocker_id, blocked_id, reason).await },
            )
            .await
    }

    pub async fn unblock(&self, blocker_id: &EntityId, blocked_id: &EntityId) -> MarketplaceResult<()> {
        self.router
            .execute(
                "unblock_user",
                &[blocker_id, blocked_id],
                |db| async move {
                    match db.delete_block(blocker_id, blocked_id).await? {
                        0 => Err(MarketplaceError::not_found(NOT_BLOCKED)),
                        _ => Ok(()),
                    }
                },
                |store| async move {
                    store
                        .blocks
                        .unblock(blocker_id, blocked_id)
                        .await
                        .map(|_| ())
                        .ok_or_else(|| MarketplaceError::not_found(NOT_BLOCKED))
                },
            )
            .await
    }

    /// Newest first, with a summary of each blocked user
    pub async fn blocked_users(&self, blocker_id: &EntityId) -> MarketplaceResult<Vec<BlockedUser>> {
        self.router
            .execute(
                "blocked_users",
                &[blocker_id],
                |db| async move { db.blocked_users(blocker_id).await },
                |store| async move {
                    let blocks = store.blocks.blocked_by(blocker_id).await;
                    Ok(blocks
                        .into_iter()
                        .map(|block| BlockedUser {
                            blocked_user: store.users.get_or_default(&block.blocked_id).summary(),
                            id: block.id,
                            reason: block.reason,
                            created_at: block.created_at,
                        })
                        .collect())
                },
            )
            .await
    }

    /// True if either user has blocked the other
    pub async fn is_blocked(&self, a: &EntityId, b: &EntityId) -> MarketplaceResult<bool> {
        self.router
            .execute(
                "is_blocked",
                &[a, b],
                |db| async move { db.any_block_between(a, b).await },
                |store| async move { Ok(store.blocks.is_blocked(a, b).await) },
            )
            .await
    }

    pub async fn status(&self, me: &EntityId, other: &EntityId) -> MarketplaceResult<BlockStatus> {
        self.router
            .execute(
                "block_status",
                &[me, other],
                |db| async move {
                    let (mine, theirs) =
                        futures::try_join!(db.find_block(me, other), db.find_block(other, me))?;
                    Ok(BlockStatus::new(mine.is_some(), theirs.is_some()))
                },
                |store| async move { Ok(store.blocks.status(me, other).await) },
            )
            .await
    }
}
