//! Disk-backed fallback block list.
//!
//! The whole list is loaded once at startup and rewritten in full after every
//! mutation. The async mutex is held across the rewrite so file contents
//! follow mutation order. A failed rewrite is logged and the in-memory list
//! stays authoritative; fallback data loss on crash is accepted.

use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::persist::{load_json_list, write_json_atomic};
use crate::error::{MarketplaceError, MarketplaceResult};
use crate::identity::EntityId;
use crate::models::{Block, BlockStatus};

#[derive(Debug)]
pub struct BlockList {
    blocks: Mutex<Vec<Block>>,
    path: Option<PathBuf>,
}

impl BlockList {
    /// Load from `path`; a missing or corrupt file starts empty
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let blocks: Vec<Block> = load_json_list(&path);
        debug!(
            path = %path.display(),
            count = blocks.len(),
            "Loaded fallback block list"
        );
        Self {
            blocks: Mutex::new(blocks),
            path: Some(path),
        }
    }

    /// Not persisted anywhere
    pub fn in_memory() -> Self {
        Self {
            blocks: Mutex::new(Vec::new()),
            path: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append a block; `Conflict` if the pair is already blocked
    pub async fn block(
        &self,
        blocker_id: &EntityId,
        blocked_id: &EntityId,
        reason: Option<&str>,
    ) -> MarketplaceResult<Block> {
        let mut blocks = self.blocks.lock().await;
        if blocks
            .iter()
            .any(|b| &b.blocker_id == blocker_id && &b.blocked_id == blocked_id)
        {
            return Err(MarketplaceError::Conflict(
                "user is already blocked".to_string(),
            ));
        }

        let block = Block {
            id: EntityId::mint("block"),
            blocker_id: blocker_id.clone(),
            blocked_id: blocked_id.clone(),
            reason: reason.map(str::to_string),
            created_at: Utc::now(),
        };
        blocks.push(block.clone());
        self.save(&blocks).await;
        Ok(block)
    }

    /// Remove the block and return it, `None` if the pair was not blocked
    pub async fn unblock(&self, blocker_id: &EntityId, blocked_id: &EntityId) -> Option<Block> {
        let mut blocks = self.blocks.lock().await;
        let position = blocks
            .iter()
            .position(|b| &b.blocker_id == blocker_id && &b.blocked_id == blocked_id)?;
        let removed = blocks.remove(position);
        self.save(&blocks).await;
        Some(removed)
    }

    /// Newest first
    pub async fn blocked_by(&self, blocker_id: &EntityId) -> Vec<Block> {
        let blocks = self.blocks.lock().await;
        blocks
            .iter()
            .rev()
            .filter(|b| &b.blocker_id == blocker_id)
            .cloned()
            .collect()
    }

    pub async fn find(&self, blocker_id: &EntityId, blocked_id: &EntityId) -> Option<Block> {
        let blocks = self.blocks.lock().await;
        blocks
            .iter()
            .find(|b| &b.blocker_id == blocker_id && &b.blocked_id == blocked_id)
            .cloned()
    }

    /// Either direction
    pub async fn is_blocked(&self, a: &EntityId, b: &EntityId) -> bool {
        let blocks = self.blocks.lock().await;
        blocks.iter().any(|block| block.is_between(a, b))
    }

    pub async fn status(&self, me: &EntityId, other: &EntityId) -> BlockStatus {
        let blocks = self.blocks.lock().await;
        let i_blocked_them = blocks
            .iter()
            .any(|b| &b.blocker_id == me && &b.blocked_id == other);
        let they_blocked_me = blocks
            .iter()
            .any(|b| &b.blocker_id == other && &b.blocked_id == me);
        BlockStatus::new(i_blocked_them, they_blocked_me)
    }

    /// Insertion order
    pub async fn snapshot(&self) -> Vec<Block> {
        self.blocks.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.blocks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blocks.lock().await.is_empty()
    }

    async fn save(&self, blocks: &[Block]) {
        let Some(path) = self.path.clone() else {
            return;
        };
        let snapshot = blocks.to_vec();
        let target = path.clone();
        let written =
            tokio::task::spawn_blocking(move || write_json_atomic(&target, &snapshot)).await;

        match written {
            Ok(Ok(())) => {}
            Ok(Err(error)) => warn!(
                path = %path.display(),
                error = %error,
                "Failed to persist fallback block list"
            ),
            Err(join_error) => warn!(
                path = %path.display(),
                error = %join_error,
                "Fallback block list writer task failed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn id(raw: &str) -> EntityId {
        EntityId::parse(raw)
    }

    #[tokio::test]
    async fn test_duplicate_block_conflicts() {
        let list = BlockList::in_memory();
        list.block(&id("a"), &id("b"), None).await.unwrap();

        let err = list.block(&id("a"), &id("b"), None).await.unwrap_err();
        assert!(matches!(err, MarketplaceError::Conflict(_)));
        assert_eq!(list.len().await, 1);

        // the reverse direction is a separate block
        list.block(&id("b"), &id("a"), Some("spam")).await.unwrap();
        assert_eq!(list.len().await, 2);
    }

    #[tokio::test]
    async fn test_status_is_directional() {
        let list = BlockList::in_memory();
        list.block(&id("a"), &id("b"), None).await.unwrap();

        let from_a = list.status(&id("a"), &id("b")).await;
        assert!(from_a.i_blocked_them && !from_a.they_blocked_me && from_a.is_blocked);

        let from_b = list.status(&id("b"), &id("a")).await;
        assert!(!from_b.i_blocked_them && from_b.they_blocked_me && from_b.is_blocked);

        assert!(list.is_blocked(&id("b"), &id("a")).await);
        assert!(!list.is_blocked(&id("a"), &id("c")).await);
    }

    #[tokio::test]
    async fn test_unblock_missing_returns_none() {
        let list = BlockList::in_memory();
        assert!(list.unblock(&id("a"), &id("b")).await.is_none());
    }

    #[tokio::test]
    async fn test_reload_preserves_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mock_blocks.json");

        let list = BlockList::load(&path);
        for target in ["b", "c", "d", "e"] {
            list.block(&id("a"), &id(target), Some(target)).await.unwrap();
        }
        list.unblock(&id("a"), &id("c")).await.unwrap();
        let before = list.snapshot().await;

        let reloaded = BlockList::load(&path);
        assert_eq!(reloaded.snapshot().await, before);

        let order: Vec<String> = before.iter().map(|b| b.blocked_id.to_string()).collect();
        assert_eq!(order, vec!["b", "d", "e"]);
    }

    #[tokio::test]
    async fn test_file_uses_camel_case_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mock_blocks.json");
        let list = BlockList::load(&path);
        list.block(&id("a"), &id("b"), None).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"blockerId\""));
        assert!(raw.contains("\"createdAt\""));
        assert!(!raw.contains("\"reason\""));
    }
}
