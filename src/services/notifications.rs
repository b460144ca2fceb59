use crate::availability::Connector;
use crate::constants::NOTIFICATION_LIST_LIMIT;
use crate::database::NotificationQueries;
use crate::error::MarketplaceResult;
use crate::identity::EntityId;
use crate::models::{NewNotification, Notification};
use crate::reconcile::{delete_everywhere, DeletionOutcome};
use crate::router::PersistenceRouter;

/// In-app notifications
pub struct NotificationService<C: Connector> {
    router: PersistenceRouter<C>,
}

impl<C> NotificationService<C>
where
    C: Connector,
    C::Connection: NotificationQueries,
{
    pub fn new(router: PersistenceRouter<C>) -> Self {
        Self { router }
    }

    pub async fn save(&self, new: &NewNotification) -> MarketplaceResult<Notification> {
        self.router
            .execute(
                "save_notification",
                &[&new.user_id],
                |db| async move { db.insert_notification(new).await },
                |store| async move { Ok(store.notifications.save(new)) },
            )
            .await
    }

    /// Newest first, capped at [`NOTIFICATION_LIST_LIMIT`]
    pub async fn list(&self, user_id: &EntityId) -> MarketplaceResult<Vec<Notification>> {
        self.router
            .execute(
                "list_notifications",
                &[user_id],
                |db| async move { db.notifications_for(user_id, NOTIFICATION_LIST_LIMIT).await },
                |store| async move { Ok(store.notifications.list(user_id, NOTIFICATION_LIST_LIMIT)) },
            )
            .await
    }

    pub async fn unread_count(&self, user_id: &EntityId) -> MarketplaceResult<i64> {
        self.router
            .execute(
                "unread_count",
                &[user_id],
                |db| async move { db.unread_count(user_id).await },
                |store| async move { Ok(store.notifications.unread_count(user_id)) },
            )
            .await
    }

    pub async fn mark_read(
        &self,
        user_id: &EntityId,
        notification_id: &EntityId,
    ) -> MarketplaceResult<u64> {
        self.router
            .execute(
                "mark_notification_read",
                &[user_id, notification_id],
                |db| async move { db.mark_read(user_id, notification_id).await },
                |store| async move { Ok(store.notifications.mark_read(user_id, notification_id)) },
            )
            .await
    }

    pub async fn mark_all_read(&self, user_id: &EntityId) -> MarketplaceResult<u64> {
        self.router
            .execute(
                "mark_all_notifications_read",
                &[user_id],
                |db| async move { db.mark_all_read(user_id).await },
                |store| async move { Ok(store.notifications.mark_all_read(user_id)) },
            )
            .await
    }

    /// Mark read every notification of `notification_type` pointing at `related_id`
    pub async fn mark_related_read(
        &self,
        user_id: &EntityId,
        notification_type: &str,
        related_id: &str,
    ) -> MarketplaceResult<u64> {
        self.router
            .execute(
                "mark_related_notifications_read",
                &[user_id],
                |db| async move {
                    db.mark_related_read(user_id, notification_type, related_id)
                        .await
                },
                |store| async move {
                    Ok(store
                        .notifications
                        .mark_related_read(user_id, notification_type, related_id))
                },
            )
            .await
    }

    /// Removed from both stores when both hold it
    pub async fn delete(
        &self,
        user_id: &EntityId,
        notification_id: &EntityId,
    ) -> MarketplaceResult<DeletionOutcome> {
        delete_everywhere(
            &self.router,
            "delete_notification",
            notification_id,
            &[user_id],
            |db| async move { db.delete_notification(user_id, notification_id).await },
            |store| store.notifications.remove(user_id, notification_id).is_some(),
        )
        .await
    }
}
