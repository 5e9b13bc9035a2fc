//! Conversation quota enforcement and exhaustion notifications
//!
//! Quotas live on the owner's subscription row: `current_usage` against
//! `conversation_limit`. Owners without a subscription row are not limited.

use std::fmt;
use std::sync::Arc;

use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tracing::{info, warn};
use uuid::Uuid;

use renva_email::OutboundMailService;
use renva_entities::{subscriptions, team_members, users};

use crate::errors::InboxError;

/// Resolved owner of an inbox alias: a user or a team, never both
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadOwner {
    User(Uuid),
    Team(Uuid),
}

impl fmt::Display for ThreadOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadOwner::User(id) => write!(f, "user {}", id),
            ThreadOwner::Team(id) => write!(f, "team {}", id),
        }
    }
}

impl ThreadOwner {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            ThreadOwner::User(id) => Some(*id),
            ThreadOwner::Team(_) => None,
        }
    }

    pub fn team_id(&self) -> Option<Uuid> {
        match self {
            ThreadOwner::Team(id) => Some(*id),
            ThreadOwner::User(_) => None,
        }
    }
}

/// Result of a quota check
#[derive(Debug, Clone, Copy)]
pub struct QuotaStatus {
    pub limit_reached: bool,
}

const LIMIT_NOTIFICATION_SUBJECT: &str = "Renva: Inbox conversation limit reached";

const LIMIT_NOTIFICATION_BODY: &str = "Your Renva subscription plan's inbox conversation limit has been reached.\n\n\
You will not be able to start new conversations until you upgrade your plan.\n\n\
If you have questions, please contact support.";

/// Service for quota checks, usage accounting, and owner notifications
pub struct UsageService {
    db: Arc<DatabaseConnection>,
    mail: Arc<OutboundMailService>,
}

impl UsageService {
    pub fn new(db: Arc<DatabaseConnection>, mail: Arc<OutboundMailService>) -> Self {
        Self { db, mail }
    }

    /// Read-only quota check for the owner's active subscription
    pub async fn check(&self, owner: &ThreadOwner) -> Result<QuotaStatus, InboxError> {
        let subscription = self.find_subscription(owner).await?;

        let limit_reached = subscription
            .map(|s| s.current_usage >= s.conversation_limit)
            .unwrap_or(false);

        Ok(QuotaStatus { limit_reached })
    }

    /// Count a newly-started conversation against the owner's subscription
    pub async fn record_conversation(&self, owner: &ThreadOwner) -> Result<(), InboxError> {
        let update = subscriptions::Entity::update_many()
            .col_expr(
                subscriptions::Column::CurrentUsage,
                Expr::col(subscriptions::Column::CurrentUsage).add(1),
            )
            .filter(subscriptions::Column::Status.eq("active"));

        let update = match owner {
            ThreadOwner::User(id) => update.filter(subscriptions::Column::UserId.eq(*id)),
            ThreadOwner::Team(id) => update.filter(subscriptions::Column::TeamId.eq(*id)),
        };

        update.exec(self.db.as_ref()).await?;
        Ok(())
    }

    /// Notify every registered owner address that the quota is exhausted.
    ///
    /// One email per address per occurrence; individual send failures are
    /// logged and do not stop the remaining notifications.
    pub async fn notify_limit_reached(&self, owner: &ThreadOwner) -> Result<(), InboxError> {
        let recipients = self.owner_emails(owner).await?;

        if recipients.is_empty() {
            warn!("Quota exhausted for {} but no notification address found", owner);
            return Ok(());
        }

        for email in &recipients {
            if let Err(e) = self
                .mail
                .send_notification(email, LIMIT_NOTIFICATION_SUBJECT, LIMIT_NOTIFICATION_BODY)
                .await
            {
                warn!("Failed to send limit notification to {}: {}", email, e);
            }
        }

        info!(
            "Notified {} owner address(es) of quota exhaustion for {}",
            recipients.len(),
            owner
        );
        Ok(())
    }

    async fn find_subscription(
        &self,
        owner: &ThreadOwner,
    ) -> Result<Option<subscriptions::Model>, InboxError> {
        let query =
            subscriptions::Entity::find().filter(subscriptions::Column::Status.eq("active"));

        let query = match owner {
            ThreadOwner::User(id) => query.filter(subscriptions::Column::UserId.eq(*id)),
            ThreadOwner::Team(id) => query.filter(subscriptions::Column::TeamId.eq(*id)),
        };

        Ok(query.one(self.db.as_ref()).await?)
    }

    /// The user's own email, or every team member's email
    async fn owner_emails(&self, owner: &ThreadOwner) -> Result<Vec<String>, InboxError> {
        match owner {
            ThreadOwner::User(id) => {
                let user = users::Entity::find_by_id(*id).one(self.db.as_ref()).await?;
                Ok(user.map(|u| u.email).into_iter().collect())
            }
            ThreadOwner::Team(id) => {
                let members = team_members::Entity::find()
                    .filter(team_members::Column::TeamId.eq(*id))
                    .all(self.db.as_ref())
                    .await?;

                let user_ids: Vec<Uuid> = members.iter().map(|m| m.user_id).collect();
                if user_ids.is_empty() {
                    return Ok(vec![]);
                }

                let members = users::Entity::find()
                    .filter(users::Column::Id.is_in(user_ids))
                    .all(self.db.as_ref())
                    .await?;

                Ok(members.into_iter().map(|u| u.email).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_owner_accessors() {
        let user_id = Uuid::new_v4();
        let owner = ThreadOwner::User(user_id);
        assert_eq!(owner.user_id(), Some(user_id));
        assert_eq!(owner.team_id(), None);

        let team_id = Uuid::new_v4();
        let owner = ThreadOwner::Team(team_id);
        assert_eq!(owner.team_id(), Some(team_id));
        assert_eq!(owner.user_id(), None);
    }
}
