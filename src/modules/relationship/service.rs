use log::{info, warn};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    constants::{MAX_WRITE_ATTEMPTS, SEARCH_LIMIT},
    modules::{
        relationship::{
            error::RelationshipError,
            machine::{self, ActingRole},
            model::{
                CounterpartLookup, PublicUserProfile, RelatedUserProfile, RelatedView,
                RelationshipProjection, RequestsOverview,
            },
            projection,
            repository::RelationshipRepository,
            schema::{RelationshipAction, RelationshipEntity, RelationshipStatus, RelationshipWrite},
        },
        user::{repository::UserRepository, schema::UserEntity},
    },
};

#[derive(Clone)]
pub struct RelationshipService<R, U>
where
    R: RelationshipRepository + Send + Sync,
    U: UserRepository + Send + Sync,
{
    relationship_repo: Arc<R>,
    user_repo: Arc<U>,
}

impl<R, U> RelationshipService<R, U>
where
    R: RelationshipRepository + Send + Sync,
    U: UserRepository + Send + Sync,
{
    pub fn with_dependencies(relationship_repo: Arc<R>, user_repo: Arc<U>) -> Self {
        info!("RelationshipService initialized with dependencies");
        RelationshipService { relationship_repo, user_repo }
    }

    /// Opens a PENDING request from `requester_id`, reusing the pair's record when it is retryable.
    pub async fn create_request(
        &self,
        requester_id: Uuid,
        requestee_id: Uuid,
    ) -> Result<RelationshipEntity, RelationshipError> {
        if requester_id == requestee_id {
            return Err(RelationshipError::SelfRelationship);
        }
        self.require_user(&requestee_id).await?;

        let request = RelationshipWrite {
            requester_id,
            requestee_id,
            status: RelationshipStatus::Pending,
        };

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let existing =
                self.relationship_repo.find_by_unordered_pair(&requester_id, &requestee_id).await?;

            if let Some(existing) = &existing {
                if !machine::can_open(Some(existing.status)) {
                    return Err(RelationshipError::AlreadyExists(existing.status));
                }
            }

            if let Some(created) = self.claim_slot(existing.as_ref(), &request).await? {
                info!("User {} requested a relationship with {}", requester_id, requestee_id);
                return Ok(created);
            }
            warn!(
                "Relationship slot for {} and {} changed underneath (attempt {attempt})",
                requester_id, requestee_id
            );
        }

        Err(RelationshipError::ConcurrentModification)
    }

    pub async fn apply_action(
        &self,
        acting_user_id: Uuid,
        relationship_id: Uuid,
        action: RelationshipAction,
    ) -> Result<RelationshipEntity, RelationshipError> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let current = self
                .relationship_repo
                .find_by_id(&relationship_id)
                .await?
                .ok_or(RelationshipError::NotFound("Relationship"))?;

            if let Some(updated) = self.transition(&acting_user_id, &current, action).await? {
                info!(
                    "User {} applied {} to relationship {}: {} -> {}",
                    acting_user_id, action, relationship_id, current.status, updated.status
                );
                return Ok(updated);
            }
            warn!("Stale write on relationship {} (attempt {attempt})", relationship_id);
        }

        Err(RelationshipError::ConcurrentModification)
    }

    /// Blocks `target_id` whether or not the pair has a record yet.
    pub async fn block_user(
        &self,
        blocker_id: Uuid,
        target_id: Uuid,
    ) -> Result<RelationshipEntity, RelationshipError> {
        if blocker_id == target_id {
            return Err(RelationshipError::SelfRelationship);
        }
        self.require_user(&target_id).await?;

        // a fresh slot is a request from the blocker that is blocked straight away
        let status = machine::transition(
            RelationshipStatus::Pending,
            ActingRole::Requester,
            RelationshipAction::Block,
        )?;
        let fresh = RelationshipWrite { requester_id: blocker_id, requestee_id: target_id, status };

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let existing =
                self.relationship_repo.find_by_unordered_pair(&blocker_id, &target_id).await?;

            let written = match &existing {
                Some(current) if !current.status.is_retryable() => {
                    self.transition(&blocker_id, current, RelationshipAction::Block).await?
                }
                _ => self.claim_slot(existing.as_ref(), &fresh).await?,
            };

            if let Some(blocked) = written {
                info!("User {} blocked {} ({})", blocker_id, target_id, blocked.status);
                return Ok(blocked);
            }
            warn!(
                "Relationship slot for {} and {} changed underneath (attempt {attempt})",
                blocker_id, target_id
            );
        }

        Err(RelationshipError::ConcurrentModification)
    }

    pub async fn list_relationships(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<RelationshipProjection>, RelationshipError> {
        Ok(self.relationship_repo.list_visible_for_user(&user_id).await?)
    }

    pub async fn list_related(
        &self,
        user_id: Uuid,
        view: RelatedView,
    ) -> Result<Vec<RelatedUserProfile>, RelationshipError> {
        Ok(self.relationship_repo.list_related(&user_id, view).await?)
    }

    pub async fn get_requests(&self, user_id: Uuid) -> Result<RequestsOverview, RelationshipError> {
        let (sent, received) = tokio::try_join!(
            self.relationship_repo.list_related(&user_id, RelatedView::SentRequests),
            self.relationship_repo.list_related(&user_id, RelatedView::ReceivedRequests),
        )?;

        Ok(RequestsOverview { sent, received })
    }

    /// Looks a counterpart up by email. A counterpart who blocked the caller is reported as
    /// missing, exactly like an unknown address.
    pub async fn find_by_counterpart_email(
        &self,
        user_id: Uuid,
        email: &str,
    ) -> Result<CounterpartLookup, RelationshipError> {
        let counterpart = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(RelationshipError::NotFound("User"))?;

        if counterpart.id == user_id {
            return Err(RelationshipError::SelfRelationship);
        }

        let existing =
            self.relationship_repo.find_by_unordered_pair(&user_id, &counterpart.id).await?;
        let status = projection::relative_status(&user_id, existing.as_ref())
            .ok_or(RelationshipError::NotFound("User"))?;

        Ok(CounterpartLookup {
            user_id: counterpart.id,
            username: counterpart.username,
            avatar_url: counterpart.avatar_url,
            relationship_id: existing.as_ref().map(|r| r.id),
            status,
            can_request: machine::can_open(existing.map(|r| r.status)),
        })
    }

    pub async fn search_candidates(
        &self,
        user_id: Uuid,
        username: &str,
    ) -> Result<Vec<PublicUserProfile>, RelationshipError> {
        Ok(self
            .relationship_repo
            .find_new_friend_candidates(&user_id, username, SEARCH_LIMIT)
            .await?)
    }

    pub async fn search_friends(
        &self,
        user_id: Uuid,
        username: &str,
    ) -> Result<Vec<RelatedUserProfile>, RelationshipError> {
        Ok(self.relationship_repo.search_friends(&user_id, username, SEARCH_LIMIT).await?)
    }

    /// Gate for card suggestions: only friends may suggest cards to each other.
    pub async fn can_suggest_to(
        &self,
        user_id: Uuid,
        counterpart_id: Uuid,
    ) -> Result<bool, RelationshipError> {
        if user_id == counterpart_id {
            return Ok(false);
        }
        let relationship =
            self.relationship_repo.find_by_unordered_pair(&user_id, &counterpart_id).await?;

        Ok(relationship.is_some_and(|r| r.status == RelationshipStatus::Friends))
    }

    async fn require_user(&self, user_id: &Uuid) -> Result<UserEntity, RelationshipError> {
        self.user_repo.find_by_id(user_id).await?.ok_or(RelationshipError::NotFound("User"))
    }

    /// Runs the state machine for `acting_user_id` and writes the result. `Ok(None)` on a stale
    /// read.
    async fn transition(
        &self,
        acting_user_id: &Uuid,
        current: &RelationshipEntity,
        action: RelationshipAction,
    ) -> Result<Option<RelationshipEntity>, RelationshipError> {
        let role = ActingRole::of(acting_user_id, current).ok_or(RelationshipError::Forbidden)?;
        let status = machine::transition(current.status, role, action)?;

        let write = RelationshipWrite {
            requester_id: current.requester_id,
            requestee_id: current.requestee_id,
            status,
        };
        Ok(self.relationship_repo.update(&current.id, current.version, &write).await?)
    }

    /// Inserts `write` into an empty slot or takes over a retryable record, making the caller the
    /// requester. `Ok(None)` when another writer got there first.
    async fn claim_slot(
        &self,
        existing: Option<&RelationshipEntity>,
        write: &RelationshipWrite,
    ) -> Result<Option<RelationshipEntity>, RelationshipError> {
        match existing {
            Some(current) => {
                Ok(self.relationship_repo.update(&current.id, current.version, write).await?)
            }
            None => match self.relationship_repo.insert(write).await {
                Ok(created) => Ok(Some(created)),
                Err(e) if e.is_conflict() => Ok(None),
                Err(e) => Err(e.into()),
            },
        }
    }
}
