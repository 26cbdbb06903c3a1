use uuid::Uuid;

use crate::api::error;
use crate::modules::relationship::model::{
    PublicUserProfile, RelatedUserProfile, RelatedView, RelationshipProjection,
};
use crate::modules::relationship::schema::{RelationshipEntity, RelationshipWrite};

#[async_trait::async_trait]
pub trait RelationshipRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<RelationshipEntity>, error::SystemError>;

    /// The single record for `{user_a, user_b}`, whichever of them is the requester.
    async fn find_by_unordered_pair(
        &self,
        user_a: &Uuid,
        user_b: &Uuid,
    ) -> Result<Option<RelationshipEntity>, error::SystemError>;

    /// Fails with `SystemError::Conflict` when the pair already has a record.
    async fn insert(
        &self,
        relationship: &RelationshipWrite,
    ) -> Result<RelationshipEntity, error::SystemError>;

    /// Compare-and-set on `version`. `Ok(None)` means the record changed since it was read.
    async fn update(
        &self,
        id: &Uuid,
        expected_version: i64,
        relationship: &RelationshipWrite,
    ) -> Result<Option<RelationshipEntity>, error::SystemError>;

    async fn list_visible_for_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<RelationshipProjection>, error::SystemError>;

    async fn list_related(
        &self,
        user_id: &Uuid,
        view: RelatedView,
    ) -> Result<Vec<RelatedUserProfile>, error::SystemError>;

    /// Users matching `username` with no active relationship to `user_id`.
    async fn find_new_friend_candidates(
        &self,
        user_id: &Uuid,
        username: &str,
        limit: i32,
    ) -> Result<Vec<PublicUserProfile>, error::SystemError>;

    async fn search_friends(
        &self,
        user_id: &Uuid,
        username: &str,
        limit: i32,
    ) -> Result<Vec<RelatedUserProfile>, error::SystemError>;
}
