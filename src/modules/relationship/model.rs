use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::modules::relationship::schema::{RelationshipAction, RelationshipStatus};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRelationshipBody {
    pub counterpart_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RelationshipActionBody {
    pub action: RelationshipAction,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EmailQuery {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UsernameQuery {
    #[validate(length(min = 2, max = 32, message = "Username query must be 2 to 32 characters"))]
    pub username: String,
}

/// A relationship as seen by one of its parties.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipProjection {
    pub relationship_id: Uuid,
    pub counterpart_id: Uuid,
    pub status: RelationshipStatus,
    pub is_requester: bool,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RelatedUserProfile {
    pub user_id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
    pub relationship_id: Uuid,
    pub status: RelationshipStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PublicUserProfile {
    pub user_id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelatedView {
    Friends,
    SentRequests,
    ReceivedRequests,
    /// Counterparts the viewer is blocking, alone or mutually.
    Blocked,
}

/// Viewer-relative reading of a pair's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelativeStatus {
    Stranger,
    Friends,
    PendingOutgoing,
    PendingIncoming,
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterpartLookup {
    pub user_id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
    pub relationship_id: Option<Uuid>,
    pub status: RelativeStatus,
    pub can_request: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestsOverview {
    pub sent: Vec<RelatedUserProfile>,
    pub received: Vec<RelatedUserProfile>,
}
