use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(type_name = "relationship_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipStatus {
    Pending,
    Friends,
    Rejected,
    Cancelled,
    Unfriended,
    /// The requester blocked the requestee.
    FstBlockedSnd,
    /// The requestee blocked the requester.
    SndBlockedFst,
    MutualBlock,
}

impl RelationshipStatus {
    pub const RETRYABLE: [RelationshipStatus; 3] = [
        RelationshipStatus::Rejected,
        RelationshipStatus::Cancelled,
        RelationshipStatus::Unfriended,
    ];

    /// A fresh request may take over a record in this status.
    pub fn is_retryable(self) -> bool {
        Self::RETRYABLE.contains(&self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RelationshipStatus::Pending => "PENDING",
            RelationshipStatus::Friends => "FRIENDS",
            RelationshipStatus::Rejected => "REJECTED",
            RelationshipStatus::Cancelled => "CANCELLED",
            RelationshipStatus::Unfriended => "UNFRIENDED",
            RelationshipStatus::FstBlockedSnd => "FST_BLOCKED_SND",
            RelationshipStatus::SndBlockedFst => "SND_BLOCKED_FST",
            RelationshipStatus::MutualBlock => "MUTUAL_BLOCK",
        }
    }
}

impl fmt::Display for RelationshipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller intent submitted against an existing record. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipAction {
    Accept,
    Reject,
    Cancel,
    Unfriend,
    Block,
    Unblock,
}

impl fmt::Display for RelationshipAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelationshipAction::Accept => "ACCEPT",
            RelationshipAction::Reject => "REJECT",
            RelationshipAction::Cancel => "CANCEL",
            RelationshipAction::Unfriend => "UNFRIEND",
            RelationshipAction::Block => "BLOCK",
            RelationshipAction::Unblock => "UNBLOCK",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipEntity {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub requestee_id: Uuid,
    pub status: RelationshipStatus,
    #[serde(skip)]
    pub version: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
impl RelationshipEntity {
    pub fn involves(&self, user_id: &Uuid) -> bool {
        self.requester_id == *user_id || self.requestee_id == *user_id
    }

    pub fn counterpart_of(&self, user_id: &Uuid) -> Uuid {
        if self.requester_id == *user_id { self.requestee_id } else { self.requester_id }
    }
}

/// Column values written by a create or a transition. Timestamps and version are owned by the
/// store.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipWrite {
    pub requester_id: Uuid,
    pub requestee_id: Uuid,
    pub status: RelationshipStatus,
}
