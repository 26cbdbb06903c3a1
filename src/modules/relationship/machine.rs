use std::fmt;
use uuid::Uuid;

use crate::modules::relationship::schema::{
    RelationshipAction, RelationshipEntity, RelationshipStatus,
};

/// Which side of the stored record the acting user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActingRole {
    Requester,
    Requestee,
}

impl ActingRole {
    /// `None` when the user is not a party to the relationship.
    pub fn of(user_id: &Uuid, relationship: &RelationshipEntity) -> Option<Self> {
        if relationship.requester_id == *user_id {
            Some(ActingRole::Requester)
        } else if relationship.requestee_id == *user_id {
            Some(ActingRole::Requestee)
        } else {
            None
        }
    }

    fn other(self) -> Self {
        match self {
            ActingRole::Requester => ActingRole::Requestee,
            ActingRole::Requestee => ActingRole::Requester,
        }
    }
}

impl fmt::Display for ActingRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActingRole::Requester => f.write_str("requester"),
            ActingRole::Requestee => f.write_str("requestee"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Cannot {action} a relationship with status {from} as the {role}")]
pub struct IllegalTransition {
    pub from: RelationshipStatus,
    pub action: RelationshipAction,
    pub role: ActingRole,
}

/// Computes the status that results from `role` performing `action` on a record in `from`.
///
/// This is the only place statuses of existing records change. Anything not matched below is
/// rejected, including re-blocking by the current denier and any action on a retryable record
/// (those are reopened through a new request instead).
pub fn transition(
    from: RelationshipStatus,
    role: ActingRole,
    action: RelationshipAction,
) -> Result<RelationshipStatus, IllegalTransition> {
    use ActingRole::{Requestee, Requester};
    use RelationshipAction::*;
    use RelationshipStatus::*;

    let next = match (from, action, role) {
        (Pending, Accept, Requestee) => Friends,
        (Pending, Reject, Requestee) => Rejected,
        (Pending, Cancel, Requester) => Cancelled,
        (Pending | Friends, Block, blocker) => blocked_by(blocker),
        (Friends, Unfriend, _) => Unfriended,

        // the blocked side blocks back
        (FstBlockedSnd, Block, Requestee) | (SndBlockedFst, Block, Requester) => MutualBlock,

        // only the denier can lift a one-sided block
        (FstBlockedSnd, Unblock, Requester) | (SndBlockedFst, Unblock, Requestee) => Cancelled,

        // lifting one side of a mutual block leaves the other side's block in place
        (MutualBlock, Unblock, unblocker) => blocked_by(unblocker.other()),

        _ => return Err(IllegalTransition { from, action, role }),
    };

    Ok(next)
}

fn blocked_by(blocker: ActingRole) -> RelationshipStatus {
    match blocker {
        ActingRole::Requester => RelationshipStatus::FstBlockedSnd,
        ActingRole::Requestee => RelationshipStatus::SndBlockedFst,
    }
}

/// Whether a new request may be opened given the current record for the pair, if any.
pub fn can_open(existing: Option<RelationshipStatus>) -> bool {
    existing.map_or(true, RelationshipStatus::is_retryable)
}

/// Side that imposed a one-sided block. Mutual blocks have no single denier.
pub fn denier_role(status: RelationshipStatus) -> Option<ActingRole> {
    match status {
        RelationshipStatus::FstBlockedSnd => Some(ActingRole::Requester),
        RelationshipStatus::SndBlockedFst => Some(ActingRole::Requestee),
        _ => None,
    }
}

pub fn denier(relationship: &RelationshipEntity) -> Option<Uuid> {
    denier_role(relationship.status).map(|role| match role {
        ActingRole::Requester => relationship.requester_id,
        ActingRole::Requestee => relationship.requestee_id,
    })
}
