//! Viewer-relative projections of relationship records.
//!
//! A party that has been blocked one-sidedly must not be able to tell the pair apart from one
//! with no record at all. `repository_pg` applies the listing predicates in SQL so the hidden rows
//! never leave the database. `project`, `project_all` and `in_view` restate them for the in-memory
//! store, and the Postgres tests check both agree.

use uuid::Uuid;

use crate::modules::relationship::{
    machine,
    model::RelativeStatus,
    schema::{RelationshipEntity, RelationshipStatus},
};
#[cfg(test)]
use crate::modules::relationship::model::{RelatedView, RelationshipProjection};

/// True when the counterpart blocked `viewer` one-sidedly.
pub fn is_hidden_from(viewer: &Uuid, relationship: &RelationshipEntity) -> bool {
    matches!(machine::denier(relationship), Some(denier) if denier != *viewer)
}

#[cfg(test)]
pub fn project(viewer: &Uuid, relationship: &RelationshipEntity) -> Option<RelationshipProjection> {
    if !relationship.involves(viewer) || is_hidden_from(viewer, relationship) {
        return None;
    }

    Some(RelationshipProjection {
        relationship_id: relationship.id,
        counterpart_id: relationship.counterpart_of(viewer),
        status: relationship.status,
        is_requester: relationship.requester_id == *viewer,
        updated_at: relationship.updated_at,
    })
}

/// Visible projections, most recently changed first.
#[cfg(test)]
pub fn project_all<'a, I>(viewer: &Uuid, relationships: I) -> Vec<RelationshipProjection>
where
    I: IntoIterator<Item = &'a RelationshipEntity>,
{
    let mut visible: Vec<_> =
        relationships.into_iter().filter_map(|r| project(viewer, r)).collect();
    visible.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    visible
}

/// `None` means the viewer is blocked by the counterpart and must see nothing.
pub fn relative_status(
    viewer: &Uuid,
    relationship: Option<&RelationshipEntity>,
) -> Option<RelativeStatus> {
    let Some(relationship) = relationship else {
        return Some(RelativeStatus::Stranger);
    };
    if is_hidden_from(viewer, relationship) {
        return None;
    }

    let is_requester = relationship.requester_id == *viewer;
    let status = match relationship.status {
        RelationshipStatus::Friends => RelativeStatus::Friends,
        RelationshipStatus::Pending if is_requester => RelativeStatus::PendingOutgoing,
        RelationshipStatus::Pending => RelativeStatus::PendingIncoming,
        RelationshipStatus::FstBlockedSnd
        | RelationshipStatus::SndBlockedFst
        | RelationshipStatus::MutualBlock => RelativeStatus::Blocked,
        RelationshipStatus::Rejected
        | RelationshipStatus::Cancelled
        | RelationshipStatus::Unfriended => RelativeStatus::Stranger,
    };
    Some(status)
}

#[cfg(test)]
pub fn in_view(viewer: &Uuid, relationship: &RelationshipEntity, view: RelatedView) -> bool {
    if !relationship.involves(viewer) {
        return false;
    }
    let is_requester = relationship.requester_id == *viewer;

    match view {
        RelatedView::Friends => relationship.status == RelationshipStatus::Friends,
        RelatedView::SentRequests => {
            relationship.status == RelationshipStatus::Pending && is_requester
        }
        RelatedView::ReceivedRequests => {
            relationship.status == RelationshipStatus::Pending && !is_requester
        }
        RelatedView::Blocked => {
            relationship.status == RelationshipStatus::MutualBlock
                || machine::denier(relationship) == Some(*viewer)
        }
    }
}
