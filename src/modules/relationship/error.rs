use crate::{
    api::error,
    modules::relationship::{machine::IllegalTransition, schema::RelationshipStatus},
};

#[derive(Debug, thiserror::Error)]
pub enum RelationshipError {
    #[error("Cannot create a relationship with yourself")]
    SelfRelationship,
    #[error("Couldn't create or re-establish relationship (current status: {0})")]
    AlreadyExists(RelationshipStatus),
    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),
    #[error("User is not part of this relationship")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Relationship was modified concurrently, please retry")]
    ConcurrentModification,
    #[error(transparent)]
    Store(#[from] error::SystemError),
}

impl From<RelationshipError> for error::Error {
    fn from(value: RelationshipError) -> Self {
        match value {
            RelationshipError::SelfRelationship => error::Error::bad_request(value.to_string()),
            RelationshipError::AlreadyExists(_)
            | RelationshipError::IllegalTransition(_)
            | RelationshipError::ConcurrentModification => {
                error::Error::conflict(value.to_string())
            }
            RelationshipError::Forbidden => error::Error::forbidden(value.to_string()),
            RelationshipError::NotFound(_) => error::Error::not_found(value.to_string()),
            RelationshipError::Store(e) => e.into(),
        }
    }
}
