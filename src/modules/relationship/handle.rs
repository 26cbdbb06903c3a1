use actix_web::{get, patch, post, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::{
        relationship::{
            model::{
                CounterpartLookup, CreateRelationshipBody, EmailQuery, PublicUserProfile,
                RelatedUserProfile, RelatedView, RelationshipActionBody, RelationshipProjection,
                RequestsOverview, UsernameQuery,
            },
            repository_pg::RelationshipRepositoryPg,
            schema::RelationshipEntity,
            service::RelationshipService,
        },
        user::{repository_cached::CachedUserRepository, repository_pg::UserRepositoryPg},
    },
    utils::{ValidatedJson, ValidatedQuery},
};

pub type RelationshipSvc =
    RelationshipService<RelationshipRepositoryPg, CachedUserRepository<UserRepositoryPg>>;

#[get("")]
pub async fn list_relationships(
    relationship_service: web::Data<RelationshipSvc>,
    req: HttpRequest,
) -> Result<success::Success<Vec<RelationshipProjection>>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let relationships = relationship_service.list_relationships(user_id).await?;

    Ok(success::Success::ok(Some(relationships)).message("Relationships retrieved successfully"))
}

#[post("")]
pub async fn create_request(
    relationship_service: web::Data<RelationshipSvc>,
    body: ValidatedJson<CreateRelationshipBody>,
    req: HttpRequest,
) -> Result<success::Success<RelationshipEntity>, error::Error> {
    let requester_id = get_claims(&req)?.sub;
    let relationship =
        relationship_service.create_request(requester_id, body.0.counterpart_id).await?;

    Ok(success::Success::created(Some(relationship)).message("Friendship request sent"))
}

#[patch("/{relationship_id}")]
pub async fn apply_action(
    relationship_service: web::Data<RelationshipSvc>,
    relationship_id: web::Path<Uuid>,
    body: ValidatedJson<RelationshipActionBody>,
    req: HttpRequest,
) -> Result<success::Success<RelationshipEntity>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let relationship =
        relationship_service.apply_action(user_id, *relationship_id, body.0.action).await?;

    Ok(success::Success::ok(Some(relationship)).message("Relationship updated successfully"))
}

#[post("/block/{user_id}")]
pub async fn block_user(
    relationship_service: web::Data<RelationshipSvc>,
    target_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<RelationshipEntity>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let relationship = relationship_service.block_user(user_id, *target_id).await?;

    Ok(success::Success::ok(Some(relationship)).message("User blocked"))
}

#[get("/search")]
pub async fn find_by_email(
    relationship_service: web::Data<RelationshipSvc>,
    query: ValidatedQuery<EmailQuery>,
    req: HttpRequest,
) -> Result<success::Success<CounterpartLookup>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let found = relationship_service.find_by_counterpart_email(user_id, &query.0.email).await?;

    Ok(success::Success::ok(Some(found)))
}

#[get("/search/users")]
pub async fn search_users(
    relationship_service: web::Data<RelationshipSvc>,
    query: ValidatedQuery<UsernameQuery>,
    req: HttpRequest,
) -> Result<success::Success<Vec<PublicUserProfile>>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let users = relationship_service.search_candidates(user_id, &query.0.username).await?;

    Ok(success::Success::ok(Some(users)))
}

#[get("/search/friends")]
pub async fn search_friends(
    relationship_service: web::Data<RelationshipSvc>,
    query: ValidatedQuery<UsernameQuery>,
    req: HttpRequest,
) -> Result<success::Success<Vec<RelatedUserProfile>>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let friends = relationship_service.search_friends(user_id, &query.0.username).await?;

    Ok(success::Success::ok(Some(friends)))
}

#[get("/friends")]
pub async fn list_friends(
    relationship_service: web::Data<RelationshipSvc>,
    req: HttpRequest,
) -> Result<success::Success<Vec<RelatedUserProfile>>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let friends = relationship_service.list_related(user_id, RelatedView::Friends).await?;

    Ok(success::Success::ok(Some(friends)).message("Friends retrieved successfully"))
}

#[get("/blocked")]
pub async fn list_blocked(
    relationship_service: web::Data<RelationshipSvc>,
    req: HttpRequest,
) -> Result<success::Success<Vec<RelatedUserProfile>>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let blocked = relationship_service.list_related(user_id, RelatedView::Blocked).await?;

    Ok(success::Success::ok(Some(blocked)).message("Blocked users retrieved successfully"))
}

#[get("/requests")]
pub async fn list_requests(
    relationship_service: web::Data<RelationshipSvc>,
    req: HttpRequest,
) -> Result<success::Success<RequestsOverview>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let requests = relationship_service.get_requests(user_id).await?;

    Ok(success::Success::ok(Some(requests)).message("Friendship requests retrieved successfully"))
}

#[get("/can-suggest/{user_id}")]
pub async fn can_suggest_to(
    relationship_service: web::Data<RelationshipSvc>,
    counterpart_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<bool>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let allowed = relationship_service.can_suggest_to(user_id, *counterpart_id).await?;

    Ok(success::Success::ok(Some(allowed)))
}
