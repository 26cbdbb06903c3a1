use crate::modules::relationship::handle::*;
use actix_web::web::{ServiceConfig, scope};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/relationships")
            .service(list_relationships)
            .service(create_request)
            .service(find_by_email)
            .service(search_users)
            .service(search_friends)
            .service(list_friends)
            .service(list_blocked)
            .service(list_requests)
            .service(block_user)
            .service(can_suggest_to)
            .service(apply_action),
    );
}
