use actix_cors::Cors;
use actix_web::{
    self, App, HttpServer,
    http::header,
    middleware::{Logger, from_fn},
    web,
};
use std::sync::{Arc, LazyLock};

use crate::{
    configs::{RedisCache, connect_database},
    middlewares::{authentication, authorization},
    modules::{
        relationship::{repository_pg::RelationshipRepositoryPg, service::RelationshipService},
        user::{
            repository_cached::CachedUserRepository, repository_pg::UserRepositoryPg,
            schema::UserRole,
        },
    },
};

mod api;
mod configs;
mod constants;
mod middlewares;
mod modules;
#[cfg(test)]
mod test;
mod utils;

pub static ENV: LazyLock<constants::Env> = LazyLock::new(|| {
    dotenvy::dotenv().ok();
    env_logger::init();
    log::info!("Environment variables loaded from .env file");
    constants::Env::default()
});

#[actix_web::get("/")]
async fn health_check(db_pool: web::Data<sqlx::PgPool>) -> &'static str {
    match sqlx::query("SELECT 1").execute(db_pool.get_ref()).await {
        Ok(_) => "Server is running",
        Err(e) => {
            log::error!("Health check failed: {e}");
            "Database unavailable"
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let db_pool =
        connect_database().await.map_err(|_| std::io::Error::other("Database connection error"))?;

    let redis_pool =
        RedisCache::new().await.map_err(|_| std::io::Error::other("Redis connection error"))?;

    let user_repo =
        CachedUserRepository::new(UserRepositoryPg::new(db_pool.clone()), Arc::new(redis_pool));
    let relationship_repo = RelationshipRepositoryPg::new(db_pool.clone());

    let relationship_service =
        RelationshipService::with_dependencies(Arc::new(relationship_repo), Arc::new(user_repo));

    log::info!("Starting server at http://{}:{}", ENV.ip.as_str(), ENV.port);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(ENV.frontend_url.as_str())
            .allowed_methods(vec!["GET", "POST", "PATCH"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(web::Data::new(relationship_service.clone()))
            .app_data(web::Data::new(db_pool.clone()))
            .service(health_check)
            .service(
                web::scope("/api").service(
                    web::scope("")
                        .wrap(from_fn(authorization(vec![UserRole::User])))
                        .wrap(from_fn(authentication))
                        .configure(modules::relationship::route::configure),
                ),
            )
    })
    .bind((ENV.ip.as_str(), ENV.port))?
    .workers(2)
    .run()
    .await
}
