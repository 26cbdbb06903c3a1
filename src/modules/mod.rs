pub mod relationship {
    pub mod error;
    pub mod handle;
    pub mod machine;
    pub mod model;
    pub mod projection;
    pub mod repository;
    pub mod repository_pg;
    pub mod route;
    pub mod schema;
    pub mod service;
}

pub mod user {
    pub mod repository;
    pub mod repository_cached;
    pub mod repository_pg;
    pub mod schema;
}
