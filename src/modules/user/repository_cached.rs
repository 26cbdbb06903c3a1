use log::{debug, warn};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    api::error,
    configs::RedisCache,
    constants::USER_CACHE_TTL_SECS,
    modules::user::{repository::UserRepository, schema::UserEntity},
};

/// A cached entry for a soft-deleted user resolves to no user, like the database filter does.
#[derive(Debug, PartialEq)]
enum CacheLookup {
    Miss,
    Live(UserEntity),
    Deleted,
}

impl From<Option<UserEntity>> for CacheLookup {
    fn from(hit: Option<UserEntity>) -> Self {
        match hit {
            None => CacheLookup::Miss,
            Some(user) if user.deleted_at.is_some() => CacheLookup::Deleted,
            Some(user) => CacheLookup::Live(user),
        }
    }
}

/// Read-through Redis cache in front of another directory. Cache failures degrade to the inner
/// repository instead of failing the lookup.
#[derive(Clone)]
pub struct CachedUserRepository<U>
where
    U: UserRepository + Send + Sync,
{
    inner: U,
    cache: Arc<RedisCache>,
}

impl<U> CachedUserRepository<U>
where
    U: UserRepository + Send + Sync,
{
    pub fn new(inner: U, cache: Arc<RedisCache>) -> Self {
        CachedUserRepository { inner, cache }
    }

    async fn cached(&self, key: &str) -> CacheLookup {
        match self.cache.get::<UserEntity>(key).await {
            Ok(hit) => CacheLookup::from(hit),
            Err(e) => {
                warn!("User cache read failed for {key}: {e}");
                CacheLookup::Miss
            }
        }
    }

    async fn remember(&self, user: &UserEntity) {
        if user.deleted_at.is_some() {
            return;
        }
        let keys = [
            format!("user:{}", user.id),
            format!("user:email:{}", user.email.to_lowercase()),
        ];
        for key in keys {
            if let Err(e) = self.cache.set(&key, user, USER_CACHE_TTL_SECS).await {
                warn!("User cache write failed for {key}: {e}");
            }
        }
    }
}

#[async_trait::async_trait]
impl<U> UserRepository for CachedUserRepository<U>
where
    U: UserRepository + Send + Sync,
{
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError> {
        match self.cached(&format!("user:{id}")).await {
            CacheLookup::Live(user) => {
                debug!("User {} found in cache", id);
                return Ok(Some(user));
            }
            CacheLookup::Deleted => return Ok(None),
            CacheLookup::Miss => {}
        }
        let user = self.inner.find_by_id(id).await?;
        if let Some(user) = &user {
            self.remember(user).await;
        }
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, error::SystemError> {
        let key = format!("user:email:{}", email.to_lowercase());
        match self.cached(&key).await {
            CacheLookup::Live(user) => {
                debug!("User with email {} found in cache", email);
                return Ok(Some(user));
            }
            CacheLookup::Deleted => return Ok(None),
            CacheLookup::Miss => {}
        }
        let user = self.inner.find_by_email(email).await?;
        if let Some(user) = &user {
            self.remember(user).await;
        }
        Ok(user)
    }
}
