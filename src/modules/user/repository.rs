use uuid::Uuid;

use crate::{api::error, modules::user::schema::UserEntity};

/// Read side of the user directory. Accounts are owned by the identity provider.
#[async_trait::async_trait]
pub trait UserRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, error::SystemError>;
}
