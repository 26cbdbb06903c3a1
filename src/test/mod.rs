//! In-memory stores for service tests. They enforce the same pair uniqueness and version checks
//! as the Postgres schema, and can be told to lose races on purpose.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use chrono::Utc;
use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        relationship::{
            model::{PublicUserProfile, RelatedUserProfile, RelatedView, RelationshipProjection},
            projection,
            repository::RelationshipRepository,
            schema::{RelationshipEntity, RelationshipWrite},
        },
        user::{
            repository::UserRepository,
            schema::{UserEntity, UserRole},
        },
    },
};

#[derive(Default)]
pub struct MemoryUserRepository {
    users: Mutex<Vec<UserEntity>>,
}

impl MemoryUserRepository {
    pub fn add(&self, username: &str) -> UserEntity {
        let now = Utc::now();
        let user = UserEntity {
            id: Uuid::now_v7(),
            username: username.to_string(),
            email: format!("{username}@almonium.test"),
            role: UserRole::User,
            display_name: username.to_string(),
            avatar_url: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        self.users.lock().unwrap().push(user.clone());
        user
    }

    fn snapshot(&self) -> Vec<UserEntity> {
        self.users.lock().unwrap().iter().filter(|u| u.deleted_at.is_none()).cloned().collect()
    }
}

#[async_trait::async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError> {
        Ok(self.snapshot().into_iter().find(|u| u.id == *id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, error::SystemError> {
        Ok(self.snapshot().into_iter().find(|u| u.email.eq_ignore_ascii_case(email)))
    }
}

#[derive(Default)]
struct Faults {
    stale_updates: usize,
    racing_inserts: VecDeque<RelationshipWrite>,
}

pub struct MemoryRelationshipRepository {
    rows: Mutex<Vec<RelationshipEntity>>,
    users: Arc<MemoryUserRepository>,
    faults: Mutex<Faults>,
}

impl MemoryRelationshipRepository {
    pub fn new(users: Arc<MemoryUserRepository>) -> Self {
        Self { rows: Mutex::new(Vec::new()), users, faults: Mutex::new(Faults::default()) }
    }

    /// The next `count` updates find the row bumped by another writer.
    pub fn lose_next_updates(&self, count: usize) {
        self.faults.lock().unwrap().stale_updates = count;
    }

    /// `write` lands just before the next insert.
    pub fn race_next_insert(&self, write: RelationshipWrite) {
        self.faults.lock().unwrap().racing_inserts.push_back(write);
    }

    pub fn count_for_pair(&self, user_a: &Uuid, user_b: &Uuid) -> usize {
        let rows = self.rows.lock().unwrap();
        rows.iter().filter(|r| r.involves(user_a) && r.involves(user_b)).count()
    }

    fn insert_row(
        rows: &mut Vec<RelationshipEntity>,
        write: &RelationshipWrite,
    ) -> Result<RelationshipEntity, error::SystemError> {
        if write.requester_id == write.requestee_id {
            return Err(error::SystemError::DatabaseError("relationships_distinct_users".into()));
        }
        if rows.iter().any(|r| r.involves(&write.requester_id) && r.involves(&write.requestee_id)) {
            return Err(error::SystemError::Conflict(Some(error::DbErrorMeta {
                code: Some("23505".into()),
                constraint: Some("relationships_pair_key".into()),
                message: "duplicate key value violates unique constraint".into(),
            })));
        }

        let now = Utc::now();
        let row = RelationshipEntity {
            id: Uuid::now_v7(),
            requester_id: write.requester_id,
            requestee_id: write.requestee_id,
            status: write.status,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());
        Ok(row)
    }

    fn related(&self, user_id: &Uuid, view: RelatedView) -> Vec<RelatedUserProfile> {
        let users = self.users.snapshot();
        let mut rows: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| projection::in_view(user_id, r, view))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        rows.into_iter()
            .filter_map(|r| {
                let counterpart = users.iter().find(|u| u.id == r.counterpart_of(user_id))?;
                Some(RelatedUserProfile {
                    user_id: counterpart.id,
                    username: counterpart.username.clone(),
                    avatar_url: counterpart.avatar_url.clone(),
                    relationship_id: r.id,
                    status: r.status,
                })
            })
            .collect()
    }
}

fn matches_username(username: &str, query: &str) -> bool {
    username.to_lowercase().contains(&query.to_lowercase())
}

#[async_trait::async_trait]
impl RelationshipRepository for MemoryRelationshipRepository {
    async fn find_by_id(
        &self,
        id: &Uuid,
    ) -> Result<Option<RelationshipEntity>, error::SystemError> {
        Ok(self.rows.lock().unwrap().iter().find(|r| r.id == *id).cloned())
    }

    async fn find_by_unordered_pair(
        &self,
        user_a: &Uuid,
        user_b: &Uuid,
    ) -> Result<Option<RelationshipEntity>, error::SystemError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.involves(user_a) && r.involves(user_b))
            .cloned())
    }

    async fn insert(
        &self,
        relationship: &RelationshipWrite,
    ) -> Result<RelationshipEntity, error::SystemError> {
        let racing = self.faults.lock().unwrap().racing_inserts.pop_front();
        let mut rows = self.rows.lock().unwrap();
        if let Some(racing) = racing {
            Self::insert_row(&mut rows, &racing)?;
        }
        Self::insert_row(&mut rows, relationship)
    }

    async fn update(
        &self,
        id: &Uuid,
        expected_version: i64,
        relationship: &RelationshipWrite,
    ) -> Result<Option<RelationshipEntity>, error::SystemError> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|r| r.id == *id) else {
            return Ok(None);
        };

        let mut faults = self.faults.lock().unwrap();
        if faults.stale_updates > 0 {
            faults.stale_updates -= 1;
            row.version += 1;
            row.updated_at = Utc::now();
        }

        if row.version != expected_version {
            return Ok(None);
        }

        row.requester_id = relationship.requester_id;
        row.requestee_id = relationship.requestee_id;
        row.status = relationship.status;
        row.version += 1;
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn list_visible_for_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<RelationshipProjection>, error::SystemError> {
        Ok(projection::project_all(user_id, self.rows.lock().unwrap().iter()))
    }

    async fn list_related(
        &self,
        user_id: &Uuid,
        view: RelatedView,
    ) -> Result<Vec<RelatedUserProfile>, error::SystemError> {
        Ok(self.related(user_id, view))
    }

    async fn find_new_friend_candidates(
        &self,
        user_id: &Uuid,
        username: &str,
        limit: i32,
    ) -> Result<Vec<PublicUserProfile>, error::SystemError> {
        let rows = self.rows.lock().unwrap().clone();
        let mut candidates: Vec<_> = self
            .users
            .snapshot()
            .into_iter()
            .filter(|u| u.id != *user_id && matches_username(&u.username, username))
            .filter(|u| {
                !rows.iter().any(|r| {
                    r.involves(user_id) && r.involves(&u.id) && !r.status.is_retryable()
                })
            })
            .map(|u| PublicUserProfile {
                user_id: u.id,
                username: u.username,
                avatar_url: u.avatar_url,
            })
            .collect();
        candidates.sort_by(|a, b| a.username.cmp(&b.username));
        candidates.truncate(limit as usize);
        Ok(candidates)
    }

    async fn search_friends(
        &self,
        user_id: &Uuid,
        username: &str,
        limit: i32,
    ) -> Result<Vec<RelatedUserProfile>, error::SystemError> {
        let mut friends: Vec<_> = self
            .related(user_id, RelatedView::Friends)
            .into_iter()
            .filter(|f| matches_username(&f.username, username))
            .collect();
        friends.sort_by(|a, b| a.username.cmp(&b.username));
        friends.truncate(limit as usize);
        Ok(friends)
    }
}
