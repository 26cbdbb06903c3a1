use uuid::Uuid;

use crate::{
    api::error,
    modules::relationship::{
        model::{PublicUserProfile, RelatedUserProfile, RelatedView, RelationshipProjection},
        repository::RelationshipRepository,
        schema::{RelationshipEntity, RelationshipWrite},
    },
};

/// Counterpart profile joined onto every relationship of `$1`.
const RELATED_USERS: &str = r#"
    SELECT
        u.id AS user_id,
        u.username,
        u.avatar_url,
        r.id AS relationship_id,
        r.status
    FROM relationships r
    JOIN users u
        ON u.id = CASE
            WHEN r.requester_id = $1 THEN r.requestee_id
            ELSE r.requester_id
        END
    WHERE (r.requester_id = $1 OR r.requestee_id = $1)
      AND u.deleted_at IS NULL
"#;

fn view_filter(view: RelatedView) -> &'static str {
    match view {
        RelatedView::Friends => "r.status = 'FRIENDS'",
        RelatedView::SentRequests => "r.status = 'PENDING' AND r.requester_id = $1",
        RelatedView::ReceivedRequests => "r.status = 'PENDING' AND r.requestee_id = $1",
        RelatedView::Blocked => {
            r#"(
                r.status = 'MUTUAL_BLOCK'
                OR (r.status = 'FST_BLOCKED_SND' AND r.requester_id = $1)
                OR (r.status = 'SND_BLOCKED_FST' AND r.requestee_id = $1)
            )"#
        }
    }
}

fn like_pattern(query: &str) -> String {
    let escaped = query.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}

#[derive(Clone)]
pub struct RelationshipRepositoryPg {
    pool: sqlx::PgPool,
}

impl RelationshipRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RelationshipRepository for RelationshipRepositoryPg {
    async fn find_by_id(
        &self,
        id: &Uuid,
    ) -> Result<Option<RelationshipEntity>, error::SystemError> {
        let relationship =
            sqlx::query_as::<_, RelationshipEntity>("SELECT * FROM relationships WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(relationship)
    }

    async fn find_by_unordered_pair(
        &self,
        user_a: &Uuid,
        user_b: &Uuid,
    ) -> Result<Option<RelationshipEntity>, error::SystemError> {
        let relationship = sqlx::query_as::<_, RelationshipEntity>(
            r#"
            SELECT *
            FROM relationships
            WHERE
                (requester_id = $1 AND requestee_id = $2)
            OR (requester_id = $2 AND requestee_id = $1)
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_optional(&self.pool)
        .await?;

        Ok(relationship)
    }

    async fn insert(
        &self,
        relationship: &RelationshipWrite,
    ) -> Result<RelationshipEntity, error::SystemError> {
        let id = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));

        let created = sqlx::query_as::<_, RelationshipEntity>(
            r#"
            INSERT INTO relationships (id, requester_id, requestee_id, status)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(relationship.requester_id)
        .bind(relationship.requestee_id)
        .bind(relationship.status)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn update(
        &self,
        id: &Uuid,
        expected_version: i64,
        relationship: &RelationshipWrite,
    ) -> Result<Option<RelationshipEntity>, error::SystemError> {
        let updated = sqlx::query_as::<_, RelationshipEntity>(
            r#"
            UPDATE relationships
            SET
                requester_id = $3,
                requestee_id = $4,
                status       = $5,
                version      = version + 1,
                updated_at   = NOW()
            WHERE id = $1 AND version = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected_version)
        .bind(relationship.requester_id)
        .bind(relationship.requestee_id)
        .bind(relationship.status)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn list_visible_for_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<RelationshipProjection>, error::SystemError> {
        // rows where the counterpart blocked the viewer one-sidedly never leave the database
        let relationships = sqlx::query_as::<_, RelationshipProjection>(
            r#"
            SELECT
                r.id AS relationship_id,
                CASE
                    WHEN r.requester_id = $1 THEN r.requestee_id
                    ELSE r.requester_id
                END AS counterpart_id,
                r.status,
                (r.requester_id = $1) AS is_requester,
                r.updated_at
            FROM relationships r
            WHERE (r.requester_id = $1 OR r.requestee_id = $1)
              AND NOT (r.requester_id = $1 AND r.status = 'SND_BLOCKED_FST')
              AND NOT (r.requestee_id = $1 AND r.status = 'FST_BLOCKED_SND')
            ORDER BY r.updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(relationships)
    }

    async fn list_related(
        &self,
        user_id: &Uuid,
        view: RelatedView,
    ) -> Result<Vec<RelatedUserProfile>, error::SystemError> {
        let sql =
            format!("{RELATED_USERS} AND {} ORDER BY r.updated_at DESC", view_filter(view));

        let profiles = sqlx::query_as::<_, RelatedUserProfile>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(profiles)
    }

    async fn find_new_friend_candidates(
        &self,
        user_id: &Uuid,
        username: &str,
        limit: i32,
    ) -> Result<Vec<PublicUserProfile>, error::SystemError> {
        let candidates = sqlx::query_as::<_, PublicUserProfile>(
            r#"
            SELECT
                u.id AS user_id,
                u.username,
                u.avatar_url
            FROM users u
            WHERE u.deleted_at IS NULL
              AND u.id <> $1
              AND lower(u.username) LIKE lower($2)
              AND NOT EXISTS (
                  SELECT 1
                  FROM relationships r
                  WHERE ((r.requester_id = $1 AND r.requestee_id = u.id)
                     OR (r.requestee_id = $1 AND r.requester_id = u.id))
                    AND r.status NOT IN ('REJECTED', 'CANCELLED', 'UNFRIENDED')
              )
            ORDER BY u.username
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(like_pattern(username))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(candidates)
    }

    async fn search_friends(
        &self,
        user_id: &Uuid,
        username: &str,
        limit: i32,
    ) -> Result<Vec<RelatedUserProfile>, error::SystemError> {
        let sql = format!(
            "{RELATED_USERS} AND {} AND lower(u.username) LIKE lower($2) \
             ORDER BY u.username LIMIT $3",
            view_filter(RelatedView::Friends)
        );

        let friends = sqlx::query_as::<_, RelatedUserProfile>(&sql)
            .bind(user_id)
            .bind(like_pattern(username))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(friends)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::relationship::{projection, schema::RelationshipStatus};
    use sqlx::PgPool;
    use RelationshipStatus::*;

    async fn user(pool: &PgPool, username: &str) -> Uuid {
        let id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO users (id, username, email, display_name) VALUES ($1, $2, $3, $2)",
        )
        .bind(id)
        .bind(username)
        .bind(format!("{username}@almonium.test"))
        .execute(pool)
        .await
        .unwrap();
        id
    }

    fn write(
        requester_id: Uuid,
        requestee_id: Uuid,
        status: RelationshipStatus,
    ) -> RelationshipWrite {
        RelationshipWrite { requester_id, requestee_id, status }
    }

    fn sorted<T: Ord>(mut items: Vec<T>) -> Vec<T> {
        items.sort();
        items
    }

    fn pairs(rows: &[RelationshipProjection]) -> Vec<(Uuid, Uuid)> {
        sorted(rows.iter().map(|p| (p.relationship_id, p.counterpart_id)).collect())
    }

    /// Counterparts `viewer` sees through SQL, checked against the in-process projector.
    async fn visible_to(repo: &RelationshipRepositoryPg, viewer: Uuid) -> Vec<Uuid> {
        let from_sql = repo.list_visible_for_user(&viewer).await.unwrap();

        let all = sqlx::query_as::<_, RelationshipEntity>("SELECT * FROM relationships")
            .fetch_all(&repo.pool)
            .await
            .unwrap();
        let from_projector = projection::project_all(&viewer, all.iter());

        assert_eq!(pairs(&from_sql), pairs(&from_projector));

        sorted(from_sql.into_iter().map(|p| p.counterpart_id).collect())
    }

    async fn related_to(
        repo: &RelationshipRepositoryPg,
        viewer: Uuid,
        view: RelatedView,
    ) -> Vec<Uuid> {
        let from_sql = repo.list_related(&viewer, view).await.unwrap();

        let all = sqlx::query_as::<_, RelationshipEntity>("SELECT * FROM relationships")
            .fetch_all(&repo.pool)
            .await
            .unwrap();
        let from_predicate: Vec<_> = all
            .iter()
            .filter(|r| projection::in_view(&viewer, r, view))
            .map(|r| r.counterpart_of(&viewer))
            .collect();

        let from_sql = sorted(from_sql.into_iter().map(|p| p.user_id).collect());
        assert_eq!(from_sql, sorted(from_predicate));
        from_sql
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ann_a%"), "%ann\\_a\\%%");
        assert_eq!(like_pattern("an\\na"), "%an\\\\na%");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_one_sided_blocks_are_hidden_from_the_blocked_party(pool: PgPool) {
        let a = user(&pool, "anna").await;
        let b = user(&pool, "boris").await;
        let c = user(&pool, "carla").await;
        let repo = RelationshipRepositoryPg::new(pool);

        repo.insert(&write(a, b, FstBlockedSnd)).await.unwrap();
        repo.insert(&write(c, a, SndBlockedFst)).await.unwrap();

        assert_eq!(visible_to(&repo, a).await, sorted(vec![b, c]));
        assert!(visible_to(&repo, b).await.is_empty());
        assert!(visible_to(&repo, c).await.is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_mutual_block_is_visible_to_both(pool: PgPool) {
        let (a, b) = (user(&pool, "anna").await, user(&pool, "boris").await);
        let repo = RelationshipRepositoryPg::new(pool);

        repo.insert(&write(a, b, MutualBlock)).await.unwrap();

        assert_eq!(visible_to(&repo, a).await, vec![b]);
        assert_eq!(visible_to(&repo, b).await, vec![a]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_reversed_pair_insert_conflicts(pool: PgPool) {
        let (a, b) = (user(&pool, "anna").await, user(&pool, "boris").await);
        let repo = RelationshipRepositoryPg::new(pool);

        let first = repo.insert(&write(a, b, Pending)).await.unwrap();
        let err = repo.insert(&write(b, a, Pending)).await.unwrap_err();

        assert!(err.is_conflict());
        match err {
            error::SystemError::Conflict(Some(meta)) => {
                assert_eq!(meta.constraint.as_deref(), Some("relationships_pair_key"));
            }
            other => panic!("expected a pair conflict, got {other:?}"),
        }

        let found = repo.find_by_unordered_pair(&b, &a).await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
        assert_eq!(found.requester_id, a);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_update_with_stale_version_writes_nothing(pool: PgPool) {
        let (a, b) = (user(&pool, "anna").await, user(&pool, "boris").await);
        let repo = RelationshipRepositoryPg::new(pool);

        let created = repo.insert(&write(a, b, Pending)).await.unwrap();
        assert_eq!(created.version, 0);

        let accepted = repo.update(&created.id, 0, &write(a, b, Friends)).await.unwrap().unwrap();
        assert_eq!(accepted.version, 1);
        assert_eq!(accepted.status, Friends);

        let stale = repo.update(&created.id, 0, &write(a, b, Rejected)).await.unwrap();
        assert!(stale.is_none());

        let current = repo.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(current.status, Friends);
        assert_eq!(current.version, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_related_views(pool: PgPool) {
        let a = user(&pool, "anna").await;
        let friend = user(&pool, "boris").await;
        let invited = user(&pool, "carla").await;
        let inviter = user(&pool, "dmitri").await;
        let blocked = user(&pool, "elena").await;
        let blocker = user(&pool, "fyodor").await;
        let mutual = user(&pool, "galina").await;
        let repo = RelationshipRepositoryPg::new(pool);

        repo.insert(&write(a, friend, Friends)).await.unwrap();
        repo.insert(&write(a, invited, Pending)).await.unwrap();
        repo.insert(&write(inviter, a, Pending)).await.unwrap();
        repo.insert(&write(a, blocked, FstBlockedSnd)).await.unwrap();
        repo.insert(&write(blocker, a, FstBlockedSnd)).await.unwrap();
        repo.insert(&write(mutual, a, MutualBlock)).await.unwrap();

        assert_eq!(related_to(&repo, a, RelatedView::Friends).await, vec![friend]);
        assert_eq!(related_to(&repo, a, RelatedView::SentRequests).await, vec![invited]);
        assert_eq!(related_to(&repo, a, RelatedView::ReceivedRequests).await, vec![inviter]);
        assert_eq!(
            related_to(&repo, a, RelatedView::Blocked).await,
            sorted(vec![blocked, mutual])
        );
        assert_eq!(related_to(&repo, blocker, RelatedView::Blocked).await, vec![a]);
        assert!(related_to(&repo, blocked, RelatedView::Blocked).await.is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_username_search_treats_query_literally(pool: PgPool) {
        let a = user(&pool, "anna").await;
        let b = user(&pool, "boris").await;
        user(&pool, "b_rat").await;
        let repo = RelationshipRepositoryPg::new(pool);

        let names = |found: Vec<PublicUserProfile>| -> Vec<String> {
            found.into_iter().map(|u| u.username).collect()
        };

        assert_eq!(names(repo.find_new_friend_candidates(&b, "NN", 20).await.unwrap()), ["anna"]);
        assert!(repo.find_new_friend_candidates(&b, "an\\na", 20).await.unwrap().is_empty());
        assert_eq!(names(repo.find_new_friend_candidates(&a, "b_", 20).await.unwrap()), ["b_rat"]);

        repo.insert(&write(a, b, Friends)).await.unwrap();
        assert!(repo.find_new_friend_candidates(&a, "bor", 20).await.unwrap().is_empty());

        let friends = repo.search_friends(&a, "OR", 20).await.unwrap();
        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0].user_id, b);
    }
}
