// PostgreSQL repository implementations using sqlx
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::repository::{
    CommentRepository, CommunityRepository, PostRepository, SessionRepository, UserRepository, VoteRepository,
};
use crate::models::community::MemberResponse;
use crate::models::{Comment, Community, Post, Session, TargetKind, User, VoteTally, VoteValue};
use crate::pagination::{KeysetPage, OffsetParams, SortOrder};
use crate::utils::database_retry::{retry_database_operation, DatabaseRetryConfig};
use crate::{AppError, Result};

// PostgreSQL connection pool wrapper
pub struct PostgresDatabase {
    pub pool: Arc<PgPool>,
}

impl PostgresDatabase {
    pub async fn connect(config: &AppConfig, database_url: &str) -> Result<Self> {
        tracing::info!("🔗 DATABASE: Configuring connection pool");
        tracing::info!("   📊 Max connections: {}", config.database_max_connections);

        let retry = DatabaseRetryConfig::default();
        let pool = retry_database_operation(
            move || async move {
                PgPoolOptions::new()
                    .max_connections(config.database_max_connections)
                    .idle_timeout(Duration::from_secs(600))
                    .max_lifetime(Duration::from_secs(3600))
                    .acquire_timeout(Duration::from_secs(30))
                    .connect(database_url)
                    .await
                    .map_err(|e| AppError::DatabaseError(format!("Failed to connect to PostgreSQL: {}", e)))
            },
            &retry,
        )
        .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to run migrations: {}", e)))?;

        tracing::info!("✅ DATABASE: Connection pool ready and migrations applied");

        Ok(Self { pool: Arc::new(pool) })
    }

    pub fn repository(&self) -> PostgresRepository {
        PostgresRepository { pool: self.pool.clone() }
    }
}

/// Implements every repository trait over one pool, so multi-table writes
/// can share a transaction.
#[derive(Clone)]
pub struct PostgresRepository {
    pool: Arc<PgPool>,
}

impl PostgresRepository {
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&*self.pool).await?;
        Ok(())
    }
}

/// Map a unique violation on a named index to a readable conflict message
fn conflict_on(err: sqlx::Error, messages: &[(&str, &str)]) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if let Some(constraint) = db_err.constraint() {
            if let Some((_, message)) = messages.iter().find(|(name, _)| *name == constraint) {
                return AppError::Conflict(message.to_string());
            }
        }
    }
    AppError::from(err)
}

/// Append the keyset predicate, ordering and limit for `page` to a query
/// whose WHERE clause is already open. `alias` is the listed table's alias.
fn push_keyset(qb: &mut QueryBuilder<'_, Postgres>, alias: &str, page: &KeysetPage) {
    if let Some(after) = &page.after {
        match page.order {
            SortOrder::Newest => {
                qb.push(format!(" AND ({a}.created_at, {a}.id) < (", a = alias));
                qb.push_bind(after.created_at);
                qb.push(", ");
                qb.push_bind(after.id);
                qb.push(")");
            }
            // Compares against the score captured in the cursor, not the current one
            SortOrder::TopScore => {
                qb.push(format!(" AND ({a}.score, {a}.created_at, {a}.id) < (", a = alias));
                qb.push_bind(after.score.unwrap_or_default());
                qb.push(", ");
                qb.push_bind(after.created_at);
                qb.push(", ");
                qb.push_bind(after.id);
                qb.push(")");
            }
            SortOrder::Oldest => {
                qb.push(format!(" AND ({a}.created_at, {a}.id) > (", a = alias));
                qb.push_bind(after.created_at);
                qb.push(", ");
                qb.push_bind(after.id);
                qb.push(")");
            }
        }
    }

    let order_by = match page.order {
        SortOrder::Newest => format!(" ORDER BY {a}.created_at DESC, {a}.id DESC", a = alias),
        SortOrder::TopScore => format!(" ORDER BY {a}.score DESC, {a}.created_at DESC, {a}.id DESC", a = alias),
        SortOrder::Oldest => format!(" ORDER BY {a}.created_at ASC, {a}.id ASC", a = alias),
    };
    qb.push(order_by);
    qb.push(" LIMIT ");
    qb.push_bind(page.fetch_limit());
}

const USER_COLUMNS: &str = "id, username, email, password_hash, is_admin, created_at, updated_at";

const SESSION_COLUMNS: &str = "id, user_id, refresh_token_hash, expires_at, revoked_at, created_at, updated_at";

const COMMUNITY_COLUMNS: &str = "id, name, description, creator_id, member_count, created_at, deleted_at";

const POST_SELECT: &str = r#"
    SELECT p.id, p.community_id, c.name AS community_name, p.author_id, u.username AS author_username,
           p.title, p.body, p.score, p.upvotes, p.downvotes, p.comment_count,
           p.created_at, p.updated_at, p.deleted_at
    FROM posts p
    JOIN communities c ON c.id = p.community_id
    JOIN users u ON u.id = p.author_id
"#;

const COMMENT_SELECT: &str = r#"
    SELECT cm.id, cm.post_id, cm.author_id, u.username AS author_username, cm.parent_id, cm.body,
           cm.score, cm.upvotes, cm.downvotes, cm.created_at, cm.updated_at, cm.deleted_at
    FROM comments cm
    JOIN users u ON u.id = cm.author_id
"#;

#[async_trait]
impl UserRepository for PostgresRepository {
    async fn create_user(&self, user: &User) -> Result<User> {
        let sql = format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, is_admin, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.is_admin)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| {
                conflict_on(
                    e,
                    &[
                        ("users_username_lower_key", "Username is already taken"),
                        ("users_email_lower_key", "Email is already registered"),
                    ],
                )
            })
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(&*self.pool).await?)
    }

    async fn get_user_by_login(&self, login: &str) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE LOWER(username) = LOWER($1) OR LOWER(email) = LOWER($1) LIMIT 1",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql).bind(login).fetch_optional(&*self.pool).await?)
    }

    async fn get_karma(&self, user_id: Uuid) -> Result<i64> {
        let karma = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT (COALESCE((SELECT SUM(score) FROM posts WHERE author_id = $1 AND deleted_at IS NULL), 0)
                  + COALESCE((SELECT SUM(cm.score) FROM comments cm
                              JOIN posts p ON p.id = cm.post_id AND p.deleted_at IS NULL
                              WHERE cm.author_id = $1 AND cm.deleted_at IS NULL), 0))::BIGINT
            "#,
        )
        .bind(user_id)
        .fetch_one(&*self.pool)
        .await?;
        Ok(karma)
    }
}

#[async_trait]
impl SessionRepository for PostgresRepository {
    async fn create_session(&self, session: &Session) -> Result<Session> {
        let sql = format!(
            r#"
            INSERT INTO sessions (id, user_id, refresh_token_hash, expires_at, revoked_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            SESSION_COLUMNS
        );
        Ok(sqlx::query_as::<_, Session>(&sql)
            .bind(session.id)
            .bind(session.user_id)
            .bind(&session.refresh_token_hash)
            .bind(session.expires_at)
            .bind(session.revoked_at)
            .bind(session.created_at)
            .bind(session.updated_at)
            .fetch_one(&*self.pool)
            .await?)
    }

    async fn get_session_by_token_hash(&self, refresh_token_hash: &str) -> Result<Option<Session>> {
        let sql = format!("SELECT {} FROM sessions WHERE refresh_token_hash = $1", SESSION_COLUMNS);
        Ok(sqlx::query_as::<_, Session>(&sql)
            .bind(refresh_token_hash)
            .fetch_optional(&*self.pool)
            .await?)
    }

    async fn rotate_refresh_token(
        &self,
        session_id: Uuid,
        current_hash: &str,
        new_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET refresh_token_hash = $3, expires_at = $4, updated_at = NOW()
            WHERE id = $1 AND refresh_token_hash = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(session_id)
        .bind(current_hash)
        .bind(new_hash)
        .bind(expires_at)
        .execute(&*self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn revoke_session(&self, session_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE sessions SET revoked_at = NOW(), updated_at = NOW() WHERE id = $1 AND revoked_at IS NULL")
            .bind(session_id)
            .execute(&*self.pool)
            .await?;
        Ok(())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl CommunityRepository for PostgresRepository {
    async fn create_community(&self, community: &Community) -> Result<Community> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO communities (id, name, description, creator_id, member_count, created_at)
            VALUES ($1, $2, $3, $4, 1, $5)
            RETURNING {}
            "#,
            COMMUNITY_COLUMNS
        );
        let created = sqlx::query_as::<_, Community>(&sql)
            .bind(community.id)
            .bind(&community.name)
            .bind(&community.description)
            .bind(community.creator_id)
            .bind(community.created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                conflict_on(
                    e,
                    &[("communities_name_lower_key", "A community with this name already exists")],
                )
            })?;

        sqlx::query("INSERT INTO community_members (community_id, user_id, joined_at) VALUES ($1, $2, $3)")
            .bind(created.id)
            .bind(created.creator_id)
            .bind(created.created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn get_community_by_name(&self, name: &str) -> Result<Option<Community>> {
        let sql = format!(
            "SELECT {} FROM communities WHERE LOWER(name) = LOWER($1) AND deleted_at IS NULL",
            COMMUNITY_COLUMNS
        );
        Ok(sqlx::query_as::<_, Community>(&sql).bind(name).fetch_optional(&*self.pool).await?)
    }

    async fn list_communities(&self, params: &OffsetParams) -> Result<(Vec<Community>, i64)> {
        let sql = format!(
            r#"
            SELECT {} FROM communities
            WHERE deleted_at IS NULL
            ORDER BY member_count DESC, name ASC
            LIMIT $1 OFFSET $2
            "#,
            COMMUNITY_COLUMNS
        );
        let rows = sqlx::query_as::<_, Community>(&sql)
            .bind(i64::from(params.limit))
            .bind(i64::from(params.offset))
            .fetch_all(&*self.pool)
            .await?;
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM communities WHERE deleted_at IS NULL")
            .fetch_one(&*self.pool)
            .await?;
        Ok((rows, total))
    }

    async fn add_member(&self, community_id: Uuid, user_id: Uuid) -> Result<Community> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO community_members (community_id, user_id)
            SELECT id, $2 FROM communities WHERE id = $1 AND deleted_at IS NULL
            ON CONFLICT (community_id, user_id) DO NOTHING
            "#,
        )
        .bind(community_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            let live = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM communities WHERE id = $1 AND deleted_at IS NULL)",
            )
            .bind(community_id)
            .fetch_one(&mut *tx)
            .await?;
            return Err(if live {
                AppError::Conflict("Already a member of this community".to_string())
            } else {
                AppError::NotFound("Community not found".to_string())
            });
        }

        let sql = format!(
            "UPDATE communities SET member_count = member_count + 1 WHERE id = $1 RETURNING {}",
            COMMUNITY_COLUMNS
        );
        let updated = sqlx::query_as::<_, Community>(&sql)
            .bind(community_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn remove_member(&self, community_id: Uuid, user_id: Uuid) -> Result<Community> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM community_members WHERE community_id = $1 AND user_id = $2")
            .bind(community_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        if removed.rows_affected() == 0 {
            return Err(AppError::NotFound("Not a member of this community".to_string()));
        }

        let sql = format!(
            "UPDATE communities SET member_count = GREATEST(member_count - 1, 0) WHERE id = $1 RETURNING {}",
            COMMUNITY_COLUMNS
        );
        let updated = sqlx::query_as::<_, Community>(&sql)
            .bind(community_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn is_member(&self, community_id: Uuid, user_id: Uuid) -> Result<bool> {
        Ok(sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM community_members WHERE community_id = $1 AND user_id = $2)",
        )
        .bind(community_id)
        .bind(user_id)
        .fetch_one(&*self.pool)
        .await?)
    }

    async fn list_members(&self, community_id: Uuid, params: &OffsetParams) -> Result<(Vec<MemberResponse>, i64)> {
        let rows = sqlx::query_as::<_, MemberResponse>(
            r#"
            SELECT m.user_id, u.username, m.joined_at
            FROM community_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.community_id = $1
            ORDER BY m.joined_at ASC, m.user_id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(community_id)
        .bind(i64::from(params.limit))
        .bind(i64::from(params.offset))
        .fetch_all(&*self.pool)
        .await?;
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM community_members WHERE community_id = $1")
            .bind(community_id)
            .fetch_one(&*self.pool)
            .await?;
        Ok((rows, total))
    }
}

impl PostgresRepository {
    async fn fetch_post<'e, E>(executor: E, id: Uuid) -> Result<Option<Post>>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let sql = format!("{} WHERE p.id = $1 AND p.deleted_at IS NULL", POST_SELECT);
        Ok(sqlx::query_as::<_, Post>(&sql).bind(id).fetch_optional(executor).await?)
    }

    async fn fetch_comment<'e, E>(executor: E, id: Uuid) -> Result<Option<Comment>>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "{} WHERE cm.id = $1 AND cm.deleted_at IS NULL \
             AND EXISTS (SELECT 1 FROM posts p WHERE p.id = cm.post_id AND p.deleted_at IS NULL)",
            COMMENT_SELECT
        );
        Ok(sqlx::query_as::<_, Comment>(&sql).bind(id).fetch_optional(executor).await?)
    }
}

#[async_trait]
impl PostRepository for PostgresRepository {
    async fn create_post(&self, post: &Post) -> Result<Post> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, community_id, author_id, title, body, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(post.id)
        .bind(post.community_id)
        .bind(post.author_id)
        .bind(&post.title)
        .bind(&post.body)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&*self.pool)
        .await?;

        Self::fetch_post(&*self.pool, post.id)
            .await?
            .ok_or_else(|| AppError::InternalError(format!("Post {} vanished after insert", post.id)))
    }

    async fn get_post_by_id(&self, id: Uuid) -> Result<Option<Post>> {
        Self::fetch_post(&*self.pool, id).await
    }

    async fn list_posts_in_community(&self, community_id: Uuid, page: &KeysetPage) -> Result<Vec<Post>> {
        let mut qb = QueryBuilder::<Postgres>::new(POST_SELECT);
        qb.push(" WHERE p.deleted_at IS NULL AND p.community_id = ");
        qb.push_bind(community_id);
        push_keyset(&mut qb, "p", page);
        Ok(qb.build_query_as::<Post>().fetch_all(&*self.pool).await?)
    }

    async fn list_posts_by_author(&self, author_id: Uuid, page: &KeysetPage) -> Result<Vec<Post>> {
        let mut qb = QueryBuilder::<Postgres>::new(POST_SELECT);
        qb.push(" WHERE p.deleted_at IS NULL AND p.author_id = ");
        qb.push_bind(author_id);
        push_keyset(&mut qb, "p", page);
        Ok(qb.build_query_as::<Post>().fetch_all(&*self.pool).await?)
    }

    async fn soft_delete_post(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE posts SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&*self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Post not found".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CommentRepository for PostgresRepository {
    async fn create_comment(&self, comment: &Comment) -> Result<Comment> {
        let mut tx = self.pool.begin().await?;

        // Lock the post so the comment_count update serializes with deletes
        let post_live = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM posts WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(comment.post_id)
        .fetch_optional(&mut *tx)
        .await?;
        if post_live.is_none() {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        sqlx::query(
            r#"
            INSERT INTO comments (id, post_id, author_id, parent_id, body, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(comment.id)
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(comment.parent_id)
        .bind(&comment.body)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE posts SET comment_count = comment_count + 1 WHERE id = $1")
            .bind(comment.post_id)
            .execute(&mut *tx)
            .await?;

        let created = Self::fetch_comment(&mut *tx, comment.id)
            .await?
            .ok_or_else(|| AppError::InternalError(format!("Comment {} vanished after insert", comment.id)))?;

        tx.commit().await?;
        Ok(created)
    }

    async fn get_comment_by_id(&self, id: Uuid) -> Result<Option<Comment>> {
        Self::fetch_comment(&*self.pool, id).await
    }

    async fn list_comments_for_post(&self, post_id: Uuid, page: &KeysetPage) -> Result<Vec<Comment>> {
        let mut qb = QueryBuilder::<Postgres>::new(COMMENT_SELECT);
        qb.push(" WHERE cm.deleted_at IS NULL AND cm.post_id = ");
        qb.push_bind(post_id);
        push_keyset(&mut qb, "cm", page);
        Ok(qb.build_query_as::<Comment>().fetch_all(&*self.pool).await?)
    }

    async fn soft_delete_comment(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let post_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE comments SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING post_id
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

        sqlx::query("UPDATE posts SET comment_count = GREATEST(comment_count - 1, 0) WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

fn target_table(kind: TargetKind) -> &'static str {
    match kind {
        TargetKind::Post => "posts",
        TargetKind::Comment => "comments",
    }
}

#[async_trait]
impl VoteRepository for PostgresRepository {
    async fn apply_vote(
        &self,
        voter_id: Uuid,
        kind: TargetKind,
        target_id: Uuid,
        value: Option<VoteValue>,
    ) -> Result<VoteTally> {
        let table = target_table(kind);
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent votes on the same target. A comment
        // also needs its post alive; the post row is locked too so a delete
        // cannot slip in before commit.
        let lock_sql = match kind {
            TargetKind::Post => "SELECT id FROM posts WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
            TargetKind::Comment => r#"
                SELECT cm.id FROM comments cm
                JOIN posts p ON p.id = cm.post_id
                WHERE cm.id = $1 AND cm.deleted_at IS NULL AND p.deleted_at IS NULL
                FOR UPDATE OF cm, p
                "#,
        };
        let locked = sqlx::query_scalar::<_, Uuid>(lock_sql)
            .bind(target_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(kind.not_found());
        }

        match value {
            Some(value) => {
                sqlx::query(
                    r#"
                    INSERT INTO votes (voter_id, target_kind, target_id, value, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, NOW(), NOW())
                    ON CONFLICT (voter_id, target_kind, target_id) DO UPDATE
                    SET value = EXCLUDED.value,
                        updated_at = CASE WHEN votes.value <> EXCLUDED.value THEN EXCLUDED.updated_at ELSE votes.updated_at END
                    "#,
                )
                .bind(voter_id)
                .bind(kind.as_str())
                .bind(target_id)
                .bind(value.as_i16())
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM votes WHERE voter_id = $1 AND target_kind = $2 AND target_id = $3")
                    .bind(voter_id)
                    .bind(kind.as_str())
                    .bind(target_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        let recompute_sql = format!(
            r#"
            UPDATE {table} t
            SET upvotes = agg.up, downvotes = agg.down, score = agg.up - agg.down
            FROM (
                SELECT COUNT(*) FILTER (WHERE value = 1) AS up,
                       COUNT(*) FILTER (WHERE value = -1) AS down
                FROM votes
                WHERE target_kind = $1 AND target_id = $2
            ) agg
            WHERE t.id = $2
            RETURNING t.score, t.upvotes, t.downvotes
            "#,
            table = table
        );
        let (score, upvotes, downvotes) = sqlx::query_as::<_, (i64, i64, i64)>(&recompute_sql)
            .bind(kind.as_str())
            .bind(target_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            "🗳️ VOTE: {} {} now score={} (+{} / -{})",
            kind.as_str(),
            target_id,
            score,
            upvotes,
            downvotes
        );

        Ok(VoteTally {
            target_id,
            score,
            upvotes,
            downvotes,
            my_vote: value.map_or(0, VoteValue::as_i16),
        })
    }

    async fn get_user_votes(
        &self,
        voter_id: Uuid,
        kind: TargetKind,
        target_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, VoteValue>> {
        if target_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, (Uuid, i16)>(
            "SELECT target_id, value FROM votes WHERE voter_id = $1 AND target_kind = $2 AND target_id = ANY($3)",
        )
        .bind(voter_id)
        .bind(kind.as_str())
        .bind(target_ids.to_vec())
        .fetch_all(&*self.pool)
        .await?;

        let mut votes = HashMap::with_capacity(rows.len());
        for (target_id, value) in rows {
            if let Some(value) = VoteValue::from_i16(value)? {
                votes.insert(target_id, value);
            }
        }
        Ok(votes)
    }
}
