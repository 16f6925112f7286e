//! SQLite database operations
//!
//! All database access goes through this module.
//! Uses SQLx with runtime-checked queries and embedded migrations.

use chrono::{DateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::{Pool, QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashMap;
use std::path::Path;

use super::models::*;
use crate::error::AppError;

const USER_SUMMARY_COLUMNS: &str = "id, first_name, last_name, profile_picture";

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

/// Run `body` inside `BEGIN IMMEDIATE ... COMMIT`, rolling back on error.
///
/// `BEGIN IMMEDIATE` takes the write lock up front, so two writers can never
/// both read the same row state and then overwrite each other.
///
/// The unit of work runs on its own task: a caller that is dropped halfway
/// (client disconnect) does not interrupt it, and the lock is always released.
async fn in_immediate_transaction<T, F>(conn: PoolConnection<Sqlite>, body: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: for<'c> FnOnce(
            &'c mut PoolConnection<Sqlite>,
        ) -> std::pin::Pin<
            Box<dyn std::future::Future<Output = Result<T, AppError>> + Send + 'c>,
        > + Send
        + 'static,
{
    tokio::spawn(run_immediate(conn, body))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Transaction task failed: {}", e)))?
}

async fn run_immediate<T, F>(conn: PoolConnection<Sqlite>, body: F) -> Result<T, AppError>
where
    F: for<'c> FnOnce(
        &'c mut PoolConnection<Sqlite>,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<T, AppError>> + Send + 'c>,
    >,
{
    let mut tx = ImmediateTransaction::begin(conn).await?;

    let result = body(tx.conn()?).await;

    match result {
        Ok(value) => {
            tx.finish("COMMIT").await?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = tx.finish("ROLLBACK").await {
                tracing::error!(error = %rollback_error, "Rollback failed");
            }
            Err(error)
        }
    }
}

/// Connection with an open `BEGIN IMMEDIATE`
///
/// If it is dropped before COMMIT or ROLLBACK succeeded, the connection is
/// detached from the pool and closed, which makes SQLite roll back and
/// release the write lock. It never goes back to the pool mid-transaction.
struct ImmediateTransaction {
    conn: Option<PoolConnection<Sqlite>>,
}

impl ImmediateTransaction {
    async fn begin(mut conn: PoolConnection<Sqlite>) -> Result<Self, AppError> {
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(Self { conn: Some(conn) })
    }

    fn conn(&mut self) -> Result<&mut PoolConnection<Sqlite>, AppError> {
        self.conn
            .as_mut()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Transaction already finished")))
    }

    /// Run COMMIT or ROLLBACK and hand the connection back to the pool
    async fn finish(mut self, statement: &'static str) -> Result<(), AppError> {
        sqlx::query(statement).execute(&mut **self.conn()?).await?;
        self.conn.take();
        Ok(())
    }
}

impl Drop for ImmediateTransaction {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::warn!("Closing connection left inside an unfinished transaction");
            drop(conn.detach());
        }
    }
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Insert a new user
    ///
    /// # Errors
    /// Returns `Validation` if the email is already registered
    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (
                id, first_name, last_name, email, password_hash, profile_picture,
                google_id, auth_provider, email_verified, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.profile_picture)
        .bind(&user.google_id)
        .bind(&user.auth_provider)
        .bind(user.email_verified)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_error)) if db_error.is_unique_violation() => Err(
                AppError::Validation("Email already registered".to_string()),
            ),
            Err(error) => Err(error.into()),
        }
    }

    /// Get user by ID
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Get user by email (case-insensitive)
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ? COLLATE NOCASE")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Find the account a Google identity belongs to
    ///
    /// Prefers a match on the Google subject id over an email match.
    pub async fn find_user_for_google(
        &self,
        google_id: &str,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE google_id = ? OR email = ? COLLATE NOCASE
            ORDER BY CASE WHEN google_id = ? THEN 0 ELSE 1 END
            LIMIT 1
            "#,
        )
        .bind(google_id)
        .bind(email)
        .bind(google_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Attach a Google identity to an existing account
    ///
    /// Only succeeds when the account has no Google id yet.
    ///
    /// # Returns
    /// `true` if the account was linked
    pub async fn link_google_account(
        &self,
        user_id: &str,
        google_id: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET google_id = ?, auth_provider = 'google', email_verified = 1, updated_at = ?
            WHERE id = ? AND google_id IS NULL
            "#,
        )
        .bind(google_id)
        .bind(updated_at)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Count registered users
    pub async fn count_users(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Load profile summaries for a set of user IDs (batch to avoid N+1)
    pub async fn get_user_summaries(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, UserSummary>, AppError> {
        let mut summaries = HashMap::new();
        if ids.is_empty() {
            return Ok(summaries);
        }

        // SQLite limits bound parameters per statement
        for chunk in ids.chunks(500) {
            let mut query_builder = QueryBuilder::<Sqlite>::new(format!(
                "SELECT {} FROM users WHERE id IN (",
                USER_SUMMARY_COLUMNS
            ));
            {
                let mut separated = query_builder.separated(", ");
                for id in chunk {
                    separated.push_bind(id);
                }
            }
            query_builder.push(")");

            let rows = query_builder
                .build_query_as::<UserSummary>()
                .fetch_all(&self.pool)
                .await?;
            summaries.extend(rows.into_iter().map(|summary| (summary.id.clone(), summary)));
        }

        Ok(summaries)
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// Insert a new post
    pub async fn insert_post(&self, post: &Post) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, author_id, content, image, is_private, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.id)
        .bind(&post.author_id)
        .bind(&post.content)
        .bind(&post.image)
        .bind(post.is_private)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get post by ID
    pub async fn get_post(&self, id: &str) -> Result<Option<Post>, AppError> {
        let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    /// Replace a post's content
    pub async fn update_post_content(
        &self,
        id: &str,
        content: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE posts SET content = ?, updated_at = ? WHERE id = ?")
            .bind(content)
            .bind(updated_at)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete a post together with everything hanging off it
    ///
    /// Comments, replies and reply likes go through `ON DELETE CASCADE`;
    /// reactions have no foreign key and are removed explicitly.
    pub async fn delete_post(&self, id: &str) -> Result<bool, AppError> {
        let conn = self.pool.acquire().await?;
        let id = id.to_string();

        in_immediate_transaction(conn, move |conn| {
            Box::pin(async move {
                sqlx::query(
                    r#"
                    DELETE FROM reactions
                    WHERE (target_kind = 'post' AND target_id = ?)
                       OR (target_kind = 'comment'
                           AND target_id IN (SELECT id FROM comments WHERE post_id = ?))
                    "#,
                )
                .bind(&id)
                .bind(&id)
                .execute(&mut **conn)
                .await?;

                let deleted = sqlx::query("DELETE FROM posts WHERE id = ?")
                    .bind(&id)
                    .execute(&mut **conn)
                    .await?;

                Ok(deleted.rows_affected() == 1)
            })
        })
        .await
    }

    /// Count posts visible to a viewer: public ones plus the viewer's own
    pub async fn count_visible_posts(&self, viewer_id: &str) -> Result<i64, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE is_private = 0 OR author_id = ?")
                .bind(viewer_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Get a page of posts visible to a viewer, newest first
    ///
    /// # Arguments
    /// * `viewer_id` - Requesting user; their private posts are included
    /// * `limit` - Page size
    /// * `offset` - Number of visible posts to skip
    pub async fn get_visible_posts(
        &self,
        viewer_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>, AppError> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT * FROM posts
            WHERE is_private = 0 OR author_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(viewer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    /// Count all posts
    pub async fn count_posts(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Comments
    // =========================================================================

    /// Insert a new comment
    pub async fn insert_comment(&self, comment: &Comment) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO comments (id, post_id, author_id, content, image, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&comment.id)
        .bind(&comment.post_id)
        .bind(&comment.author_id)
        .bind(&comment.content)
        .bind(&comment.image)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get comment by ID
    pub async fn get_comment(&self, id: &str) -> Result<Option<Comment>, AppError> {
        let comment = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(comment)
    }

    /// Get comments of a post, oldest first
    pub async fn get_comments_for_post(
        &self,
        post_id: &str,
        limit: i64,
    ) -> Result<Vec<Comment>, AppError> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT * FROM comments
            WHERE post_id = ?
            ORDER BY created_at ASC, id ASC
            LIMIT ?
            "#,
        )
        .bind(post_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    /// Count comments per post among the provided post IDs
    pub async fn count_comments_for_posts(
        &self,
        post_ids: &[String],
    ) -> Result<HashMap<String, i64>, AppError> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query_builder = QueryBuilder::<Sqlite>::new(
            "SELECT post_id, COUNT(*) FROM comments WHERE post_id IN (",
        );
        {
            let mut separated = query_builder.separated(", ");
            for post_id in post_ids {
                separated.push_bind(post_id);
            }
        }
        query_builder.push(") GROUP BY post_id");

        let rows = query_builder
            .build_query_as::<(String, i64)>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().collect())
    }

    // =========================================================================
    // Replies
    // =========================================================================

    /// Insert a new reply
    ///
    /// The parent comment's reply list is derived from `replies.comment_id`,
    /// so this single insert is the whole write.
    pub async fn insert_reply(&self, reply: &Reply) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO replies (id, comment_id, author_id, content, image, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&reply.id)
        .bind(&reply.comment_id)
        .bind(&reply.author_id)
        .bind(&reply.content)
        .bind(&reply.image)
        .bind(reply.created_at)
        .bind(reply.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get reply by ID
    pub async fn get_reply(&self, id: &str) -> Result<Option<Reply>, AppError> {
        let reply = sqlx::query_as::<_, Reply>("SELECT * FROM replies WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(reply)
    }

    /// Get replies of several comments, oldest first
    pub async fn get_replies_for_comments(
        &self,
        comment_ids: &[String],
    ) -> Result<Vec<Reply>, AppError> {
        if comment_ids.is_empty() {
            return Ok(vec![]);
        }

        let mut query_builder =
            QueryBuilder::<Sqlite>::new("SELECT * FROM replies WHERE comment_id IN (");
        {
            let mut separated = query_builder.separated(", ");
            for comment_id in comment_ids {
                separated.push_bind(comment_id);
            }
        }
        query_builder.push(") ORDER BY created_at ASC, id ASC");

        let replies = query_builder
            .build_query_as::<Reply>()
            .fetch_all(&self.pool)
            .await?;

        Ok(replies)
    }

    // =========================================================================
    // Reactions
    // =========================================================================

    /// Read-modify-write one user's reaction to a post or comment atomically
    ///
    /// Loads the user's current reaction inside a `BEGIN IMMEDIATE`
    /// transaction, asks `decide` for the desired state and writes the delta.
    /// A type change updates the row in place so its position is kept.
    ///
    /// # Errors
    /// `NotFound` if the target does not exist
    pub async fn update_reaction<F>(
        &self,
        target: ReactionTarget,
        target_id: &str,
        user_id: &str,
        decide: F,
    ) -> Result<ReactionUpdate, AppError>
    where
        F: FnOnce(Option<ReactionType>) -> Option<ReactionType> + Send + 'static,
    {
        let conn = self.pool.acquire().await?;
        let target_id = target_id.to_string();
        let user_id = user_id.to_string();

        in_immediate_transaction(conn, move |conn| {
            Box::pin(async move {
                let exists_sql = match target {
                    ReactionTarget::Post => "SELECT COUNT(*) FROM posts WHERE id = ?",
                    ReactionTarget::Comment => "SELECT COUNT(*) FROM comments WHERE id = ?",
                };
                let exists: i64 = sqlx::query_scalar(exists_sql)
                    .bind(&target_id)
                    .fetch_one(&mut **conn)
                    .await?;
                if exists == 0 {
                    return Err(AppError::NotFound(target.label()));
                }

                let before = sqlx::query_scalar::<_, ReactionType>(
                    r#"
                    SELECT reaction_type FROM reactions
                    WHERE target_kind = ? AND target_id = ? AND user_id = ?
                    "#,
                )
                .bind(target)
                .bind(&target_id)
                .bind(&user_id)
                .fetch_optional(&mut **conn)
                .await?;

                let after = decide(before);
                let now = Utc::now();

                match (before, after) {
                    (None, Some(kind)) => {
                        sqlx::query(
                            r#"
                            INSERT INTO reactions (
                                id, target_kind, target_id, user_id, reaction_type,
                                created_at, updated_at
                            ) VALUES (?, ?, ?, ?, ?, ?, ?)
                            "#,
                        )
                        .bind(EntityId::new().0)
                        .bind(target)
                        .bind(&target_id)
                        .bind(&user_id)
                        .bind(kind)
                        .bind(now)
                        .bind(now)
                        .execute(&mut **conn)
                        .await?;
                    }
                    (Some(old), Some(kind)) if old != kind => {
                        sqlx::query(
                            r#"
                            UPDATE reactions SET reaction_type = ?, updated_at = ?
                            WHERE target_kind = ? AND target_id = ? AND user_id = ?
                            "#,
                        )
                        .bind(kind)
                        .bind(now)
                        .bind(target)
                        .bind(&target_id)
                        .bind(&user_id)
                        .execute(&mut **conn)
                        .await?;
                    }
                    (Some(_), None) => {
                        sqlx::query(
                            r#"
                            DELETE FROM reactions
                            WHERE target_kind = ? AND target_id = ? AND user_id = ?
                            "#,
                        )
                        .bind(target)
                        .bind(&target_id)
                        .bind(&user_id)
                        .execute(&mut **conn)
                        .await?;
                    }
                    _ => {}
                }

                Ok(ReactionUpdate { before, after })
            })
        })
        .await
    }

    /// Get reactions (with user profiles) for several targets of one kind
    ///
    /// Rows come back in reaction creation order.
    pub async fn get_reactions(
        &self,
        target: ReactionTarget,
        target_ids: &[String],
    ) -> Result<Vec<ReactionRow>, AppError> {
        if target_ids.is_empty() {
            return Ok(vec![]);
        }

        let mut query_builder = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT r.target_id, r.reaction_type, u.id AS user_id,
                   u.first_name, u.last_name, u.profile_picture
            FROM reactions r
            JOIN users u ON u.id = r.user_id
            WHERE r.target_kind = "#,
        );
        query_builder.push_bind(target);
        query_builder.push(" AND r.target_id IN (");
        {
            let mut separated = query_builder.separated(", ");
            for target_id in target_ids {
                separated.push_bind(target_id);
            }
        }
        query_builder.push(") ORDER BY r.created_at ASC, r.id ASC");

        let rows = query_builder
            .build_query_as::<ReactionRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    // =========================================================================
    // Reply likes
    // =========================================================================

    /// Toggle a user's like on a reply
    ///
    /// # Returns
    /// `true` if the reply is liked after the call
    ///
    /// # Errors
    /// `NotFound` if the reply does not exist
    pub async fn toggle_reply_like(&self, reply_id: &str, user_id: &str) -> Result<bool, AppError> {
        let conn = self.pool.acquire().await?;
        let reply_id = reply_id.to_string();
        let user_id = user_id.to_string();

        in_immediate_transaction(conn, move |conn| {
            Box::pin(async move {
                let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM replies WHERE id = ?")
                    .bind(&reply_id)
                    .fetch_one(&mut **conn)
                    .await?;
                if exists == 0 {
                    return Err(AppError::NotFound("Reply"));
                }

                let removed = sqlx::query("DELETE FROM reply_likes WHERE reply_id = ? AND user_id = ?")
                    .bind(&reply_id)
                    .bind(&user_id)
                    .execute(&mut **conn)
                    .await?;
                if removed.rows_affected() > 0 {
                    return Ok(false);
                }

                sqlx::query("INSERT INTO reply_likes (reply_id, user_id, created_at) VALUES (?, ?, ?)")
                    .bind(&reply_id)
                    .bind(&user_id)
                    .bind(Utc::now())
                    .execute(&mut **conn)
                    .await?;

                Ok(true)
            })
        })
        .await
    }

    /// Get likes (with user profiles) for several replies, oldest first
    pub async fn get_reply_likes(&self, reply_ids: &[String]) -> Result<Vec<ReplyLikeRow>, AppError> {
        if reply_ids.is_empty() {
            return Ok(vec![]);
        }

        let mut query_builder = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT l.reply_id, u.id AS user_id, u.first_name, u.last_name, u.profile_picture
            FROM reply_likes l
            JOIN users u ON u.id = l.user_id
            WHERE l.reply_id IN ("#,
        );
        {
            let mut separated = query_builder.separated(", ");
            for reply_id in reply_ids {
                separated.push_bind(reply_id);
            }
        }
        query_builder.push(") ORDER BY l.created_at ASC");

        let rows = query_builder
            .build_query_as::<ReplyLikeRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Insert a `haha` on a post, wait `hold`, then finish with `outcome`
    #[cfg(test)]
    pub(crate) async fn insert_reaction_slowly_for_test(
        &self,
        post_id: &str,
        user_id: &str,
        hold: std::time::Duration,
        outcome: Result<(), AppError>,
    ) -> Result<(), AppError> {
        let conn = self.pool.acquire().await?;
        let post_id = post_id.to_string();
        let user_id = user_id.to_string();

        in_immediate_transaction(conn, move |conn| {
            Box::pin(async move {
                let now = Utc::now();
                sqlx::query(
                    r#"
                    INSERT INTO reactions (
                        id, target_kind, target_id, user_id, reaction_type,
                        created_at, updated_at
                    ) VALUES (?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(EntityId::new().0)
                .bind(ReactionTarget::Post)
                .bind(&post_id)
                .bind(&user_id)
                .bind(ReactionType::Haha)
                .bind(now)
                .bind(now)
                .execute(&mut **conn)
                .await?;

                tokio::time::sleep(hold).await;
                outcome
            })
        })
        .await
    }

    #[cfg(test)]
    pub(crate) async fn count_reactions_for_test(
        &self,
        target: ReactionTarget,
        target_id: &str,
    ) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reactions WHERE target_kind = ? AND target_id = ?",
        )
        .bind(target)
        .bind(target_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
