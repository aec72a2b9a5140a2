//! SQLite database operations
//!
//! All database access goes through this module.
//! Uses SQLx with migrations embedded from `./migrations`.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::{Pool, QueryBuilder, Sqlite, SqlitePool};

use super::gateway::PersistenceGateway;
use super::models::*;
use crate::error::AppError;

const ACCESS_TOKEN_DIGEST_PREFIX: &str = "sha256:";

/// SQLite IN-clause chunk size for batch lookups
const BATCH_CHUNK_SIZE: usize = 100;

/// Digest stored in place of a raw bearer token
pub fn hash_access_token(access_token: &str) -> String {
    let digest = Sha256::digest(access_token.as_bytes());
    format!(
        "{}{}",
        ACCESS_TOKEN_DIGEST_PREFIX,
        URL_SAFE_NO_PAD.encode(digest)
    )
}

fn parse_status_ids(raw: Option<String>) -> Result<Option<Vec<String>>, AppError> {
    raw.map(|raw| serde_json::from_str::<Vec<String>>(&raw))
        .transpose()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid announcement status_ids: {}", e)))
}

fn encode_status_ids(ids: &Option<Vec<String>>) -> Result<Option<String>, AppError> {
    ids.as_ref()
        .map(|ids| serde_json::to_string(ids))
        .transpose()
        .map_err(|e| AppError::Internal(e.into()))
}

/// Row shape of the `announcements` table
#[derive(sqlx::FromRow)]
struct AnnouncementRow {
    id: String,
    text: String,
    published: bool,
    all_day: bool,
    scheduled_at: Option<DateTime<Utc>>,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    published_at: Option<DateTime<Utc>>,
    status_ids: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AnnouncementRow> for Announcement {
    type Error = AppError;

    fn try_from(row: AnnouncementRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            text: row.text,
            published: row.published,
            all_day: row.all_day,
            scheduled_at: row.scheduled_at,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            published_at: row.published_at,
            status_ids: parse_status_ids(row.status_ids)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
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
    /// # Arguments
    /// * `path` - Path to SQLite database file
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
    // Accounts, tokens and relationships
    // =========================================================================

    /// Create a local account
    pub async fn create_account(&self, username: &str, is_admin: bool) -> Result<Account, AppError> {
        let account = Account {
            id: EntityId::new().0,
            username: username.to_string(),
            is_admin,
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO accounts (id, username, is_admin, created_at) VALUES (?, ?, ?, ?)")
            .bind(&account.id)
            .bind(&account.username)
            .bind(account.is_admin)
            .bind(account.created_at)
            .execute(&self.pool)
            .await?;

        Ok(account)
    }

    /// Store a bearer token for an account; only its digest is persisted
    pub async fn insert_access_token(
        &self,
        account_id: &str,
        access_token: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO access_tokens (id, account_id, token_digest, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(EntityId::new().0)
        .bind(account_id)
        .bind(hash_access_token(access_token))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Revoke a bearer token
    pub async fn revoke_access_token(&self, access_token: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE access_tokens SET revoked = 1 WHERE token_digest = ?")
            .bind(hash_access_token(access_token))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record that `account_id` follows `target_account_id`
    pub async fn insert_follow(
        &self,
        account_id: &str,
        target_account_id: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO follows (id, account_id, target_account_id, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(account_id, target_account_id) DO NOTHING
            "#,
        )
        .bind(EntityId::new().0)
        .bind(account_id)
        .bind(target_account_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove a follow; returns whether one existed
    pub async fn delete_follow(
        &self,
        account_id: &str,
        target_account_id: &str,
    ) -> Result<bool, AppError> {
        let result =
            sqlx::query("DELETE FROM follows WHERE account_id = ? AND target_account_id = ?")
                .bind(account_id)
                .bind(target_account_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record that `account_id` blocks `target_account_id`
    ///
    /// Any follow from the blocked account towards the blocker is removed.
    pub async fn insert_block(
        &self,
        account_id: &str,
        target_account_id: &str,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO blocks (id, account_id, target_account_id, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(account_id, target_account_id) DO NOTHING
            "#,
        )
        .bind(EntityId::new().0)
        .bind(account_id)
        .bind(target_account_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM follows WHERE account_id = ? AND target_account_id = ?")
            .bind(target_account_id)
            .bind(account_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    // =========================================================================
    // Statuses
    // =========================================================================

    /// Insert a new status
    pub async fn insert_status(&self, status: &Status) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO statuses (id, account_id, content, visibility, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&status.id)
        .bind(&status.account_id)
        .bind(&status.content)
        .bind(status.visibility)
        .bind(status.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[cfg(test)]
    pub async fn set_status_ids_raw_for_test(
        &self,
        announcement_id: &str,
        raw: &str,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE announcements SET status_ids = ? WHERE id = ?")
            .bind(raw)
            .bind(announcement_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[cfg(test)]
    pub async fn set_reaction_created_at_for_test(
        &self,
        reaction_id: &str,
        created_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE announcement_reactions SET created_at = ? WHERE id = ?")
            .bind(created_at)
            .bind(reaction_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PersistenceGateway for Database {
    // =========================================================================
    // Accounts and relationships
    // =========================================================================

    async fn get_account(&self, id: &str) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    async fn get_account_by_token_digest(
        &self,
        digest: &str,
    ) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT accounts.* FROM accounts
            INNER JOIN access_tokens ON access_tokens.account_id = accounts.id
            WHERE access_tokens.token_digest = ? AND access_tokens.revoked = 0
            "#,
        )
        .bind(digest)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn is_following(
        &self,
        account_id: &str,
        target_account_id: &str,
    ) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM follows WHERE account_id = ? AND target_account_id = ?",
        )
        .bind(account_id)
        .bind(target_account_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn is_blocking(
        &self,
        account_id: &str,
        target_account_id: &str,
    ) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM blocks WHERE account_id = ? AND target_account_id = ?",
        )
        .bind(account_id)
        .bind(target_account_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    // =========================================================================
    // Statuses
    // =========================================================================

    async fn get_status(&self, id: &str) -> Result<Option<Status>, AppError> {
        let status = sqlx::query_as::<_, Status>("SELECT * FROM statuses WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(status)
    }

    async fn get_statuses_by_ids(&self, ids: &[String]) -> Result<Vec<Status>, AppError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let mut all_statuses = Vec::new();

        for chunk in ids.chunks(BATCH_CHUNK_SIZE) {
            let mut query_builder =
                QueryBuilder::<Sqlite>::new("SELECT * FROM statuses WHERE id IN (");
            {
                let mut separated = query_builder.separated(", ");
                for id in chunk {
                    separated.push_bind(id);
                }
            }
            query_builder.push(")");

            let statuses = query_builder
                .build_query_as::<Status>()
                .fetch_all(&self.pool)
                .await?;
            all_statuses.extend(statuses);
        }

        Ok(all_statuses)
    }

    // =========================================================================
    // Reblogs
    // =========================================================================

    async fn insert_reblog_if_absent(&self, reblog: &Reblog) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO reblogs (id, account_id, status_id, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(account_id, status_id) DO NOTHING
            "#,
        )
        .bind(&reblog.id)
        .bind(&reblog.account_id)
        .bind(&reblog.status_id)
        .bind(reblog.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_reblog(
        &self,
        account_id: &str,
        status_id: &str,
    ) -> Result<Option<Reblog>, AppError> {
        let reblog = sqlx::query_as::<_, Reblog>(
            "SELECT * FROM reblogs WHERE account_id = ? AND status_id = ?",
        )
        .bind(account_id)
        .bind(status_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reblog)
    }

    async fn delete_reblog(&self, account_id: &str, status_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM reblogs WHERE account_id = ? AND status_id = ?")
            .bind(account_id)
            .bind(status_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_reblogs(&self, status_id: &str) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reblogs WHERE status_id = ?")
            .bind(status_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Announcements
    // =========================================================================

    async fn insert_announcement(&self, announcement: &Announcement) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO announcements (
                id, text, published, all_day, scheduled_at, starts_at, ends_at,
                published_at, status_ids, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&announcement.id)
        .bind(&announcement.text)
        .bind(announcement.published)
        .bind(announcement.all_day)
        .bind(announcement.scheduled_at)
        .bind(announcement.starts_at)
        .bind(announcement.ends_at)
        .bind(announcement.published_at)
        .bind(encode_status_ids(&announcement.status_ids)?)
        .bind(announcement.created_at)
        .bind(announcement.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_announcement(&self, announcement: &Announcement) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE announcements SET
                text = ?, published = ?, all_day = ?, scheduled_at = ?, starts_at = ?,
                ends_at = ?, published_at = ?, status_ids = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&announcement.text)
        .bind(announcement.published)
        .bind(announcement.all_day)
        .bind(announcement.scheduled_at)
        .bind(announcement.starts_at)
        .bind(announcement.ends_at)
        .bind(announcement.published_at)
        .bind(encode_status_ids(&announcement.status_ids)?)
        .bind(announcement.updated_at)
        .bind(&announcement.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_announcement(&self, id: &str) -> Result<Option<Announcement>, AppError> {
        let row = sqlx::query_as::<_, AnnouncementRow>("SELECT * FROM announcements WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Announcement::try_from).transpose()
    }

    async fn delete_announcement(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_all_announcements(&self) -> Result<Vec<Announcement>, AppError> {
        let rows = sqlx::query_as::<_, AnnouncementRow>("SELECT * FROM announcements")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Announcement::try_from).collect()
    }

    async fn get_announcements_by_published(
        &self,
        published: bool,
    ) -> Result<Vec<Announcement>, AppError> {
        let rows =
            sqlx::query_as::<_, AnnouncementRow>("SELECT * FROM announcements WHERE published = ?")
                .bind(published)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(Announcement::try_from).collect()
    }

    async fn get_due_scheduled_announcements(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Announcement>, AppError> {
        let rows = sqlx::query_as::<_, AnnouncementRow>(
            "SELECT * FROM announcements WHERE published = 0 AND scheduled_at IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await?;

        let announcements = rows
            .into_iter()
            .map(Announcement::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        // Compared as timestamps rather than TEXT
        Ok(announcements
            .into_iter()
            .filter(|announcement| announcement.scheduled_at.is_some_and(|at| at <= now))
            .collect())
    }

    async fn publish_scheduled(&self, id: &str, now: DateTime<Utc>) -> Result<bool, AppError> {
        // Timestamps are all written by chrono in one RFC 3339 form, so TEXT
        // comparison orders them correctly
        let result = sqlx::query(
            r#"
            UPDATE announcements SET
                published = 1, published_at = ?, scheduled_at = NULL, updated_at = ?
            WHERE id = ? AND published = 0 AND scheduled_at IS NOT NULL AND scheduled_at <= ?
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    // Announcement reactions
    // =========================================================================

    async fn insert_announcement_reaction_if_absent(
        &self,
        reaction: &AnnouncementReaction,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO announcement_reactions (id, announcement_id, account_id, name, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(account_id, announcement_id, name) DO NOTHING
            "#,
        )
        .bind(&reaction.id)
        .bind(&reaction.announcement_id)
        .bind(&reaction.account_id)
        .bind(&reaction.name)
        .bind(reaction.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_announcement_reaction(
        &self,
        announcement_id: &str,
        account_id: &str,
        name: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "DELETE FROM announcement_reactions WHERE announcement_id = ? AND account_id = ? AND name = ?",
        )
        .bind(announcement_id)
        .bind(account_id)
        .bind(name)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_announcement_reactions(
        &self,
        announcement_id: &str,
        account_id: Option<&str>,
    ) -> Result<Vec<AnnouncementReaction>, AppError> {
        let mut query_builder = QueryBuilder::<Sqlite>::new(
            "SELECT * FROM announcement_reactions WHERE announcement_id = ",
        );
        query_builder.push_bind(announcement_id);
        if let Some(account_id) = account_id {
            query_builder.push(" AND account_id = ");
            query_builder.push_bind(account_id);
        }
        query_builder.push(" ORDER BY created_at ASC, id ASC");

        let reactions = query_builder
            .build_query_as::<AnnouncementReaction>()
            .fetch_all(&self.pool)
            .await?;

        Ok(reactions)
    }

    // =========================================================================
    // Announcement mutes
    // =========================================================================

    async fn insert_announcement_mute_if_absent(
        &self,
        account_id: &str,
        announcement_id: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO announcement_mutes (id, account_id, announcement_id, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(account_id, announcement_id) DO NOTHING
            "#,
        )
        .bind(EntityId::new().0)
        .bind(account_id)
        .bind(announcement_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_muted_announcement_ids(
        &self,
        account_id: &str,
    ) -> Result<HashSet<String>, AppError> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT announcement_id FROM announcement_mutes WHERE account_id = ?",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().collect())
    }
}
