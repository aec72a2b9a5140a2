//! Persistence contract used by the service layer
//!
//! Services only talk to storage through [`PersistenceGateway`]; the SQLite
//! [`Database`](super::Database) is the production implementation.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::models::*;
use crate::error::AppError;

#[async_trait]
pub trait PersistenceGateway: Send + Sync + 'static {
    // Accounts and relationships
    async fn get_account(&self, id: &str) -> Result<Option<Account>, AppError>;
    async fn get_account_by_token_digest(&self, digest: &str)
    -> Result<Option<Account>, AppError>;
    /// Whether `account_id` follows `target_account_id`
    async fn is_following(
        &self,
        account_id: &str,
        target_account_id: &str,
    ) -> Result<bool, AppError>;
    /// Whether `account_id` blocks `target_account_id`
    async fn is_blocking(
        &self,
        account_id: &str,
        target_account_id: &str,
    ) -> Result<bool, AppError>;

    // Statuses
    async fn get_status(&self, id: &str) -> Result<Option<Status>, AppError>;
    /// Batch lookup; result order is unspecified and unknown ids are skipped
    async fn get_statuses_by_ids(&self, ids: &[String]) -> Result<Vec<Status>, AppError>;

    // Reblogs
    /// Insert unless a row for the same (account, status) pair exists.
    ///
    /// Returns `true` if this call inserted the row.
    async fn insert_reblog_if_absent(&self, reblog: &Reblog) -> Result<bool, AppError>;
    async fn get_reblog(&self, account_id: &str, status_id: &str)
    -> Result<Option<Reblog>, AppError>;
    async fn delete_reblog(&self, account_id: &str, status_id: &str) -> Result<bool, AppError>;
    async fn count_reblogs(&self, status_id: &str) -> Result<i64, AppError>;

    // Announcements
    async fn insert_announcement(&self, announcement: &Announcement) -> Result<(), AppError>;
    async fn update_announcement(&self, announcement: &Announcement) -> Result<bool, AppError>;
    async fn get_announcement(&self, id: &str) -> Result<Option<Announcement>, AppError>;
    async fn delete_announcement(&self, id: &str) -> Result<bool, AppError>;
    async fn get_all_announcements(&self) -> Result<Vec<Announcement>, AppError>;
    async fn get_announcements_by_published(
        &self,
        published: bool,
    ) -> Result<Vec<Announcement>, AppError>;
    /// Unpublished announcements with `scheduled_at <= now`
    async fn get_due_scheduled_announcements(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Announcement>, AppError>;
    /// Publish one announcement only if it is still unpublished and due.
    ///
    /// Touches the publication columns alone, so concurrent edits survive.
    async fn publish_scheduled(&self, id: &str, now: DateTime<Utc>) -> Result<bool, AppError>;

    // Announcement reactions
    /// Insert unless an identical attributed reaction exists.
    async fn insert_announcement_reaction_if_absent(
        &self,
        reaction: &AnnouncementReaction,
    ) -> Result<bool, AppError>;
    async fn delete_announcement_reaction(
        &self,
        announcement_id: &str,
        account_id: &str,
        name: &str,
    ) -> Result<bool, AppError>;
    /// Reactions ordered by creation time ascending.
    ///
    /// With `account_id`, only that account's reactions are returned.
    async fn get_announcement_reactions(
        &self,
        announcement_id: &str,
        account_id: Option<&str>,
    ) -> Result<Vec<AnnouncementReaction>, AppError>;

    // Announcement mutes
    async fn insert_announcement_mute_if_absent(
        &self,
        account_id: &str,
        announcement_id: &str,
    ) -> Result<bool, AppError>;
    async fn get_muted_announcement_ids(
        &self,
        account_id: &str,
    ) -> Result<HashSet<String>, AppError>;
}
