//! Reblog service
//!
//! Creates and removes the reblog relation between an account and a status.
//! The reblog count of a status is always the number of rows in `reblogs`;
//! uniqueness per (account, status) is enforced by the store, so concurrent
//! creates for the same pair converge on a single row.

use std::sync::Arc;

use chrono::Utc;

use super::visibility;
use crate::data::{Account, EntityId, PersistenceGateway, Reblog, Status};
use crate::error::AppError;
use crate::metrics::REBLOG_ACTIONS_TOTAL;

/// A status together with its reblog state for one viewer
#[derive(Debug, Clone)]
pub struct ReblogState {
    pub status: Status,
    pub reblogs_count: i64,
    pub reblogged: bool,
}

/// Reblog service
pub struct ReblogService {
    gateway: Arc<dyn PersistenceGateway>,
}

impl ReblogService {
    /// Create new reblog service
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self { gateway }
    }

    /// Reblog a status
    ///
    /// Idempotent: a second call for the same pair returns the existing
    /// relation and leaves the count untouched.
    ///
    /// # Errors
    /// `NotFound` if the status does not exist or `account` may not see it.
    pub async fn create(&self, account: &Account, status_id: &str) -> Result<Reblog, AppError> {
        let status = self.load_status(status_id).await?;

        if !visibility::can_view(self.gateway.as_ref(), &status, account).await? {
            tracing::debug!(
                account_id = %account.id,
                status_id = %status.id,
                visibility = status.visibility.as_str(),
                "Refusing reblog of status hidden from account"
            );
            return Err(AppError::NotFound);
        }

        let reblog = Reblog {
            id: EntityId::new().0,
            account_id: account.id.clone(),
            status_id: status.id.clone(),
            created_at: Utc::now(),
        };

        if self.gateway.insert_reblog_if_absent(&reblog).await? {
            REBLOG_ACTIONS_TOTAL.with_label_values(&["created"]).inc();
            tracing::info!(
                account_id = %account.id,
                status_id = %status.id,
                reblog_id = %reblog.id,
                "Status reblogged"
            );
            return Ok(reblog);
        }

        REBLOG_ACTIONS_TOTAL.with_label_values(&["existing"]).inc();
        self.gateway
            .get_reblog(&account.id, &status.id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!(
                    "reblog vanished between conflicting insert and lookup"
                ))
            })
    }

    /// Undo a reblog
    ///
    /// Blocks are not consulted: an account can withdraw its own earlier
    /// reblog after the author blocks it. Visibility still applies.
    ///
    /// # Errors
    /// `NotFound` if the status does not exist, `account` may not access
    /// it, or the account has no reblog of it.
    pub async fn destroy(&self, account: &Account, status_id: &str) -> Result<Reblog, AppError> {
        let status = self.load_status(status_id).await?;

        if !visibility::can_access(self.gateway.as_ref(), &status, account).await? {
            tracing::debug!(
                account_id = %account.id,
                status_id = %status.id,
                visibility = status.visibility.as_str(),
                "Refusing unreblog of status hidden from account"
            );
            return Err(AppError::NotFound);
        }

        let reblog = self
            .gateway
            .get_reblog(&account.id, &status.id)
            .await?
            .ok_or(AppError::NotFound)?;

        if !self.gateway.delete_reblog(&account.id, &status.id).await? {
            // Removed by a concurrent request
            return Err(AppError::NotFound);
        }

        REBLOG_ACTIONS_TOTAL.with_label_values(&["destroyed"]).inc();
        tracing::info!(
            account_id = %account.id,
            status_id = %status.id,
            reblog_id = %reblog.id,
            "Reblog removed"
        );

        Ok(reblog)
    }

    /// Number of active reblogs of a status
    pub async fn reblogs_count(&self, status_id: &str) -> Result<i64, AppError> {
        self.gateway.count_reblogs(status_id).await
    }

    /// Whether `account` currently reblogs the status
    pub async fn is_reblogged(&self, status_id: &str, account: &Account) -> Result<bool, AppError> {
        Ok(self.gateway.get_reblog(&account.id, status_id).await?.is_some())
    }

    /// Current reblog state of a status as seen by `account`
    pub async fn state(&self, status_id: &str, account: &Account) -> Result<ReblogState, AppError> {
        let status = self.load_status(status_id).await?;
        let reblogs_count = self.reblogs_count(&status.id).await?;
        let reblogged = self.is_reblogged(&status.id, account).await?;

        Ok(ReblogState {
            status,
            reblogs_count,
            reblogged,
        })
    }

    async fn load_status(&self, status_id: &str) -> Result<Status, AppError> {
        self.gateway
            .get_status(status_id)
            .await?
            .ok_or(AppError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Database, Visibility};
    use tempfile::TempDir;

    async fn create_test_db() -> (Arc<Database>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("service-reblog.db");
        let db = Database::connect(&db_path).await.unwrap();
        (Arc::new(db), temp_dir)
    }

    async fn seed_status(db: &Database, author: &Account, visibility: Visibility) -> Status {
        let status = Status {
            id: EntityId::new().0,
            account_id: author.id.clone(),
            content: "<p>boost me</p>".to_string(),
            visibility,
            created_at: Utc::now(),
        };
        db.insert_status(&status).await.unwrap();
        status
    }

    struct Fixture {
        db: Arc<Database>,
        service: ReblogService,
        author: Account,
        reader: Account,
        _temp_dir: TempDir,
    }

    async fn fixture() -> Fixture {
        let (db, temp_dir) = create_test_db().await;
        let author = db.create_account("author", false).await.unwrap();
        let reader = db.create_account("reader", false).await.unwrap();
        let service = ReblogService::new(db.clone());
        Fixture {
            db,
            service,
            author,
            reader,
            _temp_dir: temp_dir,
        }
    }

    #[tokio::test]
    async fn create_then_destroy_roundtrip_on_public_status() {
        let f = fixture().await;
        let status = seed_status(&f.db, &f.author, Visibility::Public).await;
        assert_eq!(f.service.reblogs_count(&status.id).await.unwrap(), 0);

        let reblog = f.service.create(&f.reader, &status.id).await.unwrap();
        assert_eq!(reblog.status_id, status.id);
        assert_eq!(reblog.account_id, f.reader.id);
        let state = f.service.state(&status.id, &f.reader).await.unwrap();
        assert_eq!(state.reblogs_count, 1);
        assert!(state.reblogged);

        f.service.destroy(&f.reader, &status.id).await.unwrap();
        let state = f.service.state(&status.id, &f.reader).await.unwrap();
        assert_eq!(state.reblogs_count, 0);
        assert!(!state.reblogged);
    }

    #[tokio::test]
    async fn create_is_idempotent() {
        let f = fixture().await;
        let status = seed_status(&f.db, &f.author, Visibility::Unlisted).await;

        let first = f.service.create(&f.reader, &status.id).await.unwrap();
        let second = f.service.create(&f.reader, &status.id).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(f.service.reblogs_count(&status.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_creates_leave_a_single_row() {
        let f = fixture().await;
        let status = seed_status(&f.db, &f.author, Visibility::Public).await;
        let service = Arc::new(f.service);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            let reader = f.reader.clone();
            let status_id = status.id.clone();
            handles.push(tokio::spawn(async move {
                service.create(&reader, &status_id).await.map(|r| r.id)
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap());
        }
        ids.dedup();

        assert_eq!(ids.len(), 1);
        assert_eq!(service.reblogs_count(&status.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn create_on_private_status_of_unfollowed_author_is_not_found() {
        let f = fixture().await;
        let status = seed_status(&f.db, &f.author, Visibility::Private).await;

        let error = f.service.create(&f.reader, &status.id).await.unwrap_err();
        assert!(matches!(error, AppError::NotFound));
        assert_eq!(f.service.reblogs_count(&status.id).await.unwrap(), 0);
        assert!(!f.service.is_reblogged(&status.id, &f.reader).await.unwrap());
    }

    #[tokio::test]
    async fn create_on_private_status_of_followed_author_succeeds() {
        let f = fixture().await;
        let status = seed_status(&f.db, &f.author, Visibility::Private).await;
        f.db.insert_follow(&f.reader.id, &f.author.id).await.unwrap();

        f.service.create(&f.reader, &status.id).await.unwrap();
        assert_eq!(f.service.reblogs_count(&status.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn create_on_direct_status_is_not_found() {
        let f = fixture().await;
        let status = seed_status(&f.db, &f.author, Visibility::Direct).await;

        let error = f.service.create(&f.reader, &status.id).await.unwrap_err();
        assert!(matches!(error, AppError::NotFound));
    }

    #[tokio::test]
    async fn create_on_missing_status_is_not_found() {
        let f = fixture().await;
        let error = f.service.create(&f.reader, "missing").await.unwrap_err();
        assert!(matches!(error, AppError::NotFound));
    }

    #[tokio::test]
    async fn create_when_blocked_by_author_is_not_found() {
        let f = fixture().await;
        let status = seed_status(&f.db, &f.author, Visibility::Public).await;
        f.db.insert_block(&f.author.id, &f.reader.id).await.unwrap();

        let error = f.service.create(&f.reader, &status.id).await.unwrap_err();
        assert!(matches!(error, AppError::NotFound));
    }

    #[tokio::test]
    async fn destroy_succeeds_after_author_blocks_reblogger() {
        let f = fixture().await;
        let status = seed_status(&f.db, &f.author, Visibility::Public).await;
        f.service.create(&f.reader, &status.id).await.unwrap();
        f.db.insert_block(&f.author.id, &f.reader.id).await.unwrap();

        f.service.destroy(&f.reader, &status.id).await.unwrap();
        assert_eq!(f.service.reblogs_count(&status.id).await.unwrap(), 0);
        assert!(!f.service.is_reblogged(&status.id, &f.reader).await.unwrap());
    }

    #[tokio::test]
    async fn destroy_on_private_never_reblogged_status_is_not_found() {
        let f = fixture().await;
        let status = seed_status(&f.db, &f.author, Visibility::Private).await;

        let error = f.service.destroy(&f.reader, &status.id).await.unwrap_err();
        assert!(matches!(error, AppError::NotFound));
    }

    #[tokio::test]
    async fn destroy_only_removes_own_reblog() {
        let f = fixture().await;
        let other = f.db.create_account("other", false).await.unwrap();
        let status = seed_status(&f.db, &f.author, Visibility::Public).await;
        f.service.create(&f.reader, &status.id).await.unwrap();
        f.service.create(&other, &status.id).await.unwrap();
        assert_eq!(f.service.reblogs_count(&status.id).await.unwrap(), 2);

        f.service.destroy(&f.reader, &status.id).await.unwrap();
        assert_eq!(f.service.reblogs_count(&status.id).await.unwrap(), 1);
        assert!(f.service.is_reblogged(&status.id, &other).await.unwrap());

        let error = f.service.destroy(&f.reader, &status.id).await.unwrap_err();
        assert!(matches!(error, AppError::NotFound));
    }

    #[tokio::test]
    async fn destroy_after_unfollowing_private_author_is_not_found() {
        let f = fixture().await;
        let status = seed_status(&f.db, &f.author, Visibility::Private).await;
        f.db.insert_follow(&f.reader.id, &f.author.id).await.unwrap();
        f.service.create(&f.reader, &status.id).await.unwrap();

        f.db.delete_follow(&f.reader.id, &f.author.id).await.unwrap();

        let error = f.service.destroy(&f.reader, &status.id).await.unwrap_err();
        assert!(matches!(error, AppError::NotFound));
        assert_eq!(f.service.reblogs_count(&status.id).await.unwrap(), 1);
    }
}
