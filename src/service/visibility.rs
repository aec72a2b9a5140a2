//! Status visibility policy
//!
//! Decides whether an account may see (and therefore act on) a status.
//! Callers turn a negative answer into `AppError::NotFound` so that hidden
//! statuses are indistinguishable from missing ones.

use crate::data::{Account, PersistenceGateway, Status, Visibility};
use crate::error::AppError;

/// Whether `account` may see `status`
///
/// - The author always sees their own statuses.
/// - An account blocked by the author sees nothing of theirs.
/// - Otherwise [`can_access`] decides.
pub async fn can_view(
    gateway: &dyn PersistenceGateway,
    status: &Status,
    account: &Account,
) -> Result<bool, AppError> {
    if status.account_id == account.id {
        return Ok(true);
    }

    if gateway.is_blocking(&status.account_id, &account.id).await? {
        return Ok(false);
    }

    can_access(gateway, status, account).await
}

/// Visibility rule without block checks
///
/// - Authors can access their own statuses.
/// - Public and unlisted statuses are accessible to everyone.
/// - Private statuses require following the author.
/// - Direct statuses are only accessible to the author.
pub async fn can_access(
    gateway: &dyn PersistenceGateway,
    status: &Status,
    account: &Account,
) -> Result<bool, AppError> {
    if status.account_id == account.id {
        return Ok(true);
    }

    match status.visibility {
        Visibility::Public | Visibility::Unlisted => Ok(true),
        Visibility::Private => gateway.is_following(&account.id, &status.account_id).await,
        Visibility::Direct => Ok(false),
    }
}
