//! Authentication extractors
//!
//! Resolves `Authorization: Bearer <token>` to a local account.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, request::Parts},
};

use crate::AppState;
use crate::data::{Account, PersistenceGateway, hash_access_token};
use crate::error::AppError;

fn extract_token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(ToOwned::to_owned)
}

async fn authenticate_token(token: &str, state: &AppState) -> Result<Account, AppError> {
    state
        .db
        .get_account_by_token_digest(&hash_access_token(token))
        .await?
        .ok_or(AppError::Unauthorized)
}

async fn resolve_account(parts: &mut Parts, state: &AppState) -> Result<Account, AppError> {
    if let Some(account) = parts.extensions.get::<Account>().cloned() {
        return Ok(account);
    }

    let token = extract_token_from_headers(&parts.headers).ok_or(AppError::Unauthorized)?;
    let account = authenticate_token(&token, state).await?;
    parts.extensions.insert(account.clone());

    Ok(account)
}

/// Extractor for the authenticated account
///
/// # Usage
/// ```ignore
/// async fn handler(
///     CurrentAccount(account): CurrentAccount,
/// ) -> impl IntoResponse {
///     format!("Hello, {}", account.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub Account);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentAccount
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        Ok(CurrentAccount(resolve_account(parts, &state).await?))
    }
}

/// Optional account extractor
///
/// Returns None when no bearer token is sent. A token that is sent but
/// does not resolve is rejected like with [`CurrentAccount`].
#[derive(Debug, Clone)]
pub struct MaybeAccount(pub Option<Account>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAccount
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if extract_token_from_headers(&parts.headers).is_none() {
            return Ok(MaybeAccount(None));
        }

        let state = AppState::from_ref(state);
        Ok(MaybeAccount(Some(resolve_account(parts, &state).await?)))
    }
}

/// Extractor for an authenticated administrator
///
/// Rejects with 401 without a valid token and 403 for non-admins.
#[derive(Debug, Clone)]
pub struct AdminAccount(pub Account);

#[async_trait]
impl<S> FromRequestParts<S> for AdminAccount
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let account = resolve_account(parts, &state).await?;
        if !account.is_admin {
            tracing::debug!(account_id = %account.id, "Non-admin account refused");
            return Err(AppError::Forbidden);
        }

        Ok(AdminAccount(account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(
            extract_token_from_headers(&headers("Bearer abc123")),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn ignores_other_schemes_and_empty_tokens() {
        assert_eq!(extract_token_from_headers(&headers("Basic abc123")), None);
        assert_eq!(extract_token_from_headers(&headers("Bearer ")), None);
        assert_eq!(extract_token_from_headers(&HeaderMap::new()), None);
    }
}
