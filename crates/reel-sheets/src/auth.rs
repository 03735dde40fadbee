//! Bearer tokens for the Sheets API.
//!
//! `gcp_auth::CustomServiceAccount` caches its token internally, so the
//! service account source only adds two things: a refresh margin, and a way
//! to discard the cached token after the API rejects it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gcp_auth::{CustomServiceAccount, TokenProvider};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{SheetsError, SheetsResult};

/// OAuth scope for reading and writing spreadsheets.
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Tokens closer than this to expiry are replaced before use.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Anything that can hand out bearer tokens for the Sheets API.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn token(&self) -> SheetsResult<String>;

    /// Forget the current token so the next call fetches a new one.
    async fn invalidate(&self) -> SheetsResult<()> {
        Ok(())
    }
}

/// Fixed token, for tests and pre-authorised environments.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn token(&self) -> SheetsResult<String> {
        Ok(self.0.clone())
    }
}

/// Whether a token expiring at `expires_at` can still be sent at `now`.
fn outlives_margin(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    (expires_at - now).num_seconds() > TOKEN_REFRESH_MARGIN_SECS
}

/// Tokens minted from a service account key file.
pub struct ServiceAccountToken {
    path: PathBuf,
    account: RwLock<Arc<CustomServiceAccount>>,
}

impl ServiceAccountToken {
    pub fn from_file(path: impl AsRef<Path>) -> SheetsResult<Self> {
        let path = path.as_ref().to_path_buf();
        let account = Self::load(&path)?;
        Ok(Self {
            path,
            account: RwLock::new(Arc::new(account)),
        })
    }

    fn load(path: &Path) -> SheetsResult<CustomServiceAccount> {
        CustomServiceAccount::from_file(path).map_err(|e| {
            SheetsError::auth_error(format!(
                "Failed to load service account {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Replace the account, and with it the token cached inside `gcp_auth`.
    async fn reload(&self) -> SheetsResult<()> {
        let account = Self::load(&self.path)?;
        *self.account.write().await = Arc::new(account);
        Ok(())
    }

    async fn fetch(&self) -> SheetsResult<Arc<gcp_auth::Token>> {
        let account = self.account.read().await.clone();
        account
            .token(&[SHEETS_SCOPE])
            .await
            .map_err(|e| SheetsError::auth_error(format!("Failed to obtain auth token: {}", e)))
    }
}

#[async_trait]
impl AccessTokenSource for ServiceAccountToken {
    async fn token(&self) -> SheetsResult<String> {
        let token = self.fetch().await?;
        if outlives_margin(token.expires_at(), Utc::now()) {
            return Ok(token.as_str().to_string());
        }

        debug!(expires_at = %token.expires_at(), "Sheets token near expiry, minting a new one");
        self.reload().await?;
        Ok(self.fetch().await?.as_str().to_string())
    }

    async fn invalidate(&self) -> SheetsResult<()> {
        self.reload().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_token_near_expiry_is_replaced() {
        let now = Utc::now();
        assert!(outlives_margin(now + Duration::minutes(30), now));
        assert!(!outlives_margin(now + Duration::seconds(30), now));
        assert!(!outlives_margin(now - Duration::seconds(1), now));
    }

    #[test]
    fn test_sheets_scope() {
        assert!(SHEETS_SCOPE.ends_with("/auth/spreadsheets"));
    }

    #[test]
    fn test_unreadable_key_file_is_an_auth_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("service_account.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let err = ServiceAccountToken::from_file(&path).err().unwrap();
        assert!(matches!(err, SheetsError::AuthError(_)));
        assert!(err.to_string().contains("service_account.json"));
    }

    #[tokio::test]
    async fn test_static_token_ignores_invalidate() {
        let source = StaticToken("abc".into());
        source.invalidate().await.unwrap();
        assert_eq!(source.token().await.unwrap(), "abc");
    }
}
