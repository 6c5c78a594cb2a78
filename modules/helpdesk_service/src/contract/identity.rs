//! Identity provider seam
//!
//! Authentication (password hashing, OAuth, token issuance) is owned by an
//! external provider; the helpdesk only talks to it through this trait.

use super::error::AuthError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated identity as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    /// Pending address while an email change awaits confirmation
    #[serde(default)]
    pub new_email: Option<String>,
}

/// Provider session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub user: Option<User>,
}

/// Session tokens as carried by request cookies
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCookies {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Start of a PKCE OAuth flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthRedirect {
    /// Provider authorize URL the browser is sent to
    pub url: String,
    /// Secret kept by the caller until the callback exchanges the code
    pub code_verifier: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Session carried by the request, if any. Does not validate it.
    async fn get_session(&self, cookies: &SessionCookies) -> Result<Option<Session>, AuthError>;

    /// Re-validate an access token against the provider.
    async fn get_user(&self, access_token: &str) -> Result<User, AuthError>;

    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<Session, AuthError>;

    /// Build the authorize URL for an OAuth provider.
    async fn sign_in_with_oauth(
        &self,
        provider: &str,
        redirect_to: &str,
    ) -> Result<OAuthRedirect, AuthError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        email_redirect_to: Option<&str>,
    ) -> Result<User, AuthError>;

    async fn update_user(
        &self,
        access_token: &str,
        update: &UserUpdate,
        email_redirect_to: Option<&str>,
    ) -> Result<User, AuthError>;

    async fn admin_delete_user(&self, user_id: Uuid) -> Result<(), AuthError>;

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), AuthError>;

    async fn exchange_code_for_session(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<Session, AuthError>;
}
