//! GoTrue-compatible identity provider client

use crate::config::AuthConfig;
use crate::contract::{
    AuthError, IdentityProvider, OAuthRedirect, Session, SessionCookies, User, UserUpdate,
};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;
use uuid::Uuid;

const VERIFIER_LENGTH: usize = 64;

pub struct GoTrueClient {
    config: AuthConfig,
    client: Client,
}

/// Sign-up answers with a session when email confirmation is off, a bare user otherwise.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(Session),
    User(User),
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl GoTrueClient {
    pub fn new(config: AuthConfig) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn with_redirect(&self, path: &str, redirect_to: Option<&str>) -> Result<Url, AuthError> {
        let mut url =
            Url::parse(&self.endpoint(path)).map_err(|e| AuthError::NotConfigured(e.to_string()))?;
        if let Some(redirect_to) = redirect_to {
            url.query_pairs_mut().append_pair("redirect_to", redirect_to);
        }
        Ok(url)
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", &self.config.anon_key)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, AuthError> {
        let response = builder
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: ErrorBody = response.json().await.unwrap_or_default();
        let message = body
            .msg
            .or(body.error_description)
            .or(body.message)
            .or(body.error)
            .unwrap_or_else(|| status.to_string());
        debug!(status = status.as_u16(), %message, "identity provider rejected request");
        Err(AuthError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, AuthError> {
        self.send(builder)
            .await?
            .json()
            .await
            .map_err(|e| AuthError::Decode(e.to_string()))
    }
}

/// `base64url(sha256(verifier))` without padding
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    async fn get_session(&self, cookies: &SessionCookies) -> Result<Option<Session>, AuthError> {
        Ok(cookies
            .access_token
            .as_ref()
            .filter(|token| !token.is_empty())
            .map(|access_token| Session {
                access_token: access_token.clone(),
                refresh_token: cookies.refresh_token.clone(),
                expires_in: None,
                user: None,
            }))
    }

    async fn get_user(&self, access_token: &str) -> Result<User, AuthError> {
        let builder = self
            .request(self.client.get(self.endpoint("user")))
            .bearer_auth(access_token);
        self.send_json(builder).await
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let builder = self
            .request(self.client.post(self.endpoint("token")))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        self.send_json(builder).await
    }

    async fn sign_in_with_oauth(
        &self,
        provider: &str,
        redirect_to: &str,
    ) -> Result<OAuthRedirect, AuthError> {
        let code_verifier = nanoid::nanoid!(VERIFIER_LENGTH);
        let challenge = code_challenge(&code_verifier);

        let mut url = Url::parse(&self.endpoint("authorize"))
            .map_err(|e| AuthError::NotConfigured(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("provider", provider)
            .append_pair("redirect_to", redirect_to)
            .append_pair("code_challenge", &challenge)
            .append_pair("code_challenge_method", "s256");

        Ok(OAuthRedirect {
            url: url.into(),
            code_verifier,
        })
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        email_redirect_to: Option<&str>,
    ) -> Result<User, AuthError> {
        let url = self.with_redirect("signup", email_redirect_to)?;
        let builder = self
            .request(self.client.post(url))
            .json(&json!({ "email": email, "password": password }));

        match self.send_json::<SignUpResponse>(builder).await? {
            SignUpResponse::Session(Session { user: Some(user), .. }) => Ok(user),
            SignUpResponse::Session(_) => {
                Err(AuthError::Decode("sign-up session carried no user".to_string()))
            }
            SignUpResponse::User(user) => Ok(user),
        }
    }

    async fn update_user(
        &self,
        access_token: &str,
        update: &UserUpdate,
        email_redirect_to: Option<&str>,
    ) -> Result<User, AuthError> {
        let url = self.with_redirect("user", email_redirect_to)?;
        let builder = self
            .request(self.client.put(url))
            .bearer_auth(access_token)
            .json(update);
        self.send_json(builder).await
    }

    async fn admin_delete_user(&self, user_id: Uuid) -> Result<(), AuthError> {
        let service_key = self
            .config
            .service_role_key
            .as_deref()
            .ok_or_else(|| AuthError::NotConfigured("service_role_key".to_string()))?;

        let builder = self
            .client
            .delete(self.endpoint(&format!("admin/users/{user_id}")))
            .header("apikey", service_key)
            .bearer_auth(service_key)
            .json(&json!({ "should_soft_delete": false }));
        self.send(builder).await?;
        Ok(())
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), AuthError> {
        let url = self.with_redirect("recover", redirect_to)?;
        let builder = self
            .request(self.client.post(url))
            .json(&json!({ "email": email }));
        self.send(builder).await?;
        Ok(())
    }

    async fn exchange_code_for_session(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<Session, AuthError> {
        let builder = self
            .request(self.client.post(self.endpoint("token")))
            .query(&[("grant_type", "pkce")])
            .json(&json!({ "auth_code": code, "code_verifier": code_verifier }));
        self.send_json(builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_matches_rfc7636_example() {
        assert_eq!(
            code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[tokio::test]
    async fn session_comes_from_cookies_without_a_round_trip() {
        let client = GoTrueClient::new(AuthConfig::default()).unwrap();

        let none = client.get_session(&SessionCookies::default()).await.unwrap();
        assert_eq!(none, None);

        let cookies = SessionCookies {
            access_token: Some("jwt".to_string()),
            refresh_token: Some("refresh".to_string()),
        };
        let session = client.get_session(&cookies).await.unwrap().unwrap();
        assert_eq!(session.access_token, "jwt");
        assert_eq!(session.refresh_token.as_deref(), Some("refresh"));
    }

    #[tokio::test]
    async fn oauth_url_carries_pkce_challenge() {
        let client = GoTrueClient::new(AuthConfig {
            base_url: "https://project.example.com/".to_string(),
            ..AuthConfig::default()
        })
        .unwrap();

        let redirect = client
            .sign_in_with_oauth("google", "http://localhost:8080/auth/callback")
            .await
            .unwrap();
        assert_eq!(redirect.code_verifier.len(), VERIFIER_LENGTH);

        let url = Url::parse(&redirect.url).unwrap();
        assert_eq!(url.path(), "/auth/v1/authorize");
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["provider"], "google");
        assert_eq!(pairs["redirect_to"], "http://localhost:8080/auth/callback");
        assert_eq!(pairs["code_challenge"], code_challenge(&redirect.code_verifier));
        assert_eq!(pairs["code_challenge_method"], "s256");
    }
}
