//! Configuration for the helpdesk service module and its external clients

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Helpdesk module configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Maximum profiles returned by the chat-list search
    #[serde(default = "default_profile_search_limit")]
    pub profile_search_limit: u64,

    /// Maximum avatar upload size in bytes
    #[serde(default = "default_max_avatar_bytes")]
    pub max_avatar_bytes: usize,

    /// Bucket avatars are uploaded to
    #[serde(default = "default_avatar_bucket")]
    pub avatar_bucket: String,

    /// Maximum message length in characters
    #[serde(default = "default_message_max_length")]
    pub message_max_length: usize,

    /// OAuth providers offered on sign-up
    #[serde(default = "default_oauth_providers")]
    pub oauth_providers: Vec<String>,

    #[serde(default)]
    pub cookies: CookieConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile_search_limit: default_profile_search_limit(),
            max_avatar_bytes: default_max_avatar_bytes(),
            avatar_bucket: default_avatar_bucket(),
            message_max_length: default_message_max_length(),
            oauth_providers: default_oauth_providers(),
            cookies: CookieConfig::default(),
        }
    }
}

/// Session cookie names and flags
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CookieConfig {
    #[serde(default = "default_access_cookie")]
    pub access_token: String,

    #[serde(default = "default_refresh_cookie")]
    pub refresh_token: String,

    /// Holds the PKCE verifier between OAuth start and callback
    #[serde(default = "default_verifier_cookie")]
    pub code_verifier: String,

    /// Mark cookies `Secure` (HTTPS only)
    #[serde(default)]
    pub secure: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            access_token: default_access_cookie(),
            refresh_token: default_refresh_cookie(),
            code_verifier: default_verifier_cookie(),
            secure: false,
        }
    }
}

/// GoTrue-compatible identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Project URL; endpoints live under `{base_url}/auth/v1`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub anon_key: String,

    /// Required only for account deletion
    #[serde(default)]
    pub service_role_key: Option<String>,

    /// Public origin of this service, used for email and OAuth redirects
    #[serde(default = "default_public_domain")]
    pub public_domain: String,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            anon_key: String::new(),
            service_role_key: None,
            public_domain: default_public_domain(),
            timeout: default_timeout(),
        }
    }
}

/// Object storage API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Project URL; endpoints live under `{base_url}/storage/v1`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub key: String,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            key: String::new(),
            timeout: default_timeout(),
        }
    }
}

fn default_profile_search_limit() -> u64 {
    5
}

fn default_max_avatar_bytes() -> usize {
    5 * 1024 * 1024 // 5MiB
}

fn default_avatar_bucket() -> String {
    "avatars".to_string()
}

fn default_message_max_length() -> usize {
    2000
}

fn default_oauth_providers() -> Vec<String> {
    vec!["google".to_string()]
}

fn default_access_cookie() -> String {
    "sb-access-token".to_string()
}

fn default_refresh_cookie() -> String {
    "sb-refresh-token".to_string()
}

fn default_verifier_cookie() -> String {
    "sb-code-verifier".to_string()
}

fn default_base_url() -> String {
    "http://localhost:54321".to_string()
}

fn default_public_domain() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}
