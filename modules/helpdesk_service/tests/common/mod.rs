//! Common test utilities: in-memory store, fake identity provider and object storage
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use helpdesk_service::contract::*;
use helpdesk_service::domain::repository::{RowStore, TableRepository};
use helpdesk_service::infra::storage::QueryExecutor;
use helpdesk_service::{Config, HelpdeskServiceModule};
use parking_lot::RwLock;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub const PASSWORD: &str = "secret-password";

/// Fresh in-memory sqlite with migrations applied
///
/// One pooled connection: every sqlite in-memory connection is its own database.
pub async fn setup_db() -> Arc<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("in-memory sqlite connects");
    HelpdeskServiceModule::migrate(&db)
        .await
        .expect("schema migrations apply on a fresh database");
    Arc::new(db)
}

pub fn print_test_header(test_name: &str, purpose: &str) {
    println!("\n🧪 TEST: {}", test_name);
    println!("📋 PURPOSE: {}", purpose);
}

// ===== Identity provider fake =====

#[derive(Debug, Clone)]
struct Account {
    user: User,
    password: String,
}

#[derive(Default)]
pub struct InMemoryIdentity {
    accounts: RwLock<HashMap<Uuid, Account>>,
    tokens: RwLock<HashMap<String, Uuid>>,
    codes: RwLock<HashMap<String, Uuid>>,
    pub recovery_emails: RwLock<Vec<String>>,
    pub deleted: RwLock<Vec<Uuid>>,
    pub fail_admin_delete: RwLock<bool>,
}

impl InMemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, email: &str, password: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            new_email: None,
        };
        self.accounts.write().insert(
            user.id,
            Account {
                user: user.clone(),
                password: password.to_string(),
            },
        );
        user
    }

    pub fn issue_session(&self, user: &User) -> Session {
        let token = format!("token-{}", Uuid::new_v4());
        self.tokens.write().insert(token.clone(), user.id);
        Session {
            access_token: token,
            refresh_token: Some(format!("refresh-{}", Uuid::new_v4())),
            expires_in: Some(3600),
            user: Some(user.clone()),
        }
    }

    /// Make `code` exchangeable for a session of `user_id`
    pub fn add_code(&self, code: &str, user_id: Uuid) {
        self.codes.write().insert(code.to_string(), user_id);
    }

    pub fn user(&self, user_id: Uuid) -> Option<User> {
        self.accounts.read().get(&user_id).map(|a| a.user.clone())
    }

    pub fn password_of(&self, user_id: Uuid) -> Option<String> {
        self.accounts.read().get(&user_id).map(|a| a.password.clone())
    }

    fn rejected(message: &str) -> AuthError {
        AuthError::Rejected {
            status: 400,
            message: message.to_string(),
        }
    }

    fn user_for_token(&self, token: &str) -> Result<User, AuthError> {
        let user_id = self
            .tokens
            .read()
            .get(token)
            .copied()
            .ok_or_else(|| AuthError::Rejected {
                status: 401,
                message: "invalid JWT".to_string(),
            })?;
        self.user(user_id).ok_or_else(|| Self::rejected("User not found"))
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentity {
    async fn get_session(&self, cookies: &SessionCookies) -> Result<Option<Session>, AuthError> {
        Ok(cookies.access_token.as_ref().map(|token| Session {
            access_token: token.clone(),
            refresh_token: cookies.refresh_token.clone(),
            expires_in: None,
            user: None,
        }))
    }

    async fn get_user(&self, access_token: &str) -> Result<User, AuthError> {
        self.user_for_token(access_token)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let user = self
            .accounts
            .read()
            .values()
            .find(|a| a.user.email.as_deref() == Some(email) && a.password == password)
            .map(|a| a.user.clone())
            .ok_or_else(|| Self::rejected("Invalid login credentials"))?;
        Ok(self.issue_session(&user))
    }

    async fn sign_in_with_oauth(&self, provider: &str, redirect_to: &str) -> Result<OAuthRedirect, AuthError> {
        Ok(OAuthRedirect {
            url: format!("https://idp.test/authorize?provider={provider}&redirect_to={redirect_to}"),
            code_verifier: "test-verifier".to_string(),
        })
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _email_redirect_to: Option<&str>,
    ) -> Result<User, AuthError> {
        let taken = self
            .accounts
            .read()
            .values()
            .any(|a| a.user.email.as_deref() == Some(email));
        if taken {
            return Err(Self::rejected("User already registered"));
        }
        Ok(self.register(email, password))
    }

    async fn update_user(
        &self,
        access_token: &str,
        update: &UserUpdate,
        _email_redirect_to: Option<&str>,
    ) -> Result<User, AuthError> {
        let user = self.user_for_token(access_token)?;
        let mut accounts = self.accounts.write();
        let account = accounts
            .get_mut(&user.id)
            .ok_or_else(|| Self::rejected("User not found"))?;
        if let Some(password) = &update.password {
            account.password = password.clone();
        }
        if let Some(email) = &update.email {
            account.user.new_email = Some(email.clone());
        }
        Ok(account.user.clone())
    }

    async fn admin_delete_user(&self, user_id: Uuid) -> Result<(), AuthError> {
        if *self.fail_admin_delete.read() {
            return Err(AuthError::Transport("connection reset".to_string()));
        }
        self.accounts.write().remove(&user_id);
        self.deleted.write().push(user_id);
        Ok(())
    }

    async fn reset_password_for_email(&self, email: &str, _redirect_to: Option<&str>) -> Result<(), AuthError> {
        self.recovery_emails.write().push(email.to_string());
        Ok(())
    }

    async fn exchange_code_for_session(&self, code: &str, code_verifier: &str) -> Result<Session, AuthError> {
        if code_verifier.is_empty() {
            return Err(Self::rejected("code verifier required"));
        }
        let user_id = self
            .codes
            .write()
            .remove(code)
            .ok_or_else(|| Self::rejected("invalid flow state"))?;
        let user = self.user(user_id).ok_or_else(|| Self::rejected("User not found"))?;
        Ok(self.issue_session(&user))
    }
}

// ===== Object storage fake =====

#[derive(Default)]
pub struct InMemoryStorage {
    pub objects: RwLock<HashMap<String, (Bytes, String)>>,
}

#[async_trait]
impl ObjectStorage for InMemoryStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Bytes,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), StorageError> {
        let key = format!("{bucket}/{path}");
        let mut objects = self.objects.write();
        if !upsert && objects.contains_key(&key) {
            return Err(StorageError::Rejected {
                status: 409,
                message: "The resource already exists".to_string(),
            });
        }
        objects.insert(key, (bytes, content_type.to_string()));
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("https://cdn.test/{bucket}/{path}")
    }
}

// ===== Application harness =====

/// A signed-in caller
#[derive(Debug, Clone)]
pub struct Actor {
    pub user: User,
    pub session: Session,
    pub profile: Option<Profile>,
}

impl Actor {
    pub fn ctx(&self) -> RequestContext {
        RequestContext::authenticated(self.user.clone(), self.session.clone(), self.profile.clone())
    }

    pub fn profile_id(&self) -> Uuid {
        self.profile.as_ref().map(|p| p.id).unwrap()
    }

    pub fn cookie_header(&self) -> String {
        format!("sb-access-token={}", self.session.access_token)
    }
}

pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub store: Arc<QueryExecutor>,
    pub identity: Arc<InMemoryIdentity>,
    pub storage: Arc<InMemoryStorage>,
    pub module: HelpdeskServiceModule,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let db = setup_db().await;
        let identity = Arc::new(InMemoryIdentity::new());
        let storage = Arc::new(InMemoryStorage::default());
        let module = HelpdeskServiceModule::new(
            config,
            db.clone(),
            identity.clone(),
            storage.clone(),
            "http://helpdesk.test",
        );
        Self {
            store: Arc::new(QueryExecutor::new(db.clone())),
            db,
            identity,
            storage,
            module,
        }
    }

    pub fn rows(&self) -> Arc<dyn RowStore> {
        self.store.clone()
    }

    pub fn profiles(&self) -> TableRepository<Profile> {
        TableRepository::new(self.rows())
    }

    /// Identity plus a complete profile with `role`
    pub async fn actor(&self, email: &str, full_name: &str, role: UserRole) -> Actor {
        let user = self.identity.register(email, PASSWORD);
        let session = self.identity.issue_session(&user);
        let profile = self
            .profiles()
            .create(&NewProfile {
                user_id: user.id,
                full_name: full_name.to_string(),
                role,
            })
            .await
            .unwrap();
        Actor {
            user,
            session,
            profile: Some(profile),
        }
    }

    /// Identity without any profile row
    pub fn bare_actor(&self, email: &str) -> Actor {
        let user = self.identity.register(email, PASSWORD);
        let session = self.identity.issue_session(&user);
        Actor {
            user,
            session,
            profile: None,
        }
    }
}

/// A ticket draft with the create-form defaults
pub fn draft(title: &str) -> TicketDraft {
    TicketDraft {
        title: title.to_string(),
        description: Some(format!("{title} details")),
        status: TicketStatus::Open,
        priority: TicketPriority::Low,
        category: TicketCategory::Bug,
    }
}
