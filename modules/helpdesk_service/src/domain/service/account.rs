//! Authentication flows and account settings

use crate::config::Config;
use crate::contract::{
    AuthError, HelpdeskError, IdentityProvider, NewProfile, OAuthRedirect, RequestContext,
    Session, User, UserRole, UserUpdate,
};
use crate::domain::repository::{MessageRepository, ProfileRepository};
use crate::domain::validation::{
    validate_email_change, validate_forgot_password, validate_login, validate_password_change,
    validate_reset_password, validate_sign_up, EmailChangeForm, ForgotPasswordForm, LoginForm,
    PasswordChangeForm, ResetPasswordForm, SignUpForm,
};
use crate::paths;
use std::sync::Arc;
use tracing::{debug, info, warn};

const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Where the OAuth callback sends the browser, and the session to store if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackOutcome {
    pub session: Option<Session>,
    pub redirect: String,
}

impl CallbackOutcome {
    fn redirect(to: impl Into<String>) -> Self {
        Self {
            session: None,
            redirect: to.into(),
        }
    }
}

/// Provider rejections surface on a form field; transport failures stay backend errors
fn rejected_on(field: &'static str, fallback: &'static str) -> impl FnOnce(AuthError) -> HelpdeskError {
    move |error| match error {
        AuthError::Rejected { message, .. } => {
            let message = if message.trim().is_empty() {
                fallback.to_string()
            } else {
                message
            };
            HelpdeskError::field(field, message)
        }
        other => other.into(),
    }
}

#[derive(Clone)]
pub struct AccountService {
    identity: Arc<dyn IdentityProvider>,
    profiles: ProfileRepository,
    messages: MessageRepository,
    config: Arc<Config>,
    public_domain: String,
}

impl AccountService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        profiles: ProfileRepository,
        messages: MessageRepository,
        config: Arc<Config>,
        public_domain: impl Into<String>,
    ) -> Self {
        Self {
            identity,
            profiles,
            messages,
            config,
            public_domain: public_domain.into().trim_end_matches('/').to_string(),
        }
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}{path}", self.public_domain)
    }

    // ===== Sign in / sign up =====

    pub async fn login(&self, form: &LoginForm) -> Result<Session, HelpdeskError> {
        validate_login(form)?;
        let session = self
            .identity
            .sign_in_with_password(form.email.trim(), &form.password)
            .await
            .map_err(rejected_on("password", "Invalid email or password"))?;
        debug!("password sign-in succeeded");
        Ok(session)
    }

    /// Create the identity and its `user` profile; returns the page to redirect to
    pub async fn sign_up(&self, form: &SignUpForm) -> Result<String, HelpdeskError> {
        validate_sign_up(form)?;
        let callback = self.public_url(paths::CALLBACK);
        let user = self
            .identity
            .sign_up(form.email.trim(), &form.password, Some(&callback))
            .await
            .map_err(rejected_on("email", "Invalid email or password"))?;

        self.profiles
            .create(&NewProfile {
                user_id: user.id,
                full_name: form.full_name.trim().to_string(),
                role: UserRole::User,
            })
            .await
            .map_err(|error| {
                warn!(user_id = %user.id, %error, "profile setup failed after sign-up");
                HelpdeskError::field(
                    "password",
                    "Account created, but profile setup failed. Please contact support.",
                )
            })?;

        info!(user_id = %user.id, "account created");
        Ok(paths::check_email("verify-email"))
    }

    /// Authorize URL and PKCE verifier for a configured OAuth provider
    pub async fn start_oauth(&self, provider: &str) -> Result<OAuthRedirect, HelpdeskError> {
        if !self.config.oauth_providers.iter().any(|p| p == provider) {
            return Err(HelpdeskError::field("provider", "Provider not supported."));
        }
        let redirect = self
            .identity
            .sign_in_with_oauth(provider, &self.public_url(paths::CALLBACK))
            .await
            .map_err(rejected_on("password", GENERIC_FAILURE))?;
        debug!(provider, "oauth flow started");
        Ok(redirect)
    }

    /// Finish an OAuth or email-link round trip
    ///
    /// `code` is exchanged for a session when present; otherwise the session
    /// already on the request decides where the browser goes.
    pub async fn oauth_callback(
        &self,
        ctx: &RequestContext,
        code: Option<&str>,
        code_verifier: Option<&str>,
    ) -> Result<CallbackOutcome, HelpdeskError> {
        let (session, user): (Option<Session>, Option<User>) = match code {
            Some(code) => {
                let Some(verifier) = code_verifier else {
                    warn!("oauth callback without a code verifier");
                    return Ok(CallbackOutcome::redirect(paths::AUTH_ERROR));
                };
                match self.identity.exchange_code_for_session(code, verifier).await {
                    Ok(session) => {
                        let user = match session.user.clone() {
                            Some(user) => Some(user),
                            None => self.identity.get_user(&session.access_token).await.ok(),
                        };
                        (Some(session), user)
                    }
                    Err(error) => {
                        warn!(%error, "oauth code exchange failed");
                        return Ok(CallbackOutcome::redirect(paths::AUTH_ERROR));
                    }
                }
            }
            None => (None, ctx.user.clone()),
        };

        let redirect = match user {
            None => paths::LOGIN,
            Some(user) => match self.profiles.find_by_user_id(user.id).await? {
                None => paths::COMPLETE_PROFILE,
                Some(_) => paths::TICKETS,
            },
        };
        Ok(CallbackOutcome {
            session,
            redirect: redirect.to_string(),
        })
    }

    // ===== Password recovery =====

    pub async fn forgot_password(&self, form: &ForgotPasswordForm) -> Result<String, HelpdeskError> {
        validate_forgot_password(form)?;
        let redirect_to = self.public_url(paths::RESET_PASSWORD);
        self.identity
            .reset_password_for_email(form.email.trim(), Some(&redirect_to))
            .await
            .map_err(rejected_on("email", GENERIC_FAILURE))?;
        Ok(paths::check_email("forgot-password"))
    }

    /// Set a new password for the session opened by the recovery link
    pub async fn reset_password(
        &self,
        ctx: &RequestContext,
        form: &ResetPasswordForm,
    ) -> Result<(), HelpdeskError> {
        validate_reset_password(form)?;
        let token = ctx.require_access_token()?;
        let update = UserUpdate {
            password: Some(form.password.clone()),
            ..UserUpdate::default()
        };
        self.identity
            .update_user(token, &update, None)
            .await
            .map_err(rejected_on("confirmPassword", GENERIC_FAILURE))?;
        info!("password reset");
        Ok(())
    }

    // ===== Settings =====

    /// Re-authenticate with the current password, then set the new one
    pub async fn change_password(
        &self,
        ctx: &RequestContext,
        form: &PasswordChangeForm,
    ) -> Result<(), HelpdeskError> {
        validate_password_change(form)?;
        let user = ctx.require_user()?;
        let token = ctx.require_access_token()?;
        let email = user.email.as_deref().unwrap_or_default();

        match self
            .identity
            .sign_in_with_password(email, &form.current_password)
            .await
        {
            Ok(_) => {}
            Err(AuthError::Rejected { .. }) => {
                return Err(HelpdeskError::field(
                    "current_password",
                    "Invalid current password",
                ))
            }
            Err(error) => return Err(error.into()),
        }

        let update = UserUpdate {
            password: Some(form.new_password.clone()),
            ..UserUpdate::default()
        };
        self.identity
            .update_user(token, &update, None)
            .await
            .map_err(|error| {
                warn!(user_id = %user.id, %error, "password update failed");
                HelpdeskError::backend("Failed to update password. Please, try again later")
            })?;
        info!(user_id = %user.id, "password changed");
        Ok(())
    }

    /// Request an email change; the provider mails a confirmation link
    pub async fn change_email(
        &self,
        ctx: &RequestContext,
        form: &EmailChangeForm,
    ) -> Result<User, HelpdeskError> {
        validate_email_change(form)?;
        let token = ctx.require_access_token()?;
        let update = UserUpdate {
            email: Some(form.new_email.trim().to_string()),
            ..UserUpdate::default()
        };
        let redirect_to = self.public_url(paths::EMAIL_CHANGING);
        let user = self
            .identity
            .update_user(token, &update, Some(&redirect_to))
            .await
            .map_err(|error| {
                warn!(%error, "email update failed");
                HelpdeskError::backend("Failed to update email. Please, try again later")
            })?;
        info!(user_id = %user.id, "email change requested");
        Ok(user)
    }

    /// Delete messages, profile and identity, in that order
    ///
    /// Only the identity deletion is fatal; earlier failures are logged and
    /// the remaining steps still run.
    pub async fn delete_account(&self, ctx: &RequestContext) -> Result<(), HelpdeskError> {
        let user = ctx.require_user()?;

        let profile_id = match &ctx.profile {
            Some(profile) => Some(profile.id),
            None => match self.profiles.find_by_user_id(user.id).await {
                Ok(profile) => profile.map(|p| p.id),
                Err(error) => {
                    warn!(user_id = %user.id, %error, "profile lookup failed during account deletion");
                    None
                }
            },
        };

        if let Some(profile_id) = profile_id {
            if let Err(error) = self.messages.delete_by_profile(profile_id).await {
                warn!(%profile_id, %error, "message deletion failed");
            }
        }
        if let Err(error) = self.profiles.delete_by_user_id(user.id).await {
            warn!(user_id = %user.id, %error, "profile deletion failed");
        }

        self.identity
            .admin_delete_user(user.id)
            .await
            .map_err(|error| {
                warn!(user_id = %user.id, %error, "identity deletion failed");
                HelpdeskError::backend("Failed to delete account. Please, try again later")
            })?;
        info!(user_id = %user.id, "account deleted");
        Ok(())
    }
}
