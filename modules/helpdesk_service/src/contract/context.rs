//! Per-request identity context
//!
//! Built once per request by the session guard and passed by reference into
//! every service call.

use super::error::HelpdeskError;
use super::identity::{Session, User};
use super::model::Profile;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    pub user: Option<User>,
    pub session: Option<Session>,
    pub profile: Option<Profile>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user: User, session: Session, profile: Option<Profile>) -> Self {
        Self {
            user: Some(user),
            session: Some(session),
            profile,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Authenticated with a profile that has a name and a role
    pub fn has_complete_profile(&self) -> bool {
        self.is_authenticated() && self.profile.as_ref().is_some_and(|p| p.is_complete())
    }

    pub fn require_user(&self) -> Result<&User, HelpdeskError> {
        self.user.as_ref().ok_or(HelpdeskError::Unauthenticated)
    }

    pub fn require_profile(&self) -> Result<&Profile, HelpdeskError> {
        self.require_user()?;
        self.profile.as_ref().ok_or(HelpdeskError::Unauthenticated)
    }

    pub fn require_access_token(&self) -> Result<&str, HelpdeskError> {
        self.session
            .as_ref()
            .map(|s| s.access_token.as_str())
            .ok_or(HelpdeskError::Unauthenticated)
    }
}
