//! Session/role guard
//!
//! Runs once per request: resolves the caller into a [`RequestContext`],
//! applies the routing policy, and hands the context to handlers through
//! request extensions.

use super::cookies::read_session;
use super::state::AppState;
use crate::contract::RequestContext;
use crate::paths;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_cookies::Cookies;
use tracing::{debug, warn};

pub async fn session_guard(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request,
    next: Next,
) -> Response {
    let ctx = resolve_context(&state, &cookies).await;
    let path = request.uri().path();

    if let Some(target) = route_policy(path, &ctx) {
        debug!(path, target, authenticated = ctx.is_authenticated(), "guard redirect");
        return Redirect::to(target).into_response();
    }

    request.extensions_mut().insert(ctx);
    next.run(request).await
}

/// Session from cookies, re-validated against the identity provider, plus the profile
pub async fn resolve_context(state: &AppState, cookies: &Cookies) -> RequestContext {
    let tokens = read_session(cookies, &state.config.cookies);
    if tokens.access_token.is_none() {
        return RequestContext::anonymous();
    }

    let session = match state.identity.get_session(&tokens).await {
        Ok(Some(session)) => session,
        Ok(None) => return RequestContext::anonymous(),
        Err(error) => {
            debug!(%error, "session unreadable");
            return RequestContext::anonymous();
        }
    };

    let user = match state.identity.get_user(&session.access_token).await {
        Ok(user) => user,
        Err(error) => {
            debug!(%error, "session rejected by identity provider");
            return RequestContext::anonymous();
        }
    };

    let profile = match state.profiles.find_for_user(user.id).await {
        Ok(profile) => profile,
        Err(error) => {
            warn!(user_id = %user.id, %error, "profile lookup failed");
            None
        }
    };

    RequestContext::authenticated(user, session, profile)
}

/// Redirect target for `path`, or `None` to let the request through
pub fn route_policy(path: &str, ctx: &RequestContext) -> Option<&'static str> {
    if path == paths::ROOT {
        return Some(if ctx.has_complete_profile() {
            paths::TICKETS
        } else {
            paths::LOGIN
        });
    }

    let private = paths::is_private(path);
    if !ctx.is_authenticated() {
        return private.then_some(paths::LOGIN);
    }
    if path == paths::LOGIN {
        return Some(paths::TICKETS);
    }
    if private && !ctx.has_complete_profile() && path != paths::COMPLETE_PROFILE {
        return Some(paths::COMPLETE_PROFILE);
    }
    None
}
