//! Route registration

use super::{guard, handlers, openapi, state::AppState};
use crate::paths;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

/// Multipart framing on top of the avatar itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Register every page and action route behind the session guard
pub fn register_routes(state: AppState) -> Router {
    let profile_body_limit = state.config.max_avatar_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route(paths::ROOT, get(handlers::root))
        // Tickets
        .route(paths::TICKETS, get(handlers::tickets_page))
        .route("/private/tickets/create", post(handlers::create_ticket))
        .route("/private/tickets/edit", post(handlers::edit_ticket))
        .route("/private/tickets/delete", post(handlers::delete_tickets))
        .route(
            "/private/tickets/{ticket_id}/comments",
            get(handlers::list_comments).post(handlers::add_comment),
        )
        // Messages
        .route(paths::MESSAGES, get(handlers::chats_page))
        .route("/private/messages/create-chat", post(handlers::create_chat))
        .route("/private/messages/{chat_id}", get(handlers::chat_page))
        .route("/private/messages/{chat_id}/send", post(handlers::send_message))
        .route(
            "/private/messages/{chat_id}/delete-message",
            post(handlers::delete_message),
        )
        // Account
        .route(
            paths::PROFILE,
            get(handlers::profile_page)
                .post(handlers::update_profile)
                .layer(DefaultBodyLimit::max(profile_body_limit)),
        )
        .route(paths::SETTINGS, get(handlers::settings_page))
        .route("/private/account/settings/password", post(handlers::change_password))
        .route("/private/account/settings/email", post(handlers::change_email))
        .route(
            "/private/account/settings/delete-account",
            post(handlers::delete_account),
        )
        // Auth
        .route(paths::LOGIN, get(handlers::login_page).post(handlers::login))
        .route(paths::SIGN_UP, get(handlers::login_page).post(handlers::sign_up))
        .route(
            paths::COMPLETE_PROFILE,
            get(handlers::complete_profile_page).post(handlers::complete_profile),
        )
        .route(paths::FORGOT_PASSWORD, post(handlers::forgot_password))
        .route(paths::RESET_PASSWORD, post(handlers::reset_password))
        .route(paths::CALLBACK, get(handlers::auth_callback))
        .route(paths::LOGOUT, post(handlers::logout))
        .route(paths::CHECK_EMAIL, get(handlers::echo_query))
        .route(paths::EMAIL_CHANGING, get(handlers::echo_query))
        .route(paths::AUTH_ERROR, get(handlers::auth_error))
        // Docs
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CookieManagerLayer::new())
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    guard::session_guard,
                )),
        )
        .with_state(state)
}
