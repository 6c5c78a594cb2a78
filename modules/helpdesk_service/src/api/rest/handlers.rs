//! HTTP request handlers - thin layer that delegates to domain services
//!
//! Page loads answer with JSON; form actions answer with a 303 redirect or a
//! JSON acknowledgement. Failures become Problem Details.

use super::cookies::{clear_session, store_session, store_verifier, take_verifier};
use super::dto::*;
use super::error::Problem;
use super::state::AppState;
use crate::contract::{HelpdeskError, RequestContext};
use crate::domain::service::TicketQuery;
use crate::domain::validation::{
    parse_ticket_ids, validate_ticket, AvatarUpload, CommentForm, CompleteProfileForm,
    EmailChangeForm, ForgotPasswordForm, LoginForm, MessageForm, PasswordChangeForm,
    ProfileForm, ResetPasswordForm, SignUpForm, TicketForm,
};
use crate::paths;
use axum::{
    extract::{rejection::FormRejection, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Extension, Form, Json,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use tower_cookies::Cookies;
use uuid::Uuid;

type HandlerResult = Result<Response, Problem>;

fn see_other(to: &str) -> HandlerResult {
    Ok(Redirect::to(to).into_response())
}

// ===== Query parameters =====

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TicketIdQuery {
    #[serde(rename = "ticketId")]
    pub ticket_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MessageIdQuery {
    #[serde(rename = "messageId")]
    pub message_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProviderQuery {
    pub provider: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CallbackQuery {
    pub code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateChatForm {
    pub profile_id: String,
}

// ===== Ticket handlers =====

/// Ticket list, optionally with a selected ticket; a missing selection goes back to the list
pub async fn tickets_page(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<TicketQuery>,
) -> HandlerResult {
    match state.tickets.load(&ctx, &query).await {
        Ok(page) => Ok(Json(TicketsPageDto::from(page)).into_response()),
        Err(HelpdeskError::NotFound { .. }) if query.ticket_id.is_some() => see_other(paths::TICKETS),
        Err(error) => Err(error.into()),
    }
}

pub async fn create_ticket(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<TicketForm>,
) -> HandlerResult {
    let draft = validate_ticket(&form)?;
    let ticket = state.tickets.create(&ctx, draft).await?;
    let body = TicketActionResponse {
        message: "Ticket created successfully!".to_string(),
        ticket: Some(ticket.into()),
        deleted: None,
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub async fn edit_ticket(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<TicketIdQuery>,
    Form(form): Form<TicketForm>,
) -> HandlerResult {
    let id = single_ticket_id(query.ticket_id.as_deref())?;
    let draft = validate_ticket(&form)?;
    let ticket = state.tickets.update(&ctx, id, draft).await?;
    let body = TicketActionResponse {
        message: "Ticket edited successfully!".to_string(),
        ticket: Some(ticket.into()),
        deleted: None,
    };
    Ok(Json(body).into_response())
}

/// `ticketId` may list several ids separated by commas
pub async fn delete_tickets(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<TicketIdQuery>,
) -> HandlerResult {
    let ids = parse_ticket_ids(query.ticket_id.as_deref())?;
    let deleted = state.tickets.delete(&ctx, ids).await?;
    let body = TicketActionResponse {
        message: "Ticket deleted successfully!".to_string(),
        ticket: None,
        deleted: Some(deleted),
    };
    Ok(Json(body).into_response())
}

fn single_ticket_id(raw: Option<&str>) -> Result<i64, HelpdeskError> {
    match parse_ticket_ids(raw)?.as_slice() {
        [id] => Ok(*id),
        _ => Err(HelpdeskError::field("ticketId", "Exactly one ticket ID is expected")),
    }
}

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(ticket_id): Path<i64>,
) -> HandlerResult {
    let comments = state.tickets.comments(&ctx, ticket_id).await?;
    let body: Vec<CommentDto> = comments.into_iter().map(Into::into).collect();
    Ok(Json(body).into_response())
}

pub async fn add_comment(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(ticket_id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> HandlerResult {
    let comment = state.tickets.add_comment(&ctx, ticket_id, &form.content).await?;
    let body = CommentDto {
        id: comment.id,
        ticket_id: comment.ticket_id,
        author_id: comment.author_id,
        content: comment.content,
        created_at: comment.created_at,
        author: None,
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

// ===== Message handlers =====

pub async fn chats_page(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<SearchQuery>,
) -> HandlerResult {
    let list = state.chats.overview(&ctx, query.q.as_deref()).await?;
    Ok(Json(ChatListDto::from(list)).into_response())
}

pub async fn create_chat(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<CreateChatForm>,
) -> HandlerResult {
    let other = Uuid::parse_str(form.profile_id.trim())
        .map_err(|_| HelpdeskError::field("profile_id", "Profile not found"))?;
    let opened = state.chats.create_chat(&ctx, other).await?;
    see_other(&paths::chat(opened.chat_id))
}

/// Chat detail; unknown chats and chats without another member go back to the list
pub async fn chat_page(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(chat_id): Path<String>,
) -> HandlerResult {
    let Ok(chat_id) = Uuid::parse_str(&chat_id) else {
        return see_other(paths::MESSAGES);
    };
    match state.chats.open_chat(&ctx, chat_id).await {
        Ok(page) => Ok(Json(ChatPageDto::from(page)).into_response()),
        Err(HelpdeskError::NotFound { .. }) => see_other(paths::MESSAGES),
        Err(error) => Err(error.into()),
    }
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(chat_id): Path<Uuid>,
    Form(form): Form<MessageForm>,
) -> HandlerResult {
    let message = state.chats.send_message(&ctx, chat_id, &form.content).await?;
    Ok((StatusCode::CREATED, Json(MessageDto::from(message))).into_response())
}

pub async fn delete_message(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(_chat_id): Path<Uuid>,
    Query(query): Query<MessageIdQuery>,
) -> HandlerResult {
    let message_id = match query.message_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            Uuid::parse_str(raw)
                .map_err(|_| HelpdeskError::field("messageId", "Message not found"))?,
        ),
    };
    state.chats.delete_message(&ctx, message_id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

// ===== Account handlers =====

pub async fn profile_page(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> HandlerResult {
    let profile = state.profiles.load(&ctx)?;
    Ok(Json(ProfileDto::from(profile)).into_response())
}

/// Multipart form: `full_name`, optional `occupation`, optional `avatar` file
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    multipart: Multipart,
) -> HandlerResult {
    let form = read_profile_form(multipart).await?;
    let profile = state.profiles.update(&ctx, form).await?;
    Ok(Json(ProfileDto::from(profile)).into_response())
}

async fn read_profile_form(mut multipart: Multipart) -> Result<ProfileForm, HelpdeskError> {
    let unreadable = |e: axum::extract::multipart::MultipartError| {
        HelpdeskError::field("avatar", format!("Unreadable upload: {e}"))
    };

    let mut form = ProfileForm::default();
    while let Some(field) = multipart.next_field().await.map_err(unreadable)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "full_name" => form.full_name = field.text().await.map_err(unreadable)?,
            "occupation" => form.occupation = Some(field.text().await.map_err(unreadable)?),
            "avatar" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(unreadable)?;
                // Browsers send an empty part when no file was picked
                if !bytes.is_empty() {
                    form.avatar = Some(AvatarUpload {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

pub async fn settings_page(Extension(ctx): Extension<RequestContext>) -> HandlerResult {
    let user = ctx.require_user()?;
    Ok(Json(AccountDto::from(user)).into_response())
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<PasswordChangeForm>,
) -> HandlerResult {
    state.account.change_password(&ctx, &form).await?;
    Ok(Json(MessageResponse::new("Password updated successfully!")).into_response())
}

pub async fn change_email(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<EmailChangeForm>,
) -> HandlerResult {
    state.account.change_email(&ctx, &form).await?;
    let body = MessageResponse::new("Check your inbox to confirm the new address.");
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub async fn delete_account(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    cookies: Cookies,
) -> HandlerResult {
    state.account.delete_account(&ctx).await?;
    clear_session(&cookies, &state.config.cookies);
    see_other(paths::LOGIN)
}

// ===== Auth handlers =====

pub async fn login_page(State(state): State<AppState>) -> HandlerResult {
    let body = AuthPageDto {
        oauth_providers: state.config.oauth_providers.clone(),
    };
    Ok(Json(body).into_response())
}

pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<LoginForm>,
) -> HandlerResult {
    let session = state.account.login(&form).await?;
    store_session(&cookies, &state.config.cookies, &session);
    see_other(paths::TICKETS)
}

/// Password sign-up, or an OAuth start when `?provider=` is present
pub async fn sign_up(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(query): Query<ProviderQuery>,
    form: Result<Form<SignUpForm>, FormRejection>,
) -> HandlerResult {
    if let Some(provider) = query.provider.as_deref().filter(|p| !p.is_empty()) {
        let redirect = state.account.start_oauth(provider).await?;
        store_verifier(&cookies, &state.config.cookies, &redirect.code_verifier);
        return see_other(&redirect.url);
    }

    let Form(form) = form.map_err(|e| HelpdeskError::field("email", e.body_text()))?;
    let target = state.account.sign_up(&form).await?;
    see_other(&target)
}

pub async fn complete_profile_page(Extension(ctx): Extension<RequestContext>) -> HandlerResult {
    ctx.require_user()?;
    let body = ctx.profile.map(ProfileDto::from);
    Ok(Json(body).into_response())
}

pub async fn complete_profile(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<CompleteProfileForm>,
) -> HandlerResult {
    state.profiles.complete_profile(&ctx, &form).await?;
    see_other(paths::TICKETS)
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Form(form): Form<ForgotPasswordForm>,
) -> HandlerResult {
    let target = state.account.forgot_password(&form).await?;
    see_other(&target)
}

pub async fn reset_password(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<ResetPasswordForm>,
) -> HandlerResult {
    state.account.reset_password(&ctx, &form).await?;
    see_other(paths::TICKETS)
}

pub async fn auth_callback(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    cookies: Cookies,
    Query(query): Query<CallbackQuery>,
) -> HandlerResult {
    let verifier = take_verifier(&cookies, &state.config.cookies);
    let outcome = state
        .account
        .oauth_callback(&ctx, query.code.as_deref(), verifier.as_deref())
        .await?;
    if let Some(session) = &outcome.session {
        store_session(&cookies, &state.config.cookies, session);
    }
    see_other(&outcome.redirect)
}

pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> HandlerResult {
    clear_session(&cookies, &state.config.cookies);
    see_other(paths::LOGIN)
}

/// Informational pages echo their query string
pub async fn echo_query(Query(params): Query<BTreeMap<String, String>>) -> HandlerResult {
    Ok(Json(QueryEchoDto { params }).into_response())
}

pub async fn auth_error() -> HandlerResult {
    Err(Problem::new(StatusCode::UNAUTHORIZED, "Authentication Failed")
        .with_detail("The sign-in link is invalid or has expired. Please try again."))
}

/// The guard redirects `/` before this runs; the route exists so the guard sees it
pub async fn root() -> HandlerResult {
    see_other(paths::LOGIN)
}
