//! REST DTOs with serde derives for HTTP API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

// ===== Ticket DTOs =====

/// Ticket response DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketDto {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    /// `open`, `in_progress` or `closed`
    #[schema(example = "open")]
    pub status: String,
    /// `low`, `medium` or `high`
    #[schema(example = "low")]
    pub priority: String,
    /// `bug`, `feature` or `question`
    #[schema(example = "bug")]
    pub category: String,
    pub owner_id: Uuid,
    pub assigned_agent: Option<Uuid>,
    pub project_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Ticket form prefill
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketFormDto {
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub category: String,
}

/// Ticket list page
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketsPageDto {
    pub tickets: Vec<TicketDto>,
    pub selected: Option<TicketDto>,
    pub form: TicketFormDto,
}

/// Result of a ticket form action
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketActionResponse {
    #[schema(example = "Ticket created successfully!")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<TicketDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentDto {
    pub id: i64,
    pub ticket_id: i64,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author: Option<ProfileSummaryDto>,
}

// ===== Profile DTOs =====

/// Public subset of a profile
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProfileSummaryDto {
    pub id: Option<Uuid>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub occupation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileDto {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub full_name: Option<String>,
    /// `user`, `agent` or `admin`
    #[schema(example = "user")]
    pub role: Option<String>,
    pub avatar_url: Option<String>,
    pub occupation: Option<String>,
}

/// Account settings page
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountDto {
    pub email: Option<String>,
    /// Address awaiting confirmation
    pub new_email: Option<String>,
}

// ===== Chat DTOs =====

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LastMessageDto {
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub profile_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatSummaryDto {
    pub chat_id: Uuid,
    pub profile: ProfileSummaryDto,
    pub unread_count: u64,
    pub last_message: Option<LastMessageDto>,
}

/// Chat list page
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatListDto {
    pub chats: Vec<ChatSummaryDto>,
    pub profiles: Vec<ProfileSummaryDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageDto {
    pub id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub profile_id: Uuid,
    pub sender_name: Option<String>,
}

/// Chat detail page
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatPageDto {
    pub chat_id: Uuid,
    pub member_id: Uuid,
    pub member: ProfileSummaryDto,
    pub messages: Vec<MessageDto>,
    /// The caller's profile id
    pub profile_id: Uuid,
}

// ===== Auth DTOs =====

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthPageDto {
    /// OAuth providers offered on sign-up
    pub oauth_providers: Vec<String>,
}

/// Generic action acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Query parameters echoed back by informational pages
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct QueryEchoDto {
    pub params: BTreeMap<String, String>,
}
