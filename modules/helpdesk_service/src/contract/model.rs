//! Contract models for the helpdesk service
//!
//! Field names are the storage column names. Models derive serde because the
//! store returns rows as JSON objects and payloads are sent the same way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Declares a closed string enum with its wire names.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    _ => Err(()),
                }
            }
        }
    };
}

wire_enum!(
    /// Ticket lifecycle state; any transition is allowed
    TicketStatus {
        Open => "open",
        InProgress => "in_progress",
        Closed => "closed",
    }
);

wire_enum!(TicketPriority {
    Low => "low",
    Medium => "medium",
    High => "high",
});

wire_enum!(TicketCategory {
    Bug => "bug",
    Feature => "feature",
    Question => "question",
});

wire_enum!(
    /// Profile role; agents and admins triage every ticket
    UserRole {
        User => "user",
        Agent => "agent",
        Admin => "admin",
    }
);

// ===== Tickets =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub category: TicketCategory,
    pub owner_id: Uuid,
    #[serde(default)]
    pub assigned_agent: Option<Uuid>,
    #[serde(default)]
    pub project_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Caller-editable ticket fields, validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketDraft {
    pub title: String,
    pub description: Option<String>,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub category: TicketCategory,
}

/// Insert payload; the store assigns `id` and timestamps
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTicket {
    pub title: String,
    pub description: Option<String>,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub category: TicketCategory,
    pub owner_id: Uuid,
}

/// Update payload; absent fields are left untouched and `owner_id` is immutable
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TicketChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TicketPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<TicketCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_agent: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub ticket_id: i64,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewComment {
    pub ticket_id: i64,
    pub author_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommentChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ===== Profiles =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// A profile may use protected routes once it has a name and a role.
    pub fn is_complete(&self) -> bool {
        self.full_name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty())
            && self.role.is_some()
    }

    pub fn is_staff(&self) -> bool {
        matches!(self.role, Some(UserRole::Agent | UserRole::Admin))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProfile {
    pub user_id: Uuid,
    pub full_name: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Public subset of a profile, as embedded in chat and comment projections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileSummary {
    pub id: Option<Uuid>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub occupation: Option<String>,
}

// ===== Chats =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: Uuid,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewChat {
    pub created_by: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMember {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub profile_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewChatMember {
    pub chat_id: Uuid,
    pub profile_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub profile_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMessage {
    pub chat_id: Uuid,
    pub profile_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MessageChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Per-(chat, profile) read watermark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRead {
    pub chat_id: Uuid,
    pub profile_id: Uuid,
    #[serde(default)]
    pub last_read_message_id: Option<Uuid>,
    #[serde(default)]
    pub last_read_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Upsert payload for [`MessageRead`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadWatermark {
    pub chat_id: Uuid,
    pub profile_id: Uuid,
    pub last_read_message_id: Uuid,
    pub last_read_at: DateTime<Utc>,
}

/// Most recent message of a chat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastMessage {
    pub chat_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub profile_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCount {
    pub chat_id: Uuid,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(full_name: Option<&str>, role: Option<UserRole>) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            user_id: Some(Uuid::new_v4()),
            full_name: full_name.map(str::to_string),
            role,
            avatar_url: None,
            occupation: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn profile_completeness_needs_name_and_role() {
        assert!(profile(Some("Ada"), Some(UserRole::User)).is_complete());
        assert!(!profile(None, Some(UserRole::User)).is_complete());
        assert!(!profile(Some("  "), Some(UserRole::User)).is_complete());
        assert!(!profile(Some("Ada"), None).is_complete());
    }

    #[test]
    fn only_agents_and_admins_are_staff() {
        assert!(!profile(Some("a"), Some(UserRole::User)).is_staff());
        assert!(profile(Some("a"), Some(UserRole::Agent)).is_staff());
        assert!(profile(Some("a"), Some(UserRole::Admin)).is_staff());
        assert!(!profile(Some("a"), None).is_staff());
    }

    #[test]
    fn wire_names_match_serde() {
        for status in TicketStatus::ALL {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, serde_json::Value::from(status.as_str()));
            assert_eq!(status.as_str().parse::<TicketStatus>(), Ok(*status));
        }
        assert_eq!("in_progress".parse::<TicketStatus>(), Ok(TicketStatus::InProgress));
        assert!("urgent".parse::<TicketPriority>().is_err());
    }

    #[test]
    fn ticket_changes_skip_absent_fields() {
        let changes = TicketChanges {
            status: Some(TicketStatus::Closed),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&changes).unwrap(),
            serde_json::json!({ "status": "closed" })
        );
    }
}
