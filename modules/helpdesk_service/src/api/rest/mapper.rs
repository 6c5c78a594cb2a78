//! Conversions from contract and page models to REST DTOs

use super::dto::*;
use crate::contract::{LastMessage, Profile, ProfileSummary, Ticket, TicketDraft, User};
use crate::domain::service::{
    ChatList, ChatPage, ChatSummary, CommentWithAuthor, MessageWithSender, TicketsPage,
};

// ===== Ticket conversions =====

impl From<Ticket> for TicketDto {
    fn from(ticket: Ticket) -> Self {
        Self {
            id: ticket.id,
            title: ticket.title,
            description: ticket.description,
            status: ticket.status.to_string(),
            priority: ticket.priority.to_string(),
            category: ticket.category.to_string(),
            owner_id: ticket.owner_id,
            assigned_agent: ticket.assigned_agent,
            project_id: ticket.project_id,
            created_at: ticket.created_at,
            updated_at: ticket.updated_at,
        }
    }
}

impl From<TicketDraft> for TicketFormDto {
    fn from(draft: TicketDraft) -> Self {
        Self {
            title: draft.title,
            description: draft.description,
            status: draft.status.to_string(),
            priority: draft.priority.to_string(),
            category: draft.category.to_string(),
        }
    }
}

impl From<TicketsPage> for TicketsPageDto {
    fn from(page: TicketsPage) -> Self {
        Self {
            tickets: page.tickets.into_iter().map(Into::into).collect(),
            selected: page.selected.map(Into::into),
            form: page.form.into(),
        }
    }
}

impl From<CommentWithAuthor> for CommentDto {
    fn from(row: CommentWithAuthor) -> Self {
        Self {
            id: row.comment.id,
            ticket_id: row.comment.ticket_id,
            author_id: row.comment.author_id,
            content: row.comment.content,
            created_at: row.comment.created_at,
            author: row.profiles.map(Into::into),
        }
    }
}

// ===== Profile conversions =====

impl From<ProfileSummary> for ProfileSummaryDto {
    fn from(summary: ProfileSummary) -> Self {
        Self {
            id: summary.id,
            full_name: summary.full_name,
            avatar_url: summary.avatar_url,
            occupation: summary.occupation,
        }
    }
}

impl From<Profile> for ProfileDto {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id,
            user_id: profile.user_id,
            full_name: profile.full_name,
            role: profile.role.map(|r| r.to_string()),
            avatar_url: profile.avatar_url,
            occupation: profile.occupation,
        }
    }
}

impl From<&User> for AccountDto {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            new_email: user.new_email.clone(),
        }
    }
}

// ===== Chat conversions =====

impl From<LastMessage> for LastMessageDto {
    fn from(message: LastMessage) -> Self {
        Self {
            content: message.content,
            created_at: message.created_at,
            profile_id: message.profile_id,
        }
    }
}

impl From<ChatSummary> for ChatSummaryDto {
    fn from(summary: ChatSummary) -> Self {
        Self {
            chat_id: summary.chat_id,
            profile: summary.profile.into(),
            unread_count: summary.unread_count,
            last_message: summary.last_message.map(Into::into),
        }
    }
}

impl From<ChatList> for ChatListDto {
    fn from(list: ChatList) -> Self {
        Self {
            chats: list.chats.into_iter().map(Into::into).collect(),
            profiles: list.profiles.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<MessageWithSender> for MessageDto {
    fn from(message: MessageWithSender) -> Self {
        Self {
            id: message.id,
            content: message.content,
            created_at: message.created_at,
            profile_id: message.profile_id,
            sender_name: message.profiles.and_then(|p| p.full_name),
        }
    }
}

impl From<crate::contract::Message> for MessageDto {
    fn from(message: crate::contract::Message) -> Self {
        Self {
            id: message.id,
            content: message.content,
            created_at: message.created_at,
            profile_id: message.profile_id,
            sender_name: None,
        }
    }
}

impl From<ChatPage> for ChatPageDto {
    fn from(page: ChatPage) -> Self {
        Self {
            chat_id: page.chat_id,
            member_id: page.member.profile_id,
            member: page.member.profiles.unwrap_or_default().into(),
            messages: page.messages.into_iter().map(Into::into).collect(),
            profile_id: page.profile_id,
        }
    }
}
