//! Direct messages: chat list, chat creation, chat detail, send and delete

use super::lookup_error;
use crate::config::Config;
use crate::contract::{
    FilterOp, HelpdeskError, LastMessage, Message, NewChat, NewMessage, ProfileSummary, QueryError,
    QueryOptions, ReadWatermark, RequestContext, SortDirection,
};
use crate::domain::repository::{
    ChatActivityStore, ChatMemberRepository, ChatRepository, IdSelector, MessageReadRepository,
    MessageRepository, ProfileRepository,
};
use crate::domain::validation::validate_content;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// One row of the chat list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatSummary {
    pub chat_id: Uuid,
    /// The other member
    pub profile: ProfileSummary,
    pub unread_count: u64,
    pub last_message: Option<LastMessage>,
}

/// Chat list page
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChatList {
    pub chats: Vec<ChatSummary>,
    /// Profile search results, the caller excluded
    pub profiles: Vec<ProfileSummary>,
}

/// A chat member with its embedded profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatPartner {
    pub profile_id: Uuid,
    #[serde(default)]
    pub profiles: Option<ProfileSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageWithSender {
    pub id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub profile_id: Uuid,
    #[serde(default)]
    pub profiles: Option<ProfileSummary>,
}

/// Chat detail page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatPage {
    pub chat_id: Uuid,
    pub member: ChatPartner,
    pub messages: Vec<MessageWithSender>,
    /// The caller's profile id
    pub profile_id: Uuid,
}

/// Result of starting a chat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenedChat {
    pub chat_id: Uuid,
    /// `false` when an existing chat was reused
    pub created: bool,
}

#[derive(Deserialize)]
struct MemberRow {
    chat_id: Uuid,
    profile_id: Uuid,
}

#[derive(Deserialize)]
struct PartnerRow {
    chat_id: Uuid,
    #[serde(default)]
    profiles: Option<ProfileSummary>,
}

fn id_list(ids: &[Uuid]) -> Vec<String> {
    ids.iter().map(Uuid::to_string).collect()
}

#[derive(Clone)]
pub struct ChatService {
    profiles: ProfileRepository,
    chats: ChatRepository,
    members: ChatMemberRepository,
    messages: MessageRepository,
    reads: MessageReadRepository,
    activity: Arc<dyn ChatActivityStore>,
    config: Arc<Config>,
}

impl ChatService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        profiles: ProfileRepository,
        chats: ChatRepository,
        members: ChatMemberRepository,
        messages: MessageRepository,
        reads: MessageReadRepository,
        activity: Arc<dyn ChatActivityStore>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            profiles,
            chats,
            members,
            messages,
            reads,
            activity,
            config,
        }
    }

    // ===== Chat list =====

    /// The caller's chats, newest activity first, plus a profile search for `q`
    pub async fn overview(
        &self,
        ctx: &RequestContext,
        q: Option<&str>,
    ) -> Result<ChatList, HelpdeskError> {
        let me = ctx.require_profile()?.id;
        let search = QueryOptions::new()
            .select("id, full_name, avatar_url, occupation")
            .filter(
                "full_name",
                FilterOp::Ilike,
                format!("%{}%", q.map(str::trim).unwrap_or_default()),
            )
            .filter("id", FilterOp::Not, me.to_string())
            .order_by("full_name", SortDirection::Asc)
            .limit(self.config.profile_search_limit);

        let (profiles, chat_ids) = tokio::try_join!(
            self.profiles.list_as::<ProfileSummary>(&search),
            self.members.chat_ids_for_profile(me),
        )?;
        if chat_ids.is_empty() {
            return Ok(ChatList {
                chats: Vec::new(),
                profiles,
            });
        }

        let partners_query = QueryOptions::new()
            .select("chat_id, profiles(id, full_name, avatar_url, occupation)")
            .filter("chat_id", FilterOp::In, id_list(&chat_ids))
            .filter("profile_id", FilterOp::Neq, me.to_string());

        let (partners, last_reads, last_messages) = tokio::try_join!(
            self.members.list_as::<PartnerRow>(&partners_query),
            self.reads.last_reads(me, &chat_ids),
            self.activity.last_messages_for_chats(&chat_ids),
        )?;
        let unread: HashMap<Uuid, u64> = self
            .activity
            .unread_counts_for_chats(&chat_ids, me, &last_reads)
            .await?
            .into_iter()
            .map(|row| (row.chat_id, row.count))
            .collect();
        let mut last_messages: HashMap<Uuid, LastMessage> = last_messages
            .into_iter()
            .map(|message| (message.chat_id, message))
            .collect();

        let mut chats: Vec<ChatSummary> = partners
            .into_iter()
            .map(|partner| ChatSummary {
                chat_id: partner.chat_id,
                profile: partner.profiles.unwrap_or_default(),
                unread_count: unread.get(&partner.chat_id).copied().unwrap_or(0),
                last_message: last_messages.remove(&partner.chat_id),
            })
            .collect();
        // Newest first; chats without messages sort last
        chats.sort_by(|a, b| {
            let a = a.last_message.as_ref().map(|m| m.created_at);
            let b = b.last_message.as_ref().map(|m| m.created_at);
            b.cmp(&a)
        });

        debug!(profile_id = %me, chats = chats.len(), "chat list loaded");
        Ok(ChatList { chats, profiles })
    }

    // ===== Chat creation =====

    /// Reuse the chat holding exactly the caller and `other`, or create one
    pub async fn create_chat(
        &self,
        ctx: &RequestContext,
        other: Uuid,
    ) -> Result<OpenedChat, HelpdeskError> {
        let user = ctx.require_user()?;
        let me = ctx.require_profile()?.id;
        if other == me {
            return Err(HelpdeskError::field(
                "profile_id",
                "You cannot start a chat with yourself",
            ));
        }

        if let Some(chat_id) = self.find_direct_chat(me, other).await? {
            debug!(%chat_id, "reusing existing chat");
            return Ok(OpenedChat {
                chat_id,
                created: false,
            });
        }

        self.profiles
            .get_single(&other)
            .await
            .map_err(|error| match error {
                QueryError::NoRows { .. } => HelpdeskError::field("profile_id", "Profile not found"),
                error => error.into(),
            })?;

        let (chat, _members) = self
            .chats
            .create_with_members(&NewChat { created_by: user.id }, &[me, other])
            .await?;

        info!(chat_id = %chat.id, "chat created");
        Ok(OpenedChat {
            chat_id: chat.id,
            created: true,
        })
    }

    async fn find_direct_chat(&self, me: Uuid, other: Uuid) -> Result<Option<Uuid>, HelpdeskError> {
        let chat_ids = self.members.chat_ids_for_profile(me).await?;
        if chat_ids.is_empty() {
            return Ok(None);
        }

        let options = QueryOptions::new()
            .select("chat_id, profile_id")
            .filter("chat_id", FilterOp::In, id_list(&chat_ids));
        let rows: Vec<MemberRow> = self.members.list_as(&options).await?;

        let mut members: HashMap<Uuid, BTreeSet<Uuid>> = HashMap::new();
        for row in rows {
            members.entry(row.chat_id).or_default().insert(row.profile_id);
        }
        let pair: BTreeSet<Uuid> = [me, other].into_iter().collect();
        Ok(chat_ids
            .into_iter()
            .find(|chat_id| members.get(chat_id) == Some(&pair)))
    }

    // ===== Chat detail =====

    /// Members and messages of a chat the caller belongs to; marks it read
    pub async fn open_chat(
        &self,
        ctx: &RequestContext,
        chat_id: Uuid,
    ) -> Result<ChatPage, HelpdeskError> {
        let me = ctx.require_profile()?.id;

        let members_query = QueryOptions::new()
            .select("profile_id, profiles(id, full_name, avatar_url, occupation)")
            .eq("chat_id", chat_id.to_string());
        let messages_query = QueryOptions::new()
            .select("id, content, created_at, profile_id, profiles(full_name)")
            .eq("chat_id", chat_id.to_string())
            .order_by("created_at", SortDirection::Asc);

        let (members, messages) = tokio::try_join!(
            self.members.list_as::<ChatPartner>(&members_query),
            self.messages.list_as::<MessageWithSender>(&messages_query),
        )?;

        if !members.iter().any(|m| m.profile_id == me) {
            return Err(HelpdeskError::not_found("chat", chat_id));
        }
        let member = members
            .into_iter()
            .find(|m| m.profile_id != me)
            .ok_or_else(|| HelpdeskError::not_found("chat", chat_id))?;

        if let Some(last) = messages.last() {
            self.reads
                .mark_read(&ReadWatermark {
                    chat_id,
                    profile_id: me,
                    last_read_message_id: last.id,
                    last_read_at: last.created_at,
                })
                .await?;
        }

        Ok(ChatPage {
            chat_id,
            member,
            messages,
            profile_id: me,
        })
    }

    // ===== Messages =====

    pub async fn send_message(
        &self,
        ctx: &RequestContext,
        chat_id: Uuid,
        content: &str,
    ) -> Result<Message, HelpdeskError> {
        let content = validate_content("content", content, self.config.message_max_length)?;
        let me = ctx.require_profile()?.id;

        let membership = QueryOptions::new()
            .select("chat_id, profile_id")
            .eq("chat_id", chat_id.to_string())
            .eq("profile_id", me.to_string())
            .limit(1);
        let rows: Vec<MemberRow> = self.members.list_as(&membership).await?;
        if rows.is_empty() {
            return Err(HelpdeskError::forbidden("not a member of this chat"));
        }

        let message = self
            .messages
            .create(&NewMessage {
                chat_id,
                profile_id: me,
                content,
            })
            .await?;
        debug!(%chat_id, message_id = %message.id, "message sent");
        Ok(message)
    }

    /// Only the sender may delete a message
    pub async fn delete_message(
        &self,
        ctx: &RequestContext,
        message_id: Option<Uuid>,
    ) -> Result<(), HelpdeskError> {
        let me = ctx.require_profile()?.id;
        let message_id =
            message_id.ok_or_else(|| HelpdeskError::field("messageId", "Message not found"))?;

        let message = self
            .messages
            .get_single(&message_id)
            .await
            .map_err(lookup_error("message", message_id))?;
        if message.profile_id != me {
            return Err(HelpdeskError::forbidden("only the sender can delete a message"));
        }

        self.messages.delete(IdSelector::One(message_id)).await?;
        info!(%message_id, "message deleted");
        Ok(())
    }
}
