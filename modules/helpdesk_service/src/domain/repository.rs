//! Repository layer for data access
//!
//! [`RowStore`] is the seam to the relational store; the implementation lives
//! in `infra/storage/executor.rs`. [`TableRepository`] wraps one table on top
//! of it with typed payloads and results.

use crate::contract::{
    Chat, ChatMember, Comment, CommentChanges, Filter, FilterOp, LastMessage, Message,
    MessageChanges, MessageRead, NewChat, NewChatMember, NewComment, NewMessage, NewProfile,
    NewProject, NewTicket, Profile, ProfileChanges, Project, ProjectChanges, QueryError,
    QueryOptions, ReadWatermark, Row, Ticket, TicketChanges, UnreadCount,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

/// Table-agnostic row access
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Run `options` against `table`
    async fn select(&self, table: &str, options: &QueryOptions) -> Result<Vec<Row>, QueryError>;

    /// Insert rows and return them as stored
    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, QueryError>;

    /// Update rows matching every filter and return them as stored
    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        changes: Row,
    ) -> Result<Vec<Row>, QueryError>;

    /// Delete rows matching every filter, returning the affected count
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<u64, QueryError>;

    /// Insert or, on a `conflict` key collision, update
    async fn upsert(&self, table: &str, row: Row, conflict: &[&str]) -> Result<Row, QueryError>;

    /// Insert `parent` and its `children` in one transaction. Each child gets
    /// the parent's primary key in `link_column`.
    async fn insert_with_children(
        &self,
        parent_table: &str,
        parent: Row,
        child_table: &str,
        link_column: &str,
        children: Vec<Row>,
    ) -> Result<(Row, Vec<Row>), QueryError>;
}

/// Chat aggregates computed by the store
#[async_trait]
pub trait ChatActivityStore: Send + Sync {
    /// Latest message of each chat; chats without messages are absent
    async fn last_messages_for_chats(&self, chat_ids: &[Uuid])
        -> Result<Vec<LastMessage>, QueryError>;

    /// Messages from other senders newer than the profile's watermark
    async fn unread_counts_for_chats(
        &self,
        chat_ids: &[Uuid],
        profile_id: Uuid,
        last_reads: &HashMap<Uuid, DateTime<Utc>>,
    ) -> Result<Vec<UnreadCount>, QueryError>;
}

// ===== Entity bindings =====

/// A row type stored in one table
pub trait TableEntity: DeserializeOwned + Send + Sync + 'static {
    const TABLE: &'static str;
    type Create: Serialize + Send + Sync;
    type Update: Serialize + Send + Sync;
}

/// A [`TableEntity`] addressed by a single id column
pub trait KeyedEntity: TableEntity {
    const ID_COLUMN: &'static str = "id";
    type Id: Serialize + Display + Send + Sync;
}

macro_rules! table_entity {
    ($entity:ty, $table:literal, $create:ty, $update:ty) => {
        impl TableEntity for $entity {
            const TABLE: &'static str = $table;
            type Create = $create;
            type Update = $update;
        }
    };
    ($entity:ty, $table:literal, $create:ty, $update:ty, id: $id:ty) => {
        table_entity!($entity, $table, $create, $update);

        impl KeyedEntity for $entity {
            type Id = $id;
        }
    };
}

table_entity!(Ticket, "tickets", NewTicket, TicketChanges, id: i64);
table_entity!(Comment, "comments", NewComment, CommentChanges, id: i64);
table_entity!(Project, "projects", NewProject, ProjectChanges, id: i64);
table_entity!(Profile, "profiles", NewProfile, ProfileChanges, id: Uuid);
table_entity!(Chat, "chats", NewChat, Row, id: Uuid);
table_entity!(ChatMember, "chat_members", NewChatMember, Row, id: Uuid);
table_entity!(Message, "messages", NewMessage, MessageChanges, id: Uuid);
table_entity!(MessageRead, "message_reads", ReadWatermark, ReadWatermark);

/// One id or many; many ids are deleted in one round trip with `IN`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdSelector<Id> {
    One(Id),
    Many(Vec<Id>),
}

// ===== Generic repository =====

pub struct TableRepository<E> {
    store: Arc<dyn RowStore>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for TableRepository<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _entity: PhantomData,
        }
    }
}

pub type TicketRepository = TableRepository<Ticket>;
pub type CommentRepository = TableRepository<Comment>;
pub type ProjectRepository = TableRepository<Project>;
pub type ProfileRepository = TableRepository<Profile>;
pub type ChatRepository = TableRepository<Chat>;
pub type ChatMemberRepository = TableRepository<ChatMember>;
pub type MessageRepository = TableRepository<Message>;
pub type MessageReadRepository = TableRepository<MessageRead>;

impl<E: TableEntity> TableRepository<E> {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    pub async fn list(&self, options: &QueryOptions) -> Result<Vec<E>, QueryError> {
        self.list_as(options).await
    }

    /// List into a caller type, for projections and embedded relations
    pub async fn list_as<T: DeserializeOwned>(
        &self,
        options: &QueryOptions,
    ) -> Result<Vec<T>, QueryError> {
        self.store
            .select(E::TABLE, options)
            .await?
            .into_iter()
            .map(|row| decode(E::TABLE, row))
            .collect()
    }

    pub async fn create(&self, data: &E::Create) -> Result<E, QueryError> {
        let rows = self.store.insert(E::TABLE, vec![to_row(data)?]).await?;
        decode(E::TABLE, single(E::TABLE, rows)?)
    }

    pub async fn create_many(&self, data: &[E::Create]) -> Result<Vec<E>, QueryError> {
        let rows = data.iter().map(to_row).collect::<Result<Vec<_>, _>>()?;
        self.store
            .insert(E::TABLE, rows)
            .await?
            .into_iter()
            .map(|row| decode(E::TABLE, row))
            .collect()
    }
}

impl<E: KeyedEntity> TableRepository<E> {
    fn id_filter(id: &E::Id) -> Result<Filter, QueryError> {
        Ok(Filter::new(E::ID_COLUMN, FilterOp::Eq, to_value(id)?))
    }

    /// Exactly one row: zero is [`QueryError::NoRows`], more is an error too
    pub async fn get_single(&self, id: &E::Id) -> Result<E, QueryError> {
        let options = QueryOptions {
            filters: vec![Self::id_filter(id)?],
            ..QueryOptions::default()
        };
        let rows = self.store.select(E::TABLE, &options).await?;
        decode(E::TABLE, single(E::TABLE, rows)?)
    }

    pub async fn update(&self, id: &E::Id, changes: &E::Update) -> Result<E, QueryError> {
        let rows = self
            .store
            .update(E::TABLE, &[Self::id_filter(id)?], to_row(changes)?)
            .await?;
        decode(E::TABLE, single(E::TABLE, rows)?)
    }

    pub async fn delete(&self, ids: IdSelector<E::Id>) -> Result<u64, QueryError> {
        let filter = match ids {
            IdSelector::One(id) => Self::id_filter(&id)?,
            IdSelector::Many(ids) if ids.is_empty() => return Ok(0),
            IdSelector::Many(ids) => Filter::new(E::ID_COLUMN, FilterOp::In, to_value(&ids)?),
        };
        self.store.delete(E::TABLE, &[filter]).await
    }
}

// ===== Table-specific helpers =====

impl ProfileRepository {
    pub async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<Profile>, QueryError> {
        let options = QueryOptions::new()
            .eq("user_id", user_id.to_string())
            .limit(1);
        Ok(self.list(&options).await?.into_iter().next())
    }

    pub async fn delete_by_user_id(&self, user_id: Uuid) -> Result<u64, QueryError> {
        self.store
            .delete(
                Profile::TABLE,
                &[Filter::new("user_id", FilterOp::Eq, user_id.to_string())],
            )
            .await
    }
}

impl ChatRepository {
    /// Create a chat and its members atomically
    pub async fn create_with_members(
        &self,
        data: &NewChat,
        profile_ids: &[Uuid],
    ) -> Result<(Chat, Vec<ChatMember>), QueryError> {
        let members = profile_ids
            .iter()
            .map(|id| {
                let mut row = Row::new();
                row.insert("profile_id".to_string(), to_value(id)?);
                Ok(row)
            })
            .collect::<Result<Vec<_>, QueryError>>()?;

        let (chat, members) = self
            .store
            .insert_with_children(
                Chat::TABLE,
                to_row(data)?,
                ChatMember::TABLE,
                "chat_id",
                members,
            )
            .await?;
        let members = members
            .into_iter()
            .map(|row| decode(ChatMember::TABLE, row))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((decode(Chat::TABLE, chat)?, members))
    }
}

#[derive(Deserialize)]
struct ChatIdRow {
    chat_id: Uuid,
}

impl ChatMemberRepository {
    pub async fn chat_ids_for_profile(&self, profile_id: Uuid) -> Result<Vec<Uuid>, QueryError> {
        let options = QueryOptions::new()
            .select("chat_id")
            .eq("profile_id", profile_id.to_string());
        let rows: Vec<ChatIdRow> = self.list_as(&options).await?;
        Ok(rows.into_iter().map(|row| row.chat_id).collect())
    }
}

impl MessageRepository {
    pub async fn delete_by_profile(&self, profile_id: Uuid) -> Result<u64, QueryError> {
        self.store
            .delete(
                Message::TABLE,
                &[Filter::new("profile_id", FilterOp::Eq, profile_id.to_string())],
            )
            .await
    }
}

impl MessageReadRepository {
    /// Advance the caller's watermark for a chat
    pub async fn mark_read(&self, watermark: &ReadWatermark) -> Result<MessageRead, QueryError> {
        let row = self
            .store
            .upsert(
                MessageRead::TABLE,
                to_row(watermark)?,
                &["chat_id", "profile_id"],
            )
            .await?;
        decode(MessageRead::TABLE, row)
    }

    /// `chat_id -> last_read_at` for the profile across `chat_ids`
    pub async fn last_reads(
        &self,
        profile_id: Uuid,
        chat_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, DateTime<Utc>>, QueryError> {
        if chat_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let ids: Vec<String> = chat_ids.iter().map(Uuid::to_string).collect();
        let options = QueryOptions::new()
            .eq("profile_id", profile_id.to_string())
            .filter("chat_id", FilterOp::In, ids);
        Ok(self
            .list(&options)
            .await?
            .into_iter()
            .filter_map(|read| read.last_read_at.map(|at| (read.chat_id, at)))
            .collect())
    }
}

// ===== Row conversion =====

fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<serde_json::Value, QueryError> {
    serde_json::to_value(value).map_err(|e| QueryError::InvalidValue {
        column: "*".to_string(),
        reason: e.to_string(),
    })
}

fn to_row<T: Serialize>(value: &T) -> Result<Row, QueryError> {
    match to_value(value)? {
        serde_json::Value::Object(row) => Ok(row),
        other => Err(QueryError::InvalidValue {
            column: "*".to_string(),
            reason: format!("payload must be an object, got {other}"),
        }),
    }
}

fn decode<T: DeserializeOwned>(table: &str, row: Row) -> Result<T, QueryError> {
    serde_json::from_value(serde_json::Value::Object(row)).map_err(|e| QueryError::Decode {
        table: table.to_string(),
        reason: e.to_string(),
    })
}

fn single(table: &str, rows: Vec<Row>) -> Result<Row, QueryError> {
    let count = rows.len();
    let mut rows = rows.into_iter();
    match (rows.next(), count) {
        (Some(row), 1) => Ok(row),
        (None, _) => Err(QueryError::NoRows {
            table: table.to_string(),
        }),
        (Some(_), count) => Err(QueryError::MultipleRows {
            table: table.to_string(),
            count,
        }),
    }
}
