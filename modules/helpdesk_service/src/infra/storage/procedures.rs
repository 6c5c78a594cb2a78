//! Chat activity aggregates
//!
//! Last message per chat and unread counts per chat, each one statement.

use super::executor::QueryExecutor;
use crate::contract::{LastMessage, QueryError, Row, UnreadCount};
use crate::domain::repository::ChatActivityStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Alias, Asterisk, Condition, ConditionalStatement, Expr, Func, Order, Query};
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

const MESSAGES: &str = "messages";

fn messages_col(column: &str) -> (Alias, Alias) {
    (Alias::new(MESSAGES), Alias::new(column))
}

fn decode<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, QueryError> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(serde_json::Value::Object(row)).map_err(|e| QueryError::Decode {
                table: MESSAGES.to_string(),
                reason: e.to_string(),
            })
        })
        .collect()
}

#[async_trait]
impl ChatActivityStore for QueryExecutor {
    async fn last_messages_for_chats(
        &self,
        chat_ids: &[Uuid],
    ) -> Result<Vec<LastMessage>, QueryError> {
        if chat_ids.is_empty() {
            return Ok(Vec::new());
        }

        let latest = Alias::new("latest");
        let mut newest = Query::select();
        newest
            .expr(Func::max(Expr::col((latest.clone(), Alias::new("created_at")))))
            .from_as(Alias::new(MESSAGES), latest.clone())
            .and_where(
                Expr::col((latest, Alias::new("chat_id"))).equals(messages_col("chat_id")),
            );

        let mut statement = Query::select();
        statement
            .columns([
                messages_col("chat_id"),
                messages_col("content"),
                messages_col("created_at"),
                messages_col("profile_id"),
            ])
            .from(Alias::new(MESSAGES))
            .and_where(
                Expr::col(messages_col("chat_id"))
                    .is_in(chat_ids.iter().map(|id| id.to_string())),
            )
            .and_where(Expr::col(messages_col("created_at")).in_subquery(newest))
            .order_by(messages_col("created_at"), Order::Desc);

        debug!(table = MESSAGES, kind = "last_messages", chats = chat_ids.len(), "executing statement");
        let rows = self.fetch(self.backend().build(&statement)).await?;

        let mut seen = HashSet::new();
        Ok(decode::<LastMessage>(rows)?
            .into_iter()
            .filter(|message| seen.insert(message.chat_id))
            .collect())
    }

    async fn unread_counts_for_chats(
        &self,
        chat_ids: &[Uuid],
        profile_id: Uuid,
        last_reads: &HashMap<Uuid, DateTime<Utc>>,
    ) -> Result<Vec<UnreadCount>, QueryError> {
        if chat_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut unread = Condition::any();
        for chat_id in chat_ids {
            let in_chat = Expr::col(Alias::new("chat_id")).eq(chat_id.to_string());
            unread = unread.add(match last_reads.get(chat_id) {
                Some(read_at) => in_chat.and(Expr::col(Alias::new("created_at")).gt(*read_at)),
                None => in_chat,
            });
        }

        let mut statement = Query::select();
        statement
            .column(Alias::new("chat_id"))
            .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("count"))
            .from(Alias::new(MESSAGES))
            .cond_where(
                Condition::all()
                    .add(Expr::col(Alias::new("profile_id")).ne(profile_id.to_string()))
                    .add(unread),
            )
            .group_by_col(Alias::new("chat_id"));

        debug!(table = MESSAGES, kind = "unread_counts", chats = chat_ids.len(), "executing statement");
        let rows = self.fetch(self.backend().build(&statement)).await?;
        decode(rows)
    }
}
