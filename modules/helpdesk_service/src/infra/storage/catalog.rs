//! Static description of every table the executor may touch
//!
//! Column kinds drive value conversion; relations drive embedded
//! projections. Anything not listed here is rejected before a statement is
//! built.

use crate::contract::QueryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    /// UTC instant, RFC 3339 on the wire
    Timestamp,
    /// JSON document; arrays support `contains`/`overlaps`
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdStrategy {
    /// Text UUID v4 generated on insert
    Uuid,
    /// Integer assigned by the database
    AutoIncrement,
    /// Composite natural key supplied by the caller
    Natural,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
}

/// `local_column` on this table matches `target_column` on `target_table`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationSpec {
    pub name: &'static str,
    pub local_column: &'static str,
    pub target_table: &'static str,
    pub target_column: &'static str,
    pub cardinality: Cardinality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [ColumnSpec],
    pub primary_key: &'static [&'static str],
    pub id_strategy: IdStrategy,
    pub relations: &'static [RelationSpec],
}

impl TableSpec {
    pub fn column(&self, name: &str) -> Option<&'static ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn require_column(&self, name: &str) -> Result<&'static ColumnSpec, QueryError> {
        self.column(name).ok_or_else(|| QueryError::UnknownColumn {
            table: self.name.to_string(),
            column: name.to_string(),
        })
    }

    pub fn relation(&self, name: &str) -> Result<&'static RelationSpec, QueryError> {
        self.relations
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| QueryError::UnknownRelation {
                table: self.name.to_string(),
                relation: name.to_string(),
            })
    }
}

const fn text(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        kind: ColumnKind::Text,
    }
}

const fn integer(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        kind: ColumnKind::Integer,
    }
}

const fn timestamp(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        kind: ColumnKind::Timestamp,
    }
}

const fn one(
    name: &'static str,
    local_column: &'static str,
    target_table: &'static str,
    target_column: &'static str,
) -> RelationSpec {
    RelationSpec {
        name,
        local_column,
        target_table,
        target_column,
        cardinality: Cardinality::One,
    }
}

const fn many(
    name: &'static str,
    local_column: &'static str,
    target_table: &'static str,
    target_column: &'static str,
) -> RelationSpec {
    RelationSpec {
        name,
        local_column,
        target_table,
        target_column,
        cardinality: Cardinality::Many,
    }
}

pub const PROFILES: TableSpec = TableSpec {
    name: "profiles",
    columns: &[
        text("id"),
        text("user_id"),
        text("full_name"),
        text("role"),
        text("avatar_url"),
        text("occupation"),
        timestamp("created_at"),
        timestamp("updated_at"),
    ],
    primary_key: &["id"],
    id_strategy: IdStrategy::Uuid,
    relations: &[
        many("tickets", "id", "tickets", "owner_id"),
        many("chat_members", "id", "chat_members", "profile_id"),
    ],
};

pub const TICKETS: TableSpec = TableSpec {
    name: "tickets",
    columns: &[
        integer("id"),
        text("title"),
        text("description"),
        text("status"),
        text("priority"),
        text("category"),
        text("owner_id"),
        text("assigned_agent"),
        integer("project_id"),
        timestamp("created_at"),
        timestamp("updated_at"),
    ],
    primary_key: &["id"],
    id_strategy: IdStrategy::AutoIncrement,
    relations: &[
        one("owner", "owner_id", "profiles", "id"),
        one("agent", "assigned_agent", "profiles", "id"),
        one("projects", "project_id", "projects", "id"),
        many("comments", "id", "comments", "ticket_id"),
    ],
};

pub const COMMENTS: TableSpec = TableSpec {
    name: "comments",
    columns: &[
        integer("id"),
        integer("ticket_id"),
        text("author_id"),
        text("content"),
        timestamp("created_at"),
    ],
    primary_key: &["id"],
    id_strategy: IdStrategy::AutoIncrement,
    relations: &[
        one("profiles", "author_id", "profiles", "id"),
        one("tickets", "ticket_id", "tickets", "id"),
    ],
};

pub const PROJECTS: TableSpec = TableSpec {
    name: "projects",
    columns: &[
        integer("id"),
        text("name"),
        text("description"),
        text("owner_id"),
        timestamp("created_at"),
        timestamp("updated_at"),
    ],
    primary_key: &["id"],
    id_strategy: IdStrategy::AutoIncrement,
    relations: &[
        one("owner", "owner_id", "profiles", "id"),
        many("tickets", "id", "tickets", "project_id"),
    ],
};

pub const CHATS: TableSpec = TableSpec {
    name: "chats",
    columns: &[text("id"), text("created_by"), timestamp("created_at")],
    primary_key: &["id"],
    id_strategy: IdStrategy::Uuid,
    relations: &[
        many("chat_members", "id", "chat_members", "chat_id"),
        many("messages", "id", "messages", "chat_id"),
    ],
};

pub const CHAT_MEMBERS: TableSpec = TableSpec {
    name: "chat_members",
    columns: &[text("id"), text("chat_id"), text("profile_id")],
    primary_key: &["id"],
    id_strategy: IdStrategy::Uuid,
    relations: &[
        one("profiles", "profile_id", "profiles", "id"),
        one("chats", "chat_id", "chats", "id"),
    ],
};

pub const MESSAGES: TableSpec = TableSpec {
    name: "messages",
    columns: &[
        text("id"),
        text("chat_id"),
        text("profile_id"),
        text("content"),
        timestamp("created_at"),
    ],
    primary_key: &["id"],
    id_strategy: IdStrategy::Uuid,
    relations: &[
        one("profiles", "profile_id", "profiles", "id"),
        one("chats", "chat_id", "chats", "id"),
    ],
};

pub const MESSAGE_READS: TableSpec = TableSpec {
    name: "message_reads",
    columns: &[
        text("chat_id"),
        text("profile_id"),
        text("last_read_message_id"),
        timestamp("last_read_at"),
        timestamp("updated_at"),
    ],
    primary_key: &["chat_id", "profile_id"],
    id_strategy: IdStrategy::Natural,
    relations: &[
        one("chats", "chat_id", "chats", "id"),
        one("profiles", "profile_id", "profiles", "id"),
    ],
};

pub static TABLES: &[TableSpec] = &[
    PROFILES,
    TICKETS,
    COMMENTS,
    PROJECTS,
    CHATS,
    CHAT_MEMBERS,
    MESSAGES,
    MESSAGE_READS,
];

/// Look up a table by name.
pub fn table(name: &str) -> Result<&'static TableSpec, QueryError> {
    TABLES
        .iter()
        .find(|t| t.name == name)
        .ok_or_else(|| QueryError::UnknownTable(name.to_string()))
}
