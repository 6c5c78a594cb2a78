//! Ticket pages: list, detail, create, edit, delete and comments

use super::lookup_error;
use crate::contract::{
    Comment, FieldErrors, FilterOp, HelpdeskError, NewComment, NewTicket, Profile,
    ProfileSummary, QueryOptions, RequestContext, SortDirection, Ticket, TicketCategory,
    TicketChanges, TicketDraft, TicketPriority, TicketStatus,
};
use crate::domain::repository::{CommentRepository, IdSelector, TicketRepository};
use crate::domain::validation::validate_content;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const COMMENT_MAX_LEN: usize = 2000;

/// Largest `limit`/`offset` a SQL BIGINT can carry
const MAX_WINDOW_VALUE: u64 = i64::MAX as u64;

/// Query string of the ticket list page
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TicketQuery {
    /// Selected ticket; kept raw so an unparsable id behaves like a missing ticket
    #[serde(rename = "ticketId")]
    pub ticket_id: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    /// Case-insensitive title search
    pub q: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl TicketQuery {
    /// Filters, newest-first sort and window for the list
    pub fn to_options(&self) -> Result<QueryOptions, HelpdeskError> {
        let mut errors = FieldErrors::new();
        let mut options = QueryOptions::new().order_by("created_at", SortDirection::Desc);

        if let Some(status) = non_blank(&self.status) {
            match status.parse::<TicketStatus>() {
                Ok(status) => options = options.eq("status", status.as_str()),
                Err(()) => errors.add("status", format!("Unknown status '{status}'")),
            }
        }
        if let Some(priority) = non_blank(&self.priority) {
            match priority.parse::<TicketPriority>() {
                Ok(priority) => options = options.eq("priority", priority.as_str()),
                Err(()) => errors.add("priority", format!("Unknown priority '{priority}'")),
            }
        }
        if let Some(category) = non_blank(&self.category) {
            match category.parse::<TicketCategory>() {
                Ok(category) => options = options.eq("category", category.as_str()),
                Err(()) => errors.add("category", format!("Unknown category '{category}'")),
            }
        }
        if let Some(q) = non_blank(&self.q) {
            options = options.filter("title", FilterOp::Ilike, format!("%{q}%"));
        }
        match self.limit {
            Some(limit) if limit > MAX_WINDOW_VALUE => {
                errors.add("limit", format!("Limit must be at most {MAX_WINDOW_VALUE}"))
            }
            Some(limit) => options = options.limit(limit),
            None => {}
        }
        match self.offset {
            Some(offset) if offset > MAX_WINDOW_VALUE => {
                errors.add("offset", format!("Offset must be at most {MAX_WINDOW_VALUE}"))
            }
            Some(offset) => options = options.offset(offset),
            None => {}
        }
        errors.into_result(options)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Ticket list page
#[derive(Debug, Clone, PartialEq)]
pub struct TicketsPage {
    pub tickets: Vec<Ticket>,
    pub selected: Option<Ticket>,
    /// Form prefill: the selected ticket, or the create defaults
    pub form: TicketDraft,
}

/// Comment with its author's public profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentWithAuthor {
    #[serde(flatten)]
    pub comment: Comment,
    #[serde(default)]
    pub profiles: Option<ProfileSummary>,
}

/// Create-form defaults
fn blank_draft() -> TicketDraft {
    TicketDraft {
        title: String::new(),
        description: None,
        status: TicketStatus::Open,
        priority: TicketPriority::Low,
        category: TicketCategory::Bug,
    }
}

fn draft_of(ticket: &Ticket) -> TicketDraft {
    TicketDraft {
        title: ticket.title.clone(),
        description: ticket.description.clone(),
        status: ticket.status,
        priority: ticket.priority,
        category: ticket.category,
    }
}

fn can_access(profile: &Profile, ticket: &Ticket) -> bool {
    profile.is_staff() || ticket.owner_id == profile.id
}

#[derive(Clone)]
pub struct TicketService {
    tickets: TicketRepository,
    comments: CommentRepository,
}

impl TicketService {
    pub fn new(tickets: TicketRepository, comments: CommentRepository) -> Self {
        Self { tickets, comments }
    }

    // ===== Reads =====

    /// Tickets visible to the caller: agents and admins see all, users their own
    pub async fn list(
        &self,
        ctx: &RequestContext,
        options: QueryOptions,
    ) -> Result<Vec<Ticket>, HelpdeskError> {
        let profile = ctx.require_profile()?;
        let options = if profile.is_staff() {
            options
        } else {
            options.eq("owner_id", profile.id.to_string())
        };
        Ok(self.tickets.list(&options).await?)
    }

    /// One visible ticket; tickets the caller cannot see are reported missing
    pub async fn get(&self, ctx: &RequestContext, id: i64) -> Result<Ticket, HelpdeskError> {
        let profile = ctx.require_profile()?;
        let ticket = self
            .tickets
            .get_single(&id)
            .await
            .map_err(lookup_error("ticket", id))?;
        if !can_access(profile, &ticket) {
            return Err(HelpdeskError::not_found("ticket", id));
        }
        Ok(ticket)
    }

    pub async fn load(
        &self,
        ctx: &RequestContext,
        query: &TicketQuery,
    ) -> Result<TicketsPage, HelpdeskError> {
        let options = query.to_options()?;

        let (tickets, selected) = match non_blank(&query.ticket_id) {
            Some(raw) => {
                let id = raw
                    .parse::<i64>()
                    .map_err(|_| HelpdeskError::not_found("ticket", raw))?;
                let (tickets, ticket) =
                    tokio::try_join!(self.list(ctx, options), self.get(ctx, id))?;
                (tickets, Some(ticket))
            }
            None => (self.list(ctx, options).await?, None),
        };

        let form = selected.as_ref().map(draft_of).unwrap_or_else(blank_draft);
        debug!(count = tickets.len(), selected = ?selected.as_ref().map(|t| t.id), "tickets loaded");
        Ok(TicketsPage {
            tickets,
            selected,
            form,
        })
    }

    // ===== Writes =====

    pub async fn create(
        &self,
        ctx: &RequestContext,
        draft: TicketDraft,
    ) -> Result<Ticket, HelpdeskError> {
        let profile = ctx.require_profile()?;
        let ticket = self
            .tickets
            .create(&NewTicket {
                title: draft.title,
                description: draft.description,
                status: draft.status,
                priority: draft.priority,
                category: draft.category,
                owner_id: profile.id,
            })
            .await?;
        info!(ticket_id = ticket.id, owner_id = %profile.id, "ticket created");
        Ok(ticket)
    }

    /// Owner or staff only; `owner_id` never changes
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: i64,
        draft: TicketDraft,
    ) -> Result<Ticket, HelpdeskError> {
        let profile = ctx.require_profile()?;
        let ticket = self
            .tickets
            .get_single(&id)
            .await
            .map_err(lookup_error("ticket", id))?;
        if !can_access(profile, &ticket) {
            return Err(HelpdeskError::forbidden("only the owner or staff can edit a ticket"));
        }

        let changes = TicketChanges {
            title: Some(draft.title),
            description: Some(draft.description.unwrap_or_default()),
            status: Some(draft.status),
            priority: Some(draft.priority),
            category: Some(draft.category),
            assigned_agent: None,
        };
        let updated = self.tickets.update(&id, &changes).await?;
        info!(ticket_id = id, "ticket updated");
        Ok(updated)
    }

    /// Delete one or many tickets; every ticket must be the caller's or the caller staff
    pub async fn delete(&self, ctx: &RequestContext, ids: Vec<i64>) -> Result<u64, HelpdeskError> {
        let profile = ctx.require_profile()?;
        if ids.is_empty() {
            return Err(HelpdeskError::field("ticketId", "Ticket ID is required"));
        }

        let options = QueryOptions::new().filter("id", FilterOp::In, ids.clone());
        let found = self.tickets.list(&options).await?;
        if found.is_empty() {
            return Err(HelpdeskError::not_found(
                "ticket",
                ids.iter().map(i64::to_string).collect::<Vec<_>>().join(","),
            ));
        }
        if let Some(ticket) = found.iter().find(|t| !can_access(profile, t)) {
            return Err(HelpdeskError::forbidden(format!(
                "not allowed to delete ticket {}",
                ticket.id
            )));
        }

        let selector = match ids.as_slice() {
            [id] => IdSelector::One(*id),
            _ => IdSelector::Many(ids),
        };
        let deleted = self.tickets.delete(selector).await?;
        info!(deleted, "tickets deleted");
        Ok(deleted)
    }

    // ===== Comments =====

    pub async fn comments(
        &self,
        ctx: &RequestContext,
        ticket_id: i64,
    ) -> Result<Vec<CommentWithAuthor>, HelpdeskError> {
        self.get(ctx, ticket_id).await?;
        let options = QueryOptions::new()
            .select("id, ticket_id, author_id, content, created_at, profiles(id, full_name, avatar_url)")
            .eq("ticket_id", ticket_id)
            .order_by("created_at", SortDirection::Asc);
        Ok(self.comments.list_as(&options).await?)
    }

    pub async fn add_comment(
        &self,
        ctx: &RequestContext,
        ticket_id: i64,
        content: &str,
    ) -> Result<Comment, HelpdeskError> {
        let content = validate_content("content", content, COMMENT_MAX_LEN)?;
        let profile = ctx.require_profile()?;
        let ticket = self.get(ctx, ticket_id).await?;

        let comment = self
            .comments
            .create(&NewComment {
                ticket_id: ticket.id,
                author_id: profile.id,
                content,
            })
            .await?;
        debug!(ticket_id, comment_id = comment.id, "comment added");
        Ok(comment)
    }
}
