//! Native client trait for in-process callers
//!
//! Direct function calls, no HTTP. Every call carries the caller's
//! [`RequestContext`] so visibility and ownership rules still apply.

use super::context::RequestContext;
use super::error::HelpdeskError;
use super::model::{Profile, Ticket, TicketDraft};
use super::query::QueryOptions;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait HelpdeskApi: Send + Sync {
    // ===== Tickets =====

    /// Tickets visible to the caller, narrowed by `options`
    async fn list_tickets(
        &self,
        ctx: &RequestContext,
        options: QueryOptions,
    ) -> Result<Vec<Ticket>, HelpdeskError>;

    async fn get_ticket(&self, ctx: &RequestContext, id: i64) -> Result<Ticket, HelpdeskError>;

    async fn create_ticket(
        &self,
        ctx: &RequestContext,
        draft: TicketDraft,
    ) -> Result<Ticket, HelpdeskError>;

    async fn update_ticket(
        &self,
        ctx: &RequestContext,
        id: i64,
        draft: TicketDraft,
    ) -> Result<Ticket, HelpdeskError>;

    // ===== Profiles =====

    /// Profile bound to an identity, if one was created
    async fn profile_for_user(&self, user_id: Uuid) -> Result<Option<Profile>, HelpdeskError>;
}
