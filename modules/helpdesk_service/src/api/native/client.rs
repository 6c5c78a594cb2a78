//! Native client implementation - wraps domain services for in-process calls

use crate::contract::{
    HelpdeskApi, HelpdeskError, Profile, QueryOptions, RequestContext, Ticket, TicketDraft,
};
use crate::domain::{ProfileService, TicketService};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Calls the domain services directly, without HTTP
#[derive(Clone)]
pub struct NativeClient {
    tickets: Arc<TicketService>,
    profiles: Arc<ProfileService>,
}

impl NativeClient {
    pub fn new(tickets: Arc<TicketService>, profiles: Arc<ProfileService>) -> Self {
        Self { tickets, profiles }
    }
}

#[async_trait]
impl HelpdeskApi for NativeClient {
    async fn list_tickets(
        &self,
        ctx: &RequestContext,
        options: QueryOptions,
    ) -> Result<Vec<Ticket>, HelpdeskError> {
        self.tickets.list(ctx, options).await
    }

    async fn get_ticket(&self, ctx: &RequestContext, id: i64) -> Result<Ticket, HelpdeskError> {
        self.tickets.get(ctx, id).await
    }

    async fn create_ticket(
        &self,
        ctx: &RequestContext,
        draft: TicketDraft,
    ) -> Result<Ticket, HelpdeskError> {
        self.tickets.create(ctx, draft).await
    }

    async fn update_ticket(
        &self,
        ctx: &RequestContext,
        id: i64,
        draft: TicketDraft,
    ) -> Result<Ticket, HelpdeskError> {
        self.tickets.update(ctx, id, draft).await
    }

    async fn profile_for_user(&self, user_id: Uuid) -> Result<Option<Profile>, HelpdeskError> {
        self.profiles.find_for_user(user_id).await
    }
}
