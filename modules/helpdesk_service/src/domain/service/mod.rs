//! Page controllers
//!
//! One service per page group. Every operation takes the caller's
//! [`RequestContext`](crate::contract::RequestContext) explicitly.

mod account;
mod chats;
mod profiles;
mod tickets;

pub use account::{AccountService, CallbackOutcome};
pub use chats::{
    ChatList, ChatPage, ChatPartner, ChatService, ChatSummary, MessageWithSender, OpenedChat,
};
pub use profiles::ProfileService;
pub use tickets::{CommentWithAuthor, TicketQuery, TicketService, TicketsPage};

use crate::contract::{HelpdeskError, QueryError};

/// Map a zero-row lookup to a typed not-found, leaving other failures as backend errors
pub(crate) fn lookup_error<I: ToString>(
    resource: &'static str,
    id: I,
) -> impl FnOnce(QueryError) -> HelpdeskError {
    move |error| match error {
        QueryError::NoRows { .. } => HelpdeskError::not_found(resource, id.to_string()),
        other => other.into(),
    }
}
