//! Shared handler state

use crate::config::Config;
use crate::contract::IdentityProvider;
use crate::domain::{AccountService, ChatService, ProfileService, TicketService};
use std::sync::Arc;

/// Service graph shared by every request; immutable after construction
#[derive(Clone)]
pub struct AppState {
    pub tickets: Arc<TicketService>,
    pub chats: Arc<ChatService>,
    pub profiles: Arc<ProfileService>,
    pub account: Arc<AccountService>,
    pub identity: Arc<dyn IdentityProvider>,
    pub config: Arc<Config>,
}
