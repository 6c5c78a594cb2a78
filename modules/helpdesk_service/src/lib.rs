//! Helpdesk Service Module
//!
//! Support tickets, one-to-one direct messages and user profiles over a
//! relational store. Identity and avatar storage are external services
//! reached through the [`IdentityProvider`] and [`ObjectStorage`] seams.

// Public exports
pub mod contract;
pub use contract::{
    client::HelpdeskApi, error::HelpdeskError, IdentityProvider, ObjectStorage, Profile,
    QueryOptions, RequestContext, Ticket, TicketDraft,
};

pub mod module;
pub use module::HelpdeskServiceModule;

pub mod config;
pub use config::{AuthConfig, Config, StorageConfig};

// Internal modules (hidden from public API)
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
#[doc(hidden)]
pub mod paths;
