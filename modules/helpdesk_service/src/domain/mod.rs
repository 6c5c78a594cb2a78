//! Domain layer - business logic and services

pub mod repository;
pub mod service;
pub mod validation;

pub use repository::{ChatActivityStore, IdSelector, RowStore, TableRepository};
pub use service::{AccountService, ChatService, ProfileService, TicketService};
