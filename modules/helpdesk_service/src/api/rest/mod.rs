//! REST API layer

pub mod cookies;
pub mod dto;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod mapper;
pub mod openapi;
pub mod routes;
pub mod state;

pub use state::AppState;
