//! Contract layer - public API for in-process callers
//!
//! Transport-agnostic models, the query option model, error types, the
//! native client trait, and the seams to external collaborators.

pub mod client;
pub mod context;
pub mod error;
pub mod identity;
pub mod model;
pub mod query;
pub mod storage;

pub use client::HelpdeskApi;
pub use context::RequestContext;
pub use error::{AuthError, FieldErrors, HelpdeskError, QueryError, StorageError};
pub use identity::{IdentityProvider, OAuthRedirect, Session, SessionCookies, User, UserUpdate};
pub use model::*;
pub use query::{
    Columns, Embed, Filter, FilterOp, Projection, QueryOptions, Row, RowRange, Sort,
    SortDirection, DEFAULT_PAGE_SIZE,
};
pub use storage::ObjectStorage;
