//! Object storage clients

pub mod storage_api;

pub use storage_api::StorageApiClient;
