//! Storage layer - table catalog, query executor and migrations

pub mod catalog;
pub mod executor;
pub mod migrations;
pub mod procedures;

pub use executor::QueryExecutor;
