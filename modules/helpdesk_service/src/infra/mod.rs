//! Infrastructure layer - relational store, identity provider and object storage clients

pub mod identity;
pub mod objects;
pub mod storage;
