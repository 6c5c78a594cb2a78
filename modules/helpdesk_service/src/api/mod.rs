//! API layer: REST surface and native in-process client

pub mod native;
pub mod rest;
