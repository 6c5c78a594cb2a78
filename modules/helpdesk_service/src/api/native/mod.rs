//! Native client for in-process callers

pub mod client;

pub use client::NativeClient;
