//! Integration test utilities for the realtime client
//!
//! This crate runs an in-process mock gateway (WebSocket plus the REST device
//! endpoints) and provides helpers for driving a real client against it.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
