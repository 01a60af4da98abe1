//! Infrastructure layer for Orcha.
//!
//! Implements the ports defined in `orcha-core`: an in-process durable
//! substrate on tokio (timer table, event inboxes, nested run supervision),
//! the in-memory run store, the built-in leaf activities, the config file
//! loader, and the [`host::OrchestrationHost`] that callers start runs with.

pub mod activities;
pub mod config;
pub mod host;
pub mod store;
pub mod substrate;
