//! Shared domain types for Orcha.
//!
//! This crate contains the value types used across the Orcha workspace:
//! the orchestration specification tree, per-dispatch job contexts, run
//! records and run events, engine configuration, and the error kinds.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod config;
pub mod error;
pub mod event;
pub mod orchestration;
pub mod run;
