//! Scheduling engine and substrate trait definitions for Orcha.
//!
//! This crate turns an `OrchestrationSpecification` into concurrent dispatches
//! against a [`workflow::substrate::DurableContext`]. It defines the ports the
//! infrastructure layer implements (the durable context, leaf activities) and
//! depends only on `orcha-types` -- never on `orcha-infra`.

pub mod activity;
pub mod event;
pub mod workflow;
