//! Validation, logging, and state tracking for a single monitored container.
//!
//! The pipeline runs once per invocation:
//! [`validate::validate`] → [`logs::resolve`] → [`container::Container`] →
//! [`monitor::Monitor::run`].

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod container;
pub mod exec;
pub mod logs;
pub mod monitor;
pub mod process;
pub mod spec;
pub mod state;
pub mod validate;
