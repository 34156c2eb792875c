//! # conmon-common
//!
//! Shared types, invocation options, error definitions, and constants
//! used across the conmon workspace.
//!
//! This crate is the leaf of the dependency graph. It depends on no other
//! internal crate and holds the plain data that the validator, the log
//! driver resolver, and the monitor all agree on.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
