//! nkit-core library.
//!
//! Typed model of the Notion objects nkit touches, a blocking HTTP client,
//! request pacing and the tag reconciliation engine.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums carrying an [`error::ErrorCode`];
//!   `anyhow::Result` only for configuration loading.
//! - **Logging**: `tracing` macros. Nothing in this crate prints to stdout.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod model;
pub mod notion;
pub mod page;
pub mod rate_limit;
pub mod reconcile;
pub mod remote;
