//! Core types and configuration for the insider coordination engine.
//!
//! This crate provides shared types used across all other crates:
//! - Transaction records, group keys and verdicts
//! - The in-memory table the engine reads and augments
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod table;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use table::{Cell, Table};
pub use types::*;
