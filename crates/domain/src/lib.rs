//! # Tether Domain
//!
//! Business domain types and models for Tether.
//!
//! This crate contains:
//! - Reminder and task entities, queued operations, conflict records
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - Depends only on `tether-common` foundation utilities
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
