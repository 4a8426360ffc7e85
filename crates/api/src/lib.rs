//! # Tether API
//!
//! Composition root for the offline-first preservation stack.
//!
//! This crate contains:
//! - Application context (dependency injection)
//! - The `tetherd` daemon entry point
//!
//! ## Architecture
//! - Depends on `common`, `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture

pub mod context;

pub use context::AppContext;
