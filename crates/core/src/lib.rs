//! Forkful Core - Shared types library.
//!
//! This crate provides the domain types used across all Forkful components:
//! - `storefront` - Cart engine (store, persistence, checkout)
//! - `cli` - Terminal storefront that drives the engine
//!
//! # Architecture
//!
//! The core crate contains only types and pure operations - no I/O, no storage
//! access, no clocks. Cart invariants live here so every consumer gets them
//! for free.
//!
//! # Modules
//!
//! - [`types`] - Item IDs, money, catalog, cart lines and order totals

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
