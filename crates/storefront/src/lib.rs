//! Forkful storefront cart engine.
//!
//! Keeps the shopper's cart consistent across the in-memory store, durable
//! per-identity snapshots, and login/logout, and derives the totals charged
//! at checkout. [`state::AppState`] wires the pieces together.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod checkout;
pub mod config;
pub mod error;
pub mod identity;
pub mod persistence;
pub mod state;
pub mod storage;
pub mod store;
