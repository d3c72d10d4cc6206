//! Core types and trait definitions for the Rollcall attendance ledger.
//!
//! Two stores live here: the [`session::SessionStore`], which owns the single
//! signed-in identity and its persisted copy, and the
//! [`ledger::AttendanceLedger`] abstraction over the append-only attendance
//! record list. This crate is free of HTTP and database dependencies.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod chain;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod record;
pub mod roster;
pub mod session;
pub mod summary;

pub use error::{AuthError, Error, Result};
