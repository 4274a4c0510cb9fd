//! Core domain + application logic for the rota schedule bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and the
//! schedule backend live behind ports (traits) implemented in adapter
//! crates or in thin clients at the edges.

pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod link;
pub mod logging;
pub mod messaging;
pub mod notify;
pub mod registry;
pub mod schedule;

pub use errors::{Error, Result};
