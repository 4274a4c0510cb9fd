//! Transport-agnostic messaging boundary (Telegram today).

pub mod port;
pub mod types;
