//! Core domain + application logic for the ModMail relay bot.
//!
//! This crate is intentionally framework-agnostic. Discord lives behind the
//! `ChatPlatform` port implemented in the adapter crate.

pub mod commands;
pub mod config;
pub mod domain;
pub mod embeds;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod registry;
pub mod relay;
pub mod router;
pub mod tickets;

#[cfg(test)]
pub(crate) mod fake;

pub use errors::{Error, Result};
