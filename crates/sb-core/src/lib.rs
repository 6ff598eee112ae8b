//! Core of the Switchboard interaction dispatcher.
//!
//! This crate is platform-agnostic. Definition storage, command registration,
//! reply transport and per-guild configuration live behind ports (traits)
//! implemented in adapter crates.

pub mod command;
pub mod config;
pub mod domain;
pub mod errors;
pub mod handler;
pub mod interaction;
pub mod logging;
pub mod messaging;
pub mod pagination;
pub mod permissions;
pub mod ports;
pub mod response;
pub mod security;

#[cfg(test)]
mod test_support;

pub use errors::{Error, Result};
