//! Core domain + application logic for the feedback moderation bot.
//!
//! This crate is intentionally framework-agnostic. Discord / OpenAI live
//! behind ports (traits) implemented in adapter crates.

pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod moderation;
pub mod ports;
pub mod report;
pub mod rubric;
pub mod verdict;

pub use errors::{Error, Result};
