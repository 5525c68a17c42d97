//! Discord adapter (serenity).
//!
//! This crate implements the `fmb-core` PlatformPort over Discord's API and
//! hosts the gateway event handler plus the admin command surface.

pub mod commands;
pub mod gateway;
pub mod platform;

pub use platform::DiscordPlatform;
