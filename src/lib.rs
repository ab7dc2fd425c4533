#![deny(missing_docs)]
//! Stream Relay Bot
//!
//! A Telegram bot that takes a remote video URL and streams it into a
//! Bunny Stream video library.

/// Telegram bot handlers and reply texts
pub mod bot;
/// Configuration management
pub mod config;
/// Logging setup with secret redaction
pub mod logging;
/// Download-then-upload relay
pub mod relay;
/// Telegram dispatcher entrypoint
pub mod runner;
/// Utility functions
pub mod utils;
