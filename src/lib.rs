#![deny(missing_docs)]
//! Newsroom bot
//!
//! A Telegram bot that drives an article-generation webhook through a short
//! dialog and publishes the result either straight to a Telegram channel or
//! to an external site.

/// Dialog state machine, per-chat stores, and event routing
pub mod bot;
/// Configuration management
pub mod config;
/// Messaging gateway contract and the Telegram adapter
pub mod gateway;
/// Generation Service client
pub mod generation;
/// Publish pipeline for finished articles
pub mod publish;
pub mod utils;
