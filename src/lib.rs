//! Multi-language video comment aggregation.
//!
//! A query fans out over every registered language: the query is localized,
//! videos are searched and ranked, comments are fetched under a shared
//! concurrency limit, filtered, and translated into the output language.

pub mod chat;
pub mod config;
pub mod error;
pub mod filter;
pub mod fixtures;
pub mod i18n;
pub mod models;
pub mod pipeline;
pub mod ranking;
pub mod retry;
pub mod server;
pub mod source;
pub mod summarize;
pub mod translation;
