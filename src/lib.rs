//! Core library for the `slapper` CLI.
//!
//! The binary drives these pieces: a rate-controlled request ticker with
//! linear ramp-up, a pool of workers replaying `.http` request templates
//! through an instrumented transport, a log-scale latency histogram over a
//! moving window, and a terminal dashboard steered from the keyboard.
pub mod args;
pub mod config;
pub mod engine;
pub mod entry;
pub mod error;
pub mod http;
pub mod logger;
pub mod metrics;
pub mod shutdown;
pub mod shutdown_handlers;
#[cfg(test)]
pub(crate) mod test_support;
pub mod ui;
