//! Home-hub weather widget library
//!
//! Exposes the freshness cache, weather client, and refresh scheduler for
//! embedding hosts and integration tests. The binary in `main.rs` wires these
//! together with a plain-text renderer.

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod scheduler;
