//! Shared records, settings and cache keys for the dockyard console.

pub mod cache_keys;
pub mod config;
pub mod types;

pub use cache_keys::{keys, ttl, under_prefix};
pub use config::ConsoleSettings;
pub use types::*;
