//! Unit tests for the dockyard CLI
//!
//! These tests use fake transports and executors and run without network I/O.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod dokku_client;
mod helpers;
mod in_memory;
