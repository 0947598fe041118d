//! TabSnooze: postpone browser tabs and reopen them when their moment arrives.
//!
//! This library crate exposes all modules for use by the binary and integration tests.

pub mod app;
pub mod database;
pub mod host;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod types;
