//! `TaskDesk` reference server library.
//!
//! An in-memory implementation of the task-management REST API the
//! `taskdesk` client talks to. Exposed as a library so tests and
//! embedders can start it on an ephemeral port.

pub mod config;
pub mod server;
pub mod store;
