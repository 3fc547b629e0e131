//! Shared wire definitions for the `TaskDesk` REST API.
//!
//! Every type here mirrors a JSON body or query string exchanged with the
//! server. Enumerated fields are closed: unknown values fail to decode.

pub mod auth;
pub mod page;
pub mod query;
pub mod task;
pub mod user;
