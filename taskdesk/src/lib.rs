//! `TaskDesk`: role-aware client state engine for a paginated
//! task-management API.

pub mod api;
pub mod attachments;
pub mod cli;
pub mod collection;
pub mod config;
pub mod controller;
pub mod download;
pub mod draft;
pub mod gate;
pub mod roster;
pub mod session;
pub mod sync;
