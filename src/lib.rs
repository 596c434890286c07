//! explain-it — background service and UI models for an "explain the
//! selected text" assistant.
//!
//! The binary in `main.rs` serves [`routes::app`]; everything else is usable
//! as a library by a front end or another host.

pub mod cache;
pub mod config;
pub mod envelope;
pub mod llm;
pub mod rate_limit;
pub mod render;
pub mod router;
pub mod routes;
pub mod settings;
pub mod state;
pub mod ui;
