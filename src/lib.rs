//! revline: AI pull request review with diff-anchored comments (library crate).
//!
//! Re-exports public modules for integration tests and external use.

pub mod anchor;
pub mod config;
pub mod constants;
pub mod context;
pub mod diff;
pub mod env;
pub mod github;
pub mod models;
pub mod orchestrator;
pub mod output;
pub mod providers;
