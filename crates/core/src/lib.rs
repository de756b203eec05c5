//! Core library: snapshotting, progress tracking, manifests, moves and the
//! organization loop that ties them to a decision agent.

pub mod actions;
pub mod agent;
pub mod config;
pub mod error;
pub mod manifest;
pub mod models;
pub mod mover;
pub mod organizer;
pub mod paths;
pub mod prompts;
pub mod snapshot;
pub mod tools;
pub mod tracker;

pub use error::{OrganizeError, Result};
pub use providers::MediaKind;
