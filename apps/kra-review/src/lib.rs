//! # KRA Review Library
//!
//! Application layer around `kra-review-core`: collaborator contracts and
//! their filesystem implementations, review sessions, configuration and
//! the CLI commands.
//!
//! The `kra-review` binary uses these modules through `main.rs`.

pub mod cli;
pub mod collab;
pub mod config;
pub mod error;
pub mod session;

// Re-export kra_review_core for convenience
pub use kra_review_core;
