//! # Workflow Module
//!
//! Review stages, role/stage permission gating and submission.
//!
//! A review moves `self -> r1 -> r2 -> hr -> completed` and never back.
//! Each assessment block belongs to exactly one stage, and only the roles
//! authorised for that stage may touch it while the review sits there.

mod permission;
mod stage;
mod submission;

pub use permission::*;
pub use stage::*;
pub use submission::*;
