// crates/db/src/queries/mod.rs
//! One module per entity group, each an `impl Database` block — mirrors
//! the teacher's `queries/*.rs` split (`queries/sessions.rs`,
//! `queries/dashboard.rs`, ...).

pub mod churn;
pub mod commits;
pub mod dependencies;
pub mod facade;
pub mod index;
pub mod jobs;
