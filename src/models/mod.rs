//! Core data models for the spots API.
//!
//! Row types map to SQLite tables via `sqlx::FromRow`; payload types
//! serialize as JSON via `serde`.

pub mod category;
pub mod page;
pub mod review;
pub mod spot;
pub mod user;
