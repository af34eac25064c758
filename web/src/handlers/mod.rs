//! HTTP request handlers, organized by resource.

pub mod events;
pub mod health;
pub mod participation;
pub mod queries;
