//! Application services layer.

pub mod content;
pub mod downloads;
pub mod error;
pub mod files;
pub mod inquiries;
pub mod mail;
pub mod newsletter;
pub mod repos;
pub mod subscriptions;
