//! Content publishing backend with publish-triggered newsletters and counted
//! resource downloads.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
