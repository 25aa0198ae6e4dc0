//! Aula Admin library.
//!
//! This crate provides the admin back-office as a library, allowing it to
//! be tested end to end against in-memory collaborators.
//!
//! # Security
//!
//! This crate guards HIGH PRIVILEGE access:
//! - Password login through the external identity provider
//! - Signed session credentials with silent refresh
//! - Per-client login rate limiting
//! - Capability checks on every admin operation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::router;
pub use state::AppState;
