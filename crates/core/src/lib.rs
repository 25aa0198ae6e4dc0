//! Aula Core - Shared types library.
//!
//! This crate provides the types shared by the Aula admin components:
//! - `admin` - Admin back-office API (login, sessions, administrator management)
//! - `cli` - Command-line tools for migrations and administrator provisioning
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Email addresses, normalized administrator keys, roles and permissions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
