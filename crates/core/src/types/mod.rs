//! Core types for Aula.
//!
//! This module provides type-safe wrappers for the administrator domain.

pub mod admin_key;
pub mod email;
pub mod permission;
pub mod role;

pub use admin_key::AdminKey;
pub use email::{Email, EmailError};
pub use permission::{Permission, PermissionError, Permissions};
pub use role::AdminRole;
