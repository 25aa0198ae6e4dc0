//! Domain models for admin.

pub mod admin_user;
pub mod session;
pub mod settings;

pub use admin_user::{AdminRecord, AdminUpdate, NewAdmin};
pub use session::{CurrentAdmin, TokenKind, cookies};
pub use settings::SiteSettings;
