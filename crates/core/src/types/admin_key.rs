//! Normalized administrator key.
//!
//! Administrator records were historically stored under a document key
//! derived from the email address: lower-cased, with `.` and `@` both
//! replaced by `_`. The mapping is not injective (`a.b@x.com` and
//! `a_b@x.com` produce the same key), so the key is only a legacy locator.
//! Directory implementations must compare the stored email before trusting
//! a record found by key.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::email::Email;

/// Legacy document key for an administrator record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdminKey(String);

impl AdminKey {
    /// Derive the key for an email address.
    #[must_use]
    pub fn from_email(email: &Email) -> Self {
        let key = email
            .as_str()
            .to_lowercase()
            .chars()
            .map(|c| if c == '.' || c == '@' { '_' } else { c })
            .collect();
        Self(key)
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AdminKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Email> for AdminKey {
    fn from(email: &Email) -> Self {
        Self::from_email(email)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn key(s: &str) -> AdminKey {
        AdminKey::from_email(&Email::parse(s).unwrap())
    }

    #[test]
    fn test_replaces_dots_and_at() {
        assert_eq!(key("maria.garcia@aula.dev").as_str(), "maria_garcia_aula_dev");
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(key("Maria@Aula.dev"), key("maria@aula.dev"));
    }

    #[test]
    fn test_separator_collision_is_real() {
        // Distinct addresses, same key: callers must check the stored email.
        assert_eq!(key("a.b@c.com"), key("a_b@c.com"));
        assert_ne!(
            Email::parse("a.b@c.com").unwrap(),
            Email::parse("a_b@c.com").unwrap()
        );
    }
}
