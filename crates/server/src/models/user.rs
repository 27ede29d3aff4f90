//! User domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bodega_core::{Email, UserId};

/// A registered shopper (domain type).
///
/// The password hash never leaves the credential store; this type carries
/// only the fields safe to hold in handlers.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Canonical (lowercased) email address.
    pub email: Email,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Authorization role.
    pub role: Role,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// Authorization role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular shopper.
    User,
    /// May manage the catalog.
    Admin,
}

impl Role {
    /// Canonical string form, as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Parse the stored string form.
    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Client-safe user payload for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
        }
    }
}
