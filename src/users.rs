//! Users

use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// User identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a user is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Browses and buys books.
    Reader,

    /// Publishes books and sees their own sales.
    Author,

    /// Sees everything.
    Admin,
}

impl Role {
    /// Whether the role may publish books.
    pub fn can_publish(self) -> bool {
        match self {
            Role::Author | Role::Admin => true,
            Role::Reader => false,
        }
    }

    /// Whether the role may see sales across all authors.
    pub fn can_view_platform_sales(self) -> bool {
        match self {
            Role::Admin => true,
            Role::Reader | Role::Author => false,
        }
    }
}

/// A registered user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User identifier
    pub id: UserId,

    /// Display name
    pub name: String,

    /// Contact email
    pub email: String,

    /// Role
    pub role: Role,

    /// When the account was created
    pub created_at: Timestamp,
}

impl User {
    /// Create a user registered now.
    pub fn new(id: UserId, name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            role,
            created_at: Timestamp::now(),
        }
    }
}

/// Customer details captured at purchase time.
///
/// Later edits to the [`User`] never reach an existing purchase record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// The purchasing user
    pub user_id: UserId,

    /// Name as entered at checkout
    pub name: String,

    /// Email as entered at checkout
    pub email: String,
}

impl From<&User> for Customer {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Loose `local@domain.tld` check.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }

    domain
        .rsplit_once('.')
        .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}
