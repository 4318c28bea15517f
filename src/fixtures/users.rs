//! User Fixtures

use jiff::Timestamp;
use serde::Deserialize;

use crate::users::{Role, User, UserId};

/// Wrapper for users in YAML
#[derive(Debug, Deserialize)]
pub struct UsersFixture {
    /// Registered users
    pub users: Vec<UserFixture>,
}

/// User fixture from YAML
#[derive(Debug, Deserialize)]
pub struct UserFixture {
    /// User identifier
    pub id: u64,

    /// Display name
    pub name: String,

    /// Contact email
    pub email: String,

    /// Role
    pub role: Role,
}

impl From<UserFixture> for User {
    fn from(fixture: UserFixture) -> Self {
        User {
            id: UserId(fixture.id),
            name: fixture.name,
            email: fixture.email,
            role: fixture.role,
            created_at: Timestamp::UNIX_EPOCH,
        }
    }
}
