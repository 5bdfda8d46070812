//! The `users` table and its row type.

use std::fmt;

pub const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    email VARCHAR(250) NOT NULL,
    hashed_password VARCHAR(250) NOT NULL,
    session_id VARCHAR(250),
    reset_token VARCHAR(250)
)
"#;

pub const DROP_USERS_TABLE: &str = "DROP TABLE IF EXISTS users";

pub type UserId = i64;

/// A registered account.
///
/// `session_id` is set while the user is logged in and `reset_token` while a
/// password reset is pending.
#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub hashed_password: String,
    pub session_id: Option<String>,
    pub reset_token: Option<String>,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User(id={}, email='{}')", self.id, self.email)
    }
}
