use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Advocate,
    ProductManager,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Advocate => "advocate",
            Role::ProductManager => "product_manager",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "advocate" => Ok(Role::Advocate),
            "product_manager" => Ok(Role::ProductManager),
            other => anyhow::bail!("unknown role {other:?}"),
        }
    }
}

/// Domain user. The password hash lives only in [`UserRow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: OffsetDateTime,
}

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    pub password_hash: String, // Argon2 PHC string
    pub created_at: OffsetDateTime,
}

impl UserRow {
    pub fn into_parts(self) -> anyhow::Result<(User, String)> {
        let user = User {
            id: self.id,
            email: self.email,
            name: self.name,
            role: self.role.parse()?,
            created_at: self.created_at,
        };
        Ok((user, self.password_hash))
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub password_hash: String,
}
