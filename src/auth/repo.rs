use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User, UserRow};

/// Credential store. Absence is `Ok(None)`, never an error.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Exact, case-sensitive match on the stored email.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    /// Only login needs the hash.
    async fn find_by_email_with_hash(&self, email: &str)
        -> anyhow::Result<Option<(User, String)>>;
    async fn create(&self, new: NewUser) -> anyhow::Result<User>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn row_by_email(&self, email: &str) -> anyhow::Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, name, role, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("select user by email")?;
        Ok(row)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        tracing::debug!(%email, "find_by_email");
        match self.row_by_email(email).await? {
            Some(row) => Ok(Some(row.into_parts()?.0)),
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        tracing::debug!(user_id = %id, "find_by_id");
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, name, role, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("select user by id")?;
        match row {
            Some(row) => Ok(Some(row.into_parts()?.0)),
            None => Ok(None),
        }
    }

    async fn find_by_email_with_hash(
        &self,
        email: &str,
    ) -> anyhow::Result<Option<(User, String)>> {
        tracing::debug!(%email, "find_by_email_with_hash");
        self.row_by_email(email)
            .await?
            .map(UserRow::into_parts)
            .transpose()
    }

    async fn create(&self, new: NewUser) -> anyhow::Result<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, email, name, role, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, name, role, password_hash, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.email)
        .bind(&new.name)
        .bind(new.role.as_str())
        .bind(&new.password_hash)
        .fetch_one(&self.db)
        .await
        .context("insert user")?;
        Ok(row.into_parts()?.0)
    }
}

/// In-memory credential store, used when no database is configured.
#[derive(Default)]
pub struct MemoryUserStore {
    rows: RwLock<Vec<UserRow>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.find_by_email_with_hash(email).await?.map(|(user, _)| user))
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let rows = self.rows.read().await;
        rows.iter()
            .find(|r| r.id == id)
            .cloned()
            .map(|r| r.into_parts().map(|(user, _)| user))
            .transpose()
    }

    async fn find_by_email_with_hash(
        &self,
        email: &str,
    ) -> anyhow::Result<Option<(User, String)>> {
        let rows = self.rows.read().await;
        rows.iter()
            .find(|r| r.email == email)
            .cloned()
            .map(UserRow::into_parts)
            .transpose()
    }

    async fn create(&self, new: NewUser) -> anyhow::Result<User> {
        let mut rows = self.rows.write().await;
        anyhow::ensure!(
            rows.iter().all(|r| r.email != new.email),
            "email {} already registered",
            new.email
        );
        let row = UserRow {
            id: Uuid::new_v4(),
            email: new.email,
            name: new.name,
            role: new.role.as_str().to_string(),
            password_hash: new.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        rows.push(row.clone());
        Ok(row.into_parts()?.0)
    }
}
