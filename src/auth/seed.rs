use tracing::info;

use super::{
    password::hash_password,
    repo::UserStore,
    repo_types::{NewUser, Role},
};

struct SeedUser {
    email: &'static str,
    name: &'static str,
    role: Role,
    password: &'static str,
}

/// Development accounts.
const SEED_USERS: &[SeedUser] = &[
    SeedUser {
        email: "advocate@example.com",
        name: "Test Advocate",
        role: Role::Advocate,
        password: "password123",
    },
    SeedUser {
        email: "pm@example.com",
        name: "Test PM",
        role: Role::ProductManager,
        password: "password123",
    },
];

/// Create the development users that don't exist yet. Returns how many were added.
pub async fn seed_users(users: &dyn UserStore) -> anyhow::Result<usize> {
    let mut created = 0;
    for seed in SEED_USERS {
        if users.find_by_email(seed.email).await?.is_some() {
            continue;
        }
        users
            .create(NewUser {
                email: seed.email.to_string(),
                name: seed.name.to_string(),
                role: seed.role,
                password_hash: hash_password(seed.password)?,
            })
            .await?;
        info!(email = seed.email, "seeded user");
        created += 1;
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::MemoryUserStore;

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let store = MemoryUserStore::new();
        assert_eq!(seed_users(&store).await.unwrap(), 2);
        assert_eq!(seed_users(&store).await.unwrap(), 0);

        let pm = store.find_by_email("pm@example.com").await.unwrap().unwrap();
        assert_eq!(pm.role, Role::ProductManager);
        assert_eq!(pm.name, "Test PM");
    }
}
