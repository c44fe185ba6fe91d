//! User accounts and the directories that look them up.

use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::permissions::{Identity, MANAGE_TESTIMONIALS};

/// User record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing)]
    pub pass: String,
    pub mail: String,
    pub is_admin: bool,
    pub status: i16,
    pub created: DateTime<Utc>,
}

/// Input for creating a new user.
#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub password: String,
    pub mail: String,
    pub is_admin: bool,
}

impl User {
    /// Check if this user is active.
    pub fn is_active(&self) -> bool {
        self.status == 1
    }

    /// Verify a password against this user's hash.
    pub fn verify_password(&self, password: &str) -> bool {
        if self.pass.is_empty() {
            return false;
        }

        let Ok(parsed_hash) = PasswordHash::new(&self.pass) else {
            return false;
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// The identity this account acts as.
    ///
    /// Administrators hold the moderation capability.
    pub fn identity(&self) -> Identity {
        let mut identity = Identity::new(self.id, &self.name);
        if !self.mail.is_empty() {
            identity = identity.with_email(&self.mail);
        }
        if self.is_admin {
            identity = identity.with_capability(MANAGE_TESTIMONIALS);
        }
        identity
    }
}

/// Hash a password using Argon2id.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Lookup and registration of user accounts.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_by_name(&self, name: &str) -> Result<Option<User>>;

    async fn create(&self, input: CreateUser) -> Result<User>;
}

/// Users stored in the `users` table.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, pass, mail, is_admin, status, created FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch user by id")?;

        Ok(user)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, pass, mail, is_admin, status, created FROM users WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch user by name")?;

        Ok(user)
    }

    async fn create(&self, input: CreateUser) -> Result<User> {
        let id = Uuid::now_v7();
        let pass = hash_password(&input.password)?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, pass, mail, is_admin, status, created)
            VALUES ($1, $2, $3, $4, $5, 1, NOW())
            RETURNING id, name, pass, mail, is_admin, status, created
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&pass)
        .bind(&input.mail)
        .bind(input.is_admin)
        .fetch_one(&self.pool)
        .await
        .context("failed to create user")?;

        Ok(user)
    }
}

/// Users held in process memory, keyed by ID.
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: RwLock<BTreeMap<Uuid, User>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.name == name)
            .cloned())
    }

    async fn create(&self, input: CreateUser) -> Result<User> {
        let pass = hash_password(&input.password)?;

        let mut users = self.users.write();
        if users.values().any(|u| u.name == input.name) {
            bail!("user '{}' already exists", input.name);
        }

        let user = User {
            id: Uuid::now_v7(),
            name: input.name,
            pass,
            mail: input.mail,
            is_admin: input.is_admin,
            status: 1,
            created: Utc::now(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }
}
