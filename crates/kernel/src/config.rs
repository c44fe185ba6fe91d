//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};

use crate::testimonial::{EmailFieldMode, SubmissionSettings};

/// Where content records are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// In-process store; contents are lost on restart.
    Memory,
    /// PostgreSQL via `DATABASE_URL`.
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => bail!("unknown storage backend '{other}' (expected memory or postgres)"),
        }
    }
}

/// Where sessions are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBackend {
    Memory,
    Redis,
}

impl FromStr for SessionBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => bail!("unknown session backend '{other}' (expected memory or redis)"),
        }
    }
}

/// Account created at startup when no user with its name exists.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub name: String,
    pub password: String,
    pub email: String,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// Content and user storage (default: postgres when `DATABASE_URL` is set).
    pub storage_backend: StorageBackend,

    /// PostgreSQL connection URL.
    pub database_url: Option<String>,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Session storage (default: redis when `REDIS_URL` is set).
    pub session_backend: SessionBackend,

    /// Redis connection URL.
    pub redis_url: String,

    /// Cookie SameSite policy: "strict", "lax", or "none" (default: "strict").
    pub cookie_same_site: String,

    /// Whether the session cookie requires HTTPS (default: true).
    pub cookie_secure: bool,

    /// Directory of template overrides.
    pub templates_dir: Option<PathBuf>,

    /// Submission form settings.
    pub submission: SubmissionSettings,

    /// Optional administrator created on startup.
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url = env::var("DATABASE_URL").ok();

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(v) => v.parse()?,
            Err(_) if database_url.is_some() => StorageBackend::Postgres,
            Err(_) => StorageBackend::Memory,
        };

        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL environment variable is required for the postgres backend");
        }

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let redis_env = env::var("REDIS_URL").ok();
        let session_backend = match env::var("SESSION_BACKEND") {
            Ok(v) => v.parse()?,
            Err(_) if redis_env.is_some() => SessionBackend::Redis,
            Err(_) => SessionBackend::Memory,
        };
        let redis_url = redis_env.unwrap_or_else(|| "redis://127.0.0.1:6379".to_string());

        let cookie_same_site = env::var("COOKIE_SAME_SITE")
            .unwrap_or_else(|_| "strict".to_string())
            .to_lowercase();

        let cookie_secure = env::var("COOKIE_SECURE")
            .map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no"))
            .unwrap_or(true);

        let templates_dir = env::var("TEMPLATES_DIR").ok().map(PathBuf::from);

        let email_field: EmailFieldMode = match env::var("TESTIMONIAL_EMAIL_FIELD") {
            Ok(v) => v.parse().context("TESTIMONIAL_EMAIL_FIELD is invalid")?,
            Err(_) => EmailFieldMode::default(),
        };

        let message_max_length = match env::var("TESTIMONIAL_MESSAGE_MAX_LENGTH") {
            Ok(v) => v
                .parse()
                .context("TESTIMONIAL_MESSAGE_MAX_LENGTH must be a valid usize")?,
            Err(_) => SubmissionSettings::default().message_max_length,
        };

        let bootstrap_admin = match (
            env::var("BOOTSTRAP_ADMIN_NAME"),
            env::var("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Ok(name), Ok(password)) if !name.trim().is_empty() && !password.is_empty() => {
                let email = env::var("BOOTSTRAP_ADMIN_EMAIL")
                    .unwrap_or_else(|_| format!("{}@localhost.localdomain", name.trim()));
                Some(BootstrapAdmin {
                    name: name.trim().to_string(),
                    password,
                    email,
                })
            }
            _ => None,
        };

        Ok(Self {
            port,
            storage_backend,
            database_url,
            database_max_connections,
            session_backend,
            redis_url,
            cookie_same_site,
            cookie_secure,
            templates_dir,
            submission: SubmissionSettings {
                email_field,
                message_max_length,
            },
            bootstrap_admin,
        })
    }

    /// In-memory configuration for tests and local experiments.
    pub fn in_memory() -> Self {
        Self {
            port: 3000,
            storage_backend: StorageBackend::Memory,
            database_url: None,
            database_max_connections: 10,
            session_backend: SessionBackend::Memory,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            cookie_same_site: "strict".to_string(),
            cookie_secure: false,
            templates_dir: None,
            submission: SubmissionSettings::default(),
            bootstrap_admin: None,
        }
    }

    /// `DATABASE_URL`, or an error naming it.
    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL environment variable is required")
    }
}
