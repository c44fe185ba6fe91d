//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::{BootstrapAdmin, Config, StorageBackend};
use crate::content::{ContentRepository, MemoryContentRepository, PgContentRepository};
use crate::db;
use crate::metrics::Metrics;
use crate::models::{CreateUser, MemoryUserDirectory, PgUserDirectory, UserDirectory};
use crate::testimonial::{SubmissionSettings, TestimonialService};
use crate::theme::ThemeEngine;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Testimonial workflows over the configured repository.
    testimonials: TestimonialService,

    /// User account lookup.
    users: Arc<dyn UserDirectory>,

    /// Tera templates.
    theme: Arc<ThemeEngine>,

    /// Prometheus metrics.
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Create application state for the configured backends.
    pub async fn new(config: &Config) -> Result<Self> {
        let theme = match &config.templates_dir {
            Some(dir) => ThemeEngine::new(dir)?,
            None => ThemeEngine::builtin()?,
        };

        let state = match config.storage_backend {
            StorageBackend::Postgres => {
                let pool = db::create_pool(config).await?;
                db::run_migrations(&pool).await?;
                info!("PostgreSQL storage ready");

                Self::from_parts(
                    Arc::new(PgContentRepository::new(pool.clone())),
                    Arc::new(PgUserDirectory::new(pool)),
                    config.submission.clone(),
                    theme,
                )
            }
            StorageBackend::Memory => {
                info!("using in-memory storage; data is lost on restart");
                Self::from_parts(
                    Arc::new(MemoryContentRepository::new()),
                    Arc::new(MemoryUserDirectory::new()),
                    config.submission.clone(),
                    theme,
                )
            }
        };

        if let Some(admin) = &config.bootstrap_admin {
            state
                .ensure_admin(admin)
                .await
                .context("failed to create bootstrap administrator")?;
        }

        Ok(state)
    }

    /// Assemble state from explicit collaborators.
    pub fn from_parts(
        repository: Arc<dyn ContentRepository>,
        users: Arc<dyn UserDirectory>,
        settings: SubmissionSettings,
        theme: ThemeEngine,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                testimonials: TestimonialService::new(repository, settings),
                users,
                theme: Arc::new(theme),
                metrics: Arc::new(Metrics::new()),
            }),
        }
    }

    /// Create the configured administrator unless the name is taken.
    async fn ensure_admin(&self, admin: &BootstrapAdmin) -> Result<()> {
        if self.users().find_by_name(&admin.name).await?.is_some() {
            return Ok(());
        }
        let user = self
            .users()
            .create(CreateUser {
                name: admin.name.clone(),
                password: admin.password.clone(),
                mail: admin.email.clone(),
                is_admin: true,
            })
            .await?;
        info!(user_id = %user.id, name = %user.name, "bootstrap administrator created");
        Ok(())
    }

    /// Get the testimonial service.
    pub fn testimonials(&self) -> &TestimonialService {
        &self.inner.testimonials
    }

    /// Get the user directory.
    pub fn users(&self) -> &Arc<dyn UserDirectory> {
        &self.inner.users
    }

    /// Get the theme engine.
    pub fn theme(&self) -> &Arc<ThemeEngine> {
        &self.inner.theme
    }

    /// Get the metrics registry.
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.inner.metrics
    }

    /// Check if the content store is reachable.
    pub async fn storage_healthy(&self) -> bool {
        self.inner.testimonials.is_healthy().await
    }
}
