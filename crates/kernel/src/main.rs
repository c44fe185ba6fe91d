//! Testimonials server.
//!
//! HTTP server for submitting, moderating, and displaying testimonials.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use testimonials_kernel::cli::{Cli, Command};
use testimonials_kernel::config::{Config, SessionBackend, StorageBackend};
use testimonials_kernel::models::{CreateUser, PgUserDirectory, UserDirectory};
use testimonials_kernel::state::AppState;
use testimonials_kernel::{db, routes, session};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let command = Cli::parse().command();
    let config = Config::from_env().context("failed to load configuration")?;

    match command {
        Command::Serve => serve(config).await,
        Command::Migrate => migrate(&config).await,
        Command::CreateUser {
            name,
            email,
            password,
            admin,
        } => create_user(&config, name, email, password, admin).await,
    }
}

async fn serve(config: Config) -> Result<()> {
    info!("Starting testimonials server");
    info!(
        port = config.port,
        storage = ?config.storage_backend,
        sessions = ?config.session_backend,
        "Configuration loaded"
    );

    let state = AppState::new(&config)
        .await
        .context("failed to initialize application state")?;

    let same_site = session::parse_same_site(&config.cookie_same_site);
    let app = match config.session_backend {
        SessionBackend::Redis => {
            let layer = session::create_redis_session_layer(
                &config.redis_url,
                same_site,
                config.cookie_secure,
            )
            .await
            .context("failed to create session layer")?;
            routes::app(state, layer)
        }
        SessionBackend::Memory => routes::app(
            state,
            session::create_memory_session_layer(same_site, config.cookie_secure),
        ),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to address")?;

    info!(%addr, "Server listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

async fn migrate(config: &Config) -> Result<()> {
    let pool = db::create_pool(config).await?;
    db::run_migrations(&pool).await
}

async fn create_user(
    config: &Config,
    name: String,
    email: String,
    password: String,
    is_admin: bool,
) -> Result<()> {
    if config.storage_backend != StorageBackend::Postgres {
        anyhow::bail!("create-user needs the postgres storage backend; memory users vanish on exit");
    }

    let pool = db::create_pool(config).await?;
    db::run_migrations(&pool).await?;

    let user = PgUserDirectory::new(pool)
        .create(CreateUser {
            name,
            password,
            mail: email,
            is_admin,
        })
        .await?;

    info!(user_id = %user.id, name = %user.name, is_admin, "user created");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
