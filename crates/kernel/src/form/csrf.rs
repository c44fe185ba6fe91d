//! CSRF token generation and verification.
//!
//! Tokens live in the session, are single-use, and expire after
//! [`TOKEN_VALIDITY_SECS`].

use anyhow::{Context, Result, bail};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tower_sessions::Session;

/// Session key for storing CSRF tokens.
const CSRF_SESSION_KEY: &str = "csrf_tokens";

/// Maximum number of tokens to store per session.
const MAX_TOKENS: usize = 10;

/// Token validity period in seconds (1 hour).
pub const TOKEN_VALIDITY_SECS: i64 = 3600;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredToken {
    token: String,
    issued_at: i64,
}

impl StoredToken {
    fn is_fresh(&self, now: i64) -> bool {
        now - self.issued_at <= TOKEN_VALIDITY_SECS
    }

    fn matches(&self, submitted: &str) -> bool {
        self.token.as_bytes().ct_eq(submitted.as_bytes()).into()
    }
}

async fn load_tokens(session: &Session) -> Result<Vec<StoredToken>> {
    Ok(session
        .get::<Vec<StoredToken>>(CSRF_SESSION_KEY)
        .await
        .context("failed to read CSRF tokens")?
        .unwrap_or_default())
}

/// Generate a CSRF token and store it in the session.
pub async fn generate_csrf_token(session: &Session) -> Result<String> {
    let mut random_bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut random_bytes);
    let issued_at = chrono::Utc::now().timestamp();

    let mut hasher = Sha256::new();
    hasher.update(random_bytes);
    hasher.update(issued_at.to_le_bytes());
    let token = hex::encode(hasher.finalize());

    let mut tokens = load_tokens(session).await?;
    tokens.push(StoredToken {
        token: token.clone(),
        issued_at,
    });
    if tokens.len() > MAX_TOKENS {
        let excess = tokens.len() - MAX_TOKENS;
        tokens.drain(..excess);
    }

    session
        .insert(CSRF_SESSION_KEY, tokens)
        .await
        .context("failed to store CSRF token")?;

    Ok(token)
}

/// Verify a CSRF token against the session.
///
/// A matching token is consumed; expired tokens are pruned on the way.
pub async fn verify_csrf_token(session: &Session, submitted: &str) -> Result<bool> {
    if submitted.is_empty() {
        bail!("empty CSRF token");
    }

    let tokens = load_tokens(session).await?;
    if tokens.is_empty() {
        return Ok(false);
    }

    let now = chrono::Utc::now().timestamp();
    let found = tokens
        .iter()
        .position(|t| t.is_fresh(now) && t.matches(submitted));

    let Some(index) = found else {
        return Ok(false);
    };

    let remaining: Vec<StoredToken> = tokens
        .into_iter()
        .enumerate()
        .filter(|(i, t)| *i != index && t.is_fresh(now))
        .map(|(_, t)| t)
        .collect();

    session
        .insert(CSRF_SESSION_KEY, remaining)
        .await
        .context("failed to update CSRF tokens")?;

    Ok(true)
}
