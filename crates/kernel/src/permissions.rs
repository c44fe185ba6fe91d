//! Actors and capability checks.
//!
//! Workflows receive the acting identity explicitly; nothing here reads
//! ambient request state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Capability required to see and act on the moderation queue.
pub const MANAGE_TESTIMONIALS: &str = "manage testimonials";

/// An authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    /// Registered account email, when the account has one.
    pub email: Option<String>,
    pub capabilities: BTreeSet<String>,
}

impl Identity {
    /// Create an identity with no capabilities.
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: None,
            capabilities: BTreeSet::new(),
        }
    }

    /// Attach the registered account email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Grant a capability.
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }
}

/// Whoever is making the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    Authenticated(Identity),
}

impl Actor {
    /// The identity behind this actor, if authenticated.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Actor::Anonymous => None,
            Actor::Authenticated(identity) => Some(identity),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Actor::Authenticated(_))
    }

    /// Check a capability. Anonymous actors hold none.
    pub fn has_capability(&self, capability: &str) -> bool {
        self.identity()
            .is_some_and(|identity| identity.capabilities.contains(capability))
    }

    /// Identifier for log fields; nil for anonymous.
    pub fn log_id(&self) -> Uuid {
        self.identity().map(|i| i.id).unwrap_or(Uuid::nil())
    }
}

impl From<Identity> for Actor {
    fn from(identity: Identity) -> Self {
        Actor::Authenticated(identity)
    }
}
