//! Content storage module.
//!
//! This module provides:
//! - ContentRepository: the storage seam every workflow talks to
//! - MemoryContentRepository: process-local backend (tests, single-node demos)
//! - PgContentRepository: PostgreSQL backend
//! - Sanitizers shared by the submission and admin edit paths

mod memory;
mod postgres;
mod repository;
pub mod sanitize;

pub use memory::MemoryContentRepository;
pub use postgres::PgContentRepository;
pub use repository::{
    ContentFields, ContentRecord, ContentRepository, ContentStatus, QueryOrder, RepositoryError,
};
