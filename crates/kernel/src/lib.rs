//! Testimonials kernel library.
//!
//! Validation, submission, moderation, and display of testimonials over an
//! abstract content repository, plus the axum adapter that serves them. The
//! `testimonials` binary wires these together.

pub mod cli;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod form;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod permissions;
pub mod routes;
pub mod session;
pub mod state;
pub mod testimonial;
pub mod theme;

pub use config::Config;
pub use state::AppState;
