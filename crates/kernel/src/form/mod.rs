//! Form support shared by the HTML routes.

pub mod csrf;

pub use csrf::{generate_csrf_token, verify_csrf_token};
