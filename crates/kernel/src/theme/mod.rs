//! Theme engine and template rendering.
//!
//! Templates are Tera files under `templates/`, compiled into the binary and
//! optionally overridden from a directory at startup.

mod engine;

pub use engine::ThemeEngine;
