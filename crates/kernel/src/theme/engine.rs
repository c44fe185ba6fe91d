//! Theme engine with Tera templates.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use tera::Tera;
use tracing::debug;

use crate::testimonial::rating_glyphs;

/// Templates compiled into the binary. A template directory given to
/// [`ThemeEngine::new`] may override any of them by name.
const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("layout.html", include_str!("../../../../templates/layout.html")),
    (
        "testimonials/list.html",
        include_str!("../../../../templates/testimonials/list.html"),
    ),
    (
        "testimonials/submit.html",
        include_str!("../../../../templates/testimonials/submit.html"),
    ),
    (
        "admin/testimonials.html",
        include_str!("../../../../templates/admin/testimonials.html"),
    ),
    (
        "admin/testimonial-edit.html",
        include_str!("../../../../templates/admin/testimonial-edit.html"),
    ),
    ("user/login.html", include_str!("../../../../templates/user/login.html")),
];

/// Theme engine for rendering templates.
pub struct ThemeEngine {
    tera: Tera,
}

impl ThemeEngine {
    /// Create a theme engine from the built-in templates only.
    pub fn builtin() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(BUILTIN_TEMPLATES.iter().copied())
            .context("failed to compile built-in templates")?;
        Self::register_filters(&mut tera);
        Ok(Self { tera })
    }

    /// Create a theme engine loading templates from the given directory.
    ///
    /// Built-in templates fill in anything the directory does not provide.
    pub fn new(template_dir: &Path) -> Result<Self> {
        let pattern = template_dir.join("**/*.html");
        let pattern_str = pattern
            .to_str()
            .context("invalid template directory path")?;

        let mut tera = Tera::new(pattern_str).context("failed to initialize Tera templates")?;
        let builtin = Self::builtin()?;
        tera.extend(&builtin.tera)
            .context("failed to merge built-in templates")?;
        Self::register_filters(&mut tera);

        debug!(
            count = tera.get_template_names().count(),
            dir = %template_dir.display(),
            "loaded templates"
        );

        Ok(Self { tera })
    }

    /// Register custom Tera filters.
    fn register_filters(tera: &mut Tera) {
        // RFC 3339 strings (serialized `DateTime<Utc>`) or Unix timestamps.
        tera.register_filter(
            "format_date",
            |value: &tera::Value, _args: &HashMap<String, tera::Value>| {
                let parsed = match value {
                    tera::Value::Number(n) => n
                        .as_i64()
                        .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0)),
                    tera::Value::String(s) => chrono::DateTime::parse_from_rfc3339(s)
                        .ok()
                        .map(|dt| dt.to_utc()),
                    _ => None,
                };
                let formatted = parsed
                    .map(|dt| crate::testimonial::format_date(&dt))
                    .unwrap_or_default();
                Ok(tera::Value::String(formatted))
            },
        );

        tera.register_filter(
            "stars",
            |value: &tera::Value, _args: &HashMap<String, tera::Value>| {
                let rating = value
                    .as_u64()
                    .and_then(|r| u8::try_from(r).ok())
                    .unwrap_or(0);
                Ok(tera::Value::String(rating_glyphs(rating)))
            },
        );
    }

    /// Get the underlying Tera instance for custom operations.
    pub fn tera(&self) -> &Tera {
        &self.tera
    }

    /// Render a named template.
    pub fn render(&self, template: &str, context: &tera::Context) -> Result<String> {
        self.tera
            .render(template, context)
            .with_context(|| format!("failed to render template {template}"))
    }
}

impl std::fmt::Debug for ThemeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeEngine")
            .field("template_count", &self.tera.get_template_names().count())
            .finish()
    }
}
