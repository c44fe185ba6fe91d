//! Input sanitizing pipelines.
//!
//! Submitted values pass through a pipeline before validation:
//! - text_field: strips tags, folds line breaks/tabs/runs of spaces, trims
//! - textarea: strips tags, keeps line breaks, trims
//! - email: drops every character outside the address alphabet
//!
//! Output escaping happens at render time; these pipelines never produce
//! HTML entities.

use std::sync::LazyLock;

use regex::Regex;

/// `<script>`/`<style>` elements are dropped together with their contents.
static SCRIPT_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script[^>]*?>.*?</script\s*>|<style[^>]*?>.*?</style\s*>")
        .unwrap_or_else(|e| panic!("invalid script/style pattern: {e}"))
});

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<[^>]*>").unwrap_or_else(|e| panic!("invalid tag pattern: {e}"))
});

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\r\n\t ]+").unwrap_or_else(|e| panic!("invalid whitespace pattern: {e}"))
});

/// A single step of a sanitizing pipeline.
pub trait TextFilter: Send + Sync {
    /// Filter name for debugging.
    fn name(&self) -> &str;

    /// Process the input text and return filtered output.
    fn process(&self, input: &str) -> String;
}

/// Pipeline of text filters applied in sequence.
pub struct FilterPipeline {
    filters: Vec<Box<dyn TextFilter>>,
}

impl FilterPipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Add a filter to the pipeline.
    pub fn add<F: TextFilter + 'static>(mut self, filter: F) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Single-line text input.
    pub fn text_field() -> Self {
        Self::new()
            .add(StripTagsFilter)
            .add(FoldWhitespaceFilter)
            .add(TrimFilter)
    }

    /// Multi-line text input.
    pub fn textarea() -> Self {
        Self::new()
            .add(StripTagsFilter)
            .add(NormalizeNewlinesFilter)
            .add(TrimFilter)
    }

    /// Email address input.
    pub fn email() -> Self {
        Self::new().add(TrimFilter).add(EmailCharsFilter)
    }

    /// Names of the filters in order, for diagnostics.
    pub fn filter_names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Process text through all filters in the pipeline.
    pub fn process(&self, input: &str) -> String {
        self.filters
            .iter()
            .fold(input.to_string(), |acc, filter| filter.process(&acc))
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::text_field()
    }
}

/// Removes markup, including the bodies of script and style elements.
pub struct StripTagsFilter;

impl TextFilter for StripTagsFilter {
    fn name(&self) -> &str {
        "strip_tags"
    }

    fn process(&self, input: &str) -> String {
        let without_blocks = SCRIPT_STYLE.replace_all(input, "");
        TAG.replace_all(&without_blocks, "").into_owned()
    }
}

/// Collapses line breaks, tabs, and runs of spaces to a single space.
pub struct FoldWhitespaceFilter;

impl TextFilter for FoldWhitespaceFilter {
    fn name(&self) -> &str {
        "fold_whitespace"
    }

    fn process(&self, input: &str) -> String {
        WHITESPACE_RUN.replace_all(input, " ").into_owned()
    }
}

/// Converts CRLF and lone CR line endings to LF.
pub struct NormalizeNewlinesFilter;

impl TextFilter for NormalizeNewlinesFilter {
    fn name(&self) -> &str {
        "normalize_newlines"
    }

    fn process(&self, input: &str) -> String {
        input.replace("\r\n", "\n").replace('\r', "\n")
    }
}

pub struct TrimFilter;

impl TextFilter for TrimFilter {
    fn name(&self) -> &str {
        "trim"
    }

    fn process(&self, input: &str) -> String {
        input.trim().to_string()
    }
}

/// Keeps only characters that may appear in an email address.
pub struct EmailCharsFilter;

impl EmailCharsFilter {
    fn allowed(c: char) -> bool {
        c.is_ascii_alphanumeric() || "!#$%&'*+-/=?^_`{|}~.@".contains(c)
    }
}

impl TextFilter for EmailCharsFilter {
    fn name(&self) -> &str {
        "email_chars"
    }

    fn process(&self, input: &str) -> String {
        input.chars().filter(|c| Self::allowed(*c)).collect()
    }
}

/// Sanitize a single-line text value.
pub fn text_field(input: &str) -> String {
    FilterPipeline::text_field().process(input)
}

/// Sanitize a multi-line text value.
pub fn textarea(input: &str) -> String {
    FilterPipeline::textarea().process(input)
}

/// Sanitize an email address.
pub fn email(input: &str) -> String {
    FilterPipeline::email().process(input)
}

/// Parse a submitted integer the lenient way form posts expect.
///
/// Leading whitespace and an optional sign are accepted, then digits are read
/// until the first non-digit. Anything unparseable yields 0; out-of-range
/// values saturate.
pub fn integer(input: &str) -> i64 {
    let s = input.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }

    if negative { value.saturating_neg() } else { value }
}
