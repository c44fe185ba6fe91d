//! Prometheus metrics collection.
//!
//! Provides application metrics in Prometheus format.

use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;

/// HTTP request labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HttpLabels {
    pub method: String,
    pub path: String,
    pub status: u16,
}

/// Submission outcome labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct SubmissionLabels {
    pub outcome: String,
}

/// Moderation action labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ModerationLabels {
    pub action: String,
    pub outcome: String,
}

/// Application metrics.
///
/// Counter names are registered without the `_total` suffix; the text
/// encoder appends it.
pub struct Metrics {
    registry: Registry,

    /// HTTP request counter by method/path/status.
    pub http_requests: Family<HttpLabels, Counter>,

    /// HTTP request duration histogram.
    pub http_duration_seconds: Family<HttpLabels, Histogram>,

    /// Submission attempts by outcome.
    pub submissions: Family<SubmissionLabels, Counter>,

    /// Moderation actions by action and outcome.
    pub moderation_actions: Family<ModerationLabels, Counter>,
}

impl Metrics {
    /// Create a new metrics registry.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let http_requests = Family::<HttpLabels, Counter>::default();
        registry.register(
            "http_requests",
            "Total HTTP requests",
            http_requests.clone(),
        );

        let http_duration_seconds = Family::<HttpLabels, Histogram>::new_with_constructor(|| {
            Histogram::new(exponential_buckets(0.001, 2.0, 12))
        });
        registry.register(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
            http_duration_seconds.clone(),
        );

        let submissions = Family::<SubmissionLabels, Counter>::default();
        registry.register(
            "testimonial_submissions",
            "Testimonial submission attempts by outcome",
            submissions.clone(),
        );

        let moderation_actions = Family::<ModerationLabels, Counter>::default();
        registry.register(
            "testimonial_moderation_actions",
            "Moderation actions by action and outcome",
            moderation_actions.clone(),
        );

        Self {
            registry,
            http_requests,
            http_duration_seconds,
            submissions,
            moderation_actions,
        }
    }

    /// Record an HTTP request.
    ///
    /// `path` is the matched route template, never the raw request path.
    pub fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let labels = HttpLabels {
            method: method.to_string(),
            path: path.to_string(),
            status,
        };

        self.http_requests.get_or_create(&labels).inc();
        self.http_duration_seconds
            .get_or_create(&labels)
            .observe(duration_secs);
    }

    /// Record a submission attempt.
    pub fn record_submission(&self, outcome: &str) {
        self.submissions
            .get_or_create(&SubmissionLabels {
                outcome: outcome.to_string(),
            })
            .inc();
    }

    /// Record a moderation action.
    pub fn record_moderation(&self, action: &str, outcome: &str) {
        self.moderation_actions
            .get_or_create(&ModerationLabels {
                action: action.to_string(),
                outcome: outcome.to_string(),
            })
            .inc();
    }

    /// Encode metrics in Prometheus text format.
    ///
    /// # Panics
    ///
    /// Panics if Prometheus metric encoding to a `String` buffer fails.
    /// The `fmt::Write` impl for `String` is infallible, and all metric
    /// labels use derived `EncodeLabelSet` impls that do not produce
    /// `fmt::Error`.
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        // Prometheus encoding to String buffer is infallible
        #[allow(clippy::expect_used)]
        encode(&mut buffer, &self.registry).expect("encoding metrics");
        buffer
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish()
    }
}
