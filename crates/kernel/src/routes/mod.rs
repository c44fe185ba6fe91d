//! HTTP route handlers.

pub mod admin;
pub mod auth;
pub mod health;
pub mod helpers;
pub mod metrics;
pub mod testimonial;

use axum::Router;
use axum::response::Redirect;
use axum::routing::get;
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::middleware::record_metrics;
use crate::state::AppState;

/// All routes, without middleware or state.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::to("/testimonials") }))
        .merge(testimonial::router())
        .merge(admin::router())
        .merge(auth::router())
        .merge(health::router())
        .merge(metrics::router())
}

/// The complete application: routes, middleware, and state.
///
/// Layers run outermost first: TraceLayer, session, metrics, routes.
pub fn app<S>(state: AppState, session_layer: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    router()
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            record_metrics,
        ))
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
