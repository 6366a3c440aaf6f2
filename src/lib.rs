//! # agrosuelo-api — Administrative Backend for the Soil-Resource Program
//!
//! The service owns the role–capability matrix that front-ends consult to
//! decide what each role may do on each screen, plus the reference catalogs
//! the program's forms depend on (geography, chemical elements).
//!
//! ## API Surface
//!
//! | Prefix                      | Module                   | Domain                       |
//! |-----------------------------|--------------------------|------------------------------|
//! | `/v1/permissions/matrix*`   | [`routes::matrix`]       | Dense matrix projection      |
//! | `/v1/permissions/reconcile` | [`routes::matrix`]       | Batch reconciliation         |
//! | `/v1/permissions/by-name`   | [`routes::matrix`]       | Name-keyed single-pair grants|
//! | `/v1/roles/*`               | [`routes::roles`]        | Role directory               |
//! | `/v1/interfaces/*`          | [`routes::interfaces`]   | Interface directory          |
//! | `/v1/geography/*`           | [`routes::geography`]    | Countries/departments/municipalities |
//! | `/v1/elements/*`            | [`routes::elements`]     | Soil-chemistry catalog       |
//! | `/v1/parcels/*`             | [`routes::parcels`]      | Land parcel registry         |
//! | `/v1/analyses/*`            | [`routes::analyses`]     | Soil analysis log            |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Auto-generated spec via utoipa derive macros at `/openapi.json`.

pub mod db;
pub mod error;
pub mod extractors;
pub mod matrix;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Check if metrics are enabled via the `AGROSUELO_METRICS_ENABLED` env var.
/// Defaults to `true` when the variable is absent or set to anything other
/// than `"false"`.
fn metrics_enabled() -> bool {
    std::env::var("AGROSUELO_METRICS_ENABLED")
        .map(|v| v.to_lowercase() != "false")
        .unwrap_or(true)
}

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) and `/metrics` are mounted outside the `/v1`
/// API surface.
pub fn app(state: AppState) -> Router {
    let metrics = ApiMetrics::new();
    let metrics_on = metrics_enabled();

    // Body size limit: 2 MiB. A full-matrix reconcile for a large deployment
    // stays well under this.
    let mut api = Router::new()
        .merge(routes::matrix::router())
        .merge(routes::roles::router())
        .merge(routes::interfaces::router())
        .merge(routes::geography::router())
        .merge(routes::elements::router())
        .merge(routes::parcels::router())
        .merge(routes::analyses::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024));

    // Only register the metrics middleware when metrics are enabled.
    if metrics_on {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(axum::Extension(metrics.clone()));
    }

    let api = api
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let mut ops = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    if metrics_on {
        ops = ops
            .route("/metrics", axum::routing::get(prometheus_metrics))
            .layer(axum::Extension(metrics));
    }

    let ops = ops.with_state(state);

    Router::new().merge(ops).merge(api)
}

/// GET /metrics — Prometheus metrics scrape endpoint.
///
/// Updates domain gauges from current `AppState` on each scrape (pull
/// model), then gathers and encodes all metrics in Prometheus text
/// exposition format.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    metrics.roles_total().set(state.roles.active_len() as f64);
    metrics
        .interfaces_total()
        .set(state.interfaces.active_len() as f64);
    metrics
        .capability_edges_total()
        .set(state.capabilities.len() as f64);
    metrics.geography_records_total().set(
        (state.countries.len() + state.departments.len() + state.municipalities.len()) as f64,
    );
    metrics
        .catalog_elements_total()
        .set(state.elements.len() as f64);
    metrics.parcels_total().set(state.parcels.len() as f64);
    metrics
        .soil_analyses_total()
        .set(state.analyses.len() as f64);

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — verifies the application is ready to serve traffic.
///
/// Checks:
/// - In-memory stores are accessible.
/// - Database connection is healthy (when configured).
///
/// Returns 200 "ready" or 503 with a diagnostic message.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    // Verify stores are accessible (read lock acquirable).
    let _ = state.roles.len();
    let _ = state.interfaces.len();
    let _ = state.capabilities.len();

    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("Database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}
