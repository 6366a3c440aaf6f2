//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware. Domain-level gauges (roles, interfaces, capability edges,
//! geography, catalog entries) are updated on each `/metrics` scrape (pull
//! model) — see the metrics handler in `lib.rs`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{
    core::Collector, Encoder, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    // -- HTTP middleware metrics (push model) --
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    // -- Domain gauges (pull model, updated on /metrics scrape) --
    roles_total: prometheus::Gauge,
    interfaces_total: prometheus::Gauge,
    capability_edges_total: prometheus::Gauge,
    geography_records_total: prometheus::Gauge,
    catalog_elements_total: prometheus::Gauge,
    parcels_total: prometheus::Gauge,
    soil_analyses_total: prometheus::Gauge,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .finish()
    }
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("agrosuelo_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let http_request_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "agrosuelo_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "path"],
        )
        .expect("metric can be created");

        let http_errors_total = IntCounterVec::new(
            Opts::new(
                "agrosuelo_http_errors_total",
                "Total HTTP errors (4xx and 5xx)",
            ),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let roles_total = prometheus::Gauge::new(
            "agrosuelo_roles_total",
            "Active roles in the directory",
        )
        .expect("metric can be created");

        let interfaces_total = prometheus::Gauge::new(
            "agrosuelo_interfaces_total",
            "Active interfaces in the directory",
        )
        .expect("metric can be created");

        let capability_edges_total = prometheus::Gauge::new(
            "agrosuelo_capability_edges_total",
            "Stored capability edges (sparse, active and inactive endpoints)",
        )
        .expect("metric can be created");

        let geography_records_total = prometheus::Gauge::new(
            "agrosuelo_geography_records_total",
            "Countries, departments and municipalities combined",
        )
        .expect("metric can be created");

        let catalog_elements_total = prometheus::Gauge::new(
            "agrosuelo_catalog_elements_total",
            "Chemical elements in the catalog",
        )
        .expect("metric can be created");

        let parcels_total = prometheus::Gauge::new(
            "agrosuelo_parcels_total",
            "Registered land parcels, active and inactive",
        )
        .expect("metric can be created");

        let soil_analyses_total = prometheus::Gauge::new(
            "agrosuelo_soil_analyses_total",
            "Recorded soil analyses, active and inactive",
        )
        .expect("metric can be created");

        // Register all metrics.
        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_errors_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(roles_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(interfaces_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(capability_edges_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(geography_records_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(catalog_elements_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(parcels_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(soil_analyses_total.clone()))
            .expect("metric can be registered");

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                roles_total,
                interfaces_total,
                capability_edges_total,
                geography_records_total,
                catalog_elements_total,
                parcels_total,
                soil_analyses_total,
            }),
        }
    }

    /// Current total request count (sum across all labels).
    pub fn requests(&self) -> u64 {
        let mut total = 0u64;
        let families = self.inner.http_requests_total.collect();
        for mf in &families {
            for m in mf.get_metric() {
                total += m.get_counter().get_value() as u64;
            }
        }
        total
    }

    /// Current total error count (sum across all labels).
    pub fn errors(&self) -> u64 {
        let mut total = 0u64;
        let families = self.inner.http_errors_total.collect();
        for mf in &families {
            for m in mf.get_metric() {
                total += m.get_counter().get_value() as u64;
            }
        }
        total
    }

    /// Record an HTTP request (called by the middleware).
    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();

        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);

        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    // -- Domain gauge accessors (used by the /metrics handler) --

    pub fn roles_total(&self) -> &prometheus::Gauge {
        &self.inner.roles_total
    }

    pub fn interfaces_total(&self) -> &prometheus::Gauge {
        &self.inner.interfaces_total
    }

    pub fn capability_edges_total(&self) -> &prometheus::Gauge {
        &self.inner.capability_edges_total
    }

    pub fn geography_records_total(&self) -> &prometheus::Gauge {
        &self.inner.geography_records_total
    }

    pub fn catalog_elements_total(&self) -> &prometheus::Gauge {
        &self.inner.catalog_elements_total
    }

    pub fn parcels_total(&self) -> &prometheus::Gauge {
        &self.inner.parcels_total
    }

    pub fn soil_analyses_total(&self) -> &prometheus::Gauge {
        &self.inner.soil_analyses_total
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer).map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a request path by replacing integer id segments with `{id}`.
///
/// Prevents cardinality explosion in Prometheus labels. All record ids in
/// this API are plain integers.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()) {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Middleware that records HTTP request metrics via Prometheus.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        let duration = start.elapsed().as_secs_f64();
        let status = response.status().as_u16();
        m.record_request(&method, &path, status, duration);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_metrics_new_starts_at_zero() {
        let m = ApiMetrics::new();
        assert_eq!(m.requests(), 0);
        assert_eq!(m.errors(), 0);
    }

    #[test]
    fn requests_increments() {
        let m = ApiMetrics::new();
        m.record_request("GET", "/test", 200, 0.01);
        assert_eq!(m.requests(), 1);
        m.record_request("POST", "/test", 201, 0.02);
        m.record_request("GET", "/other", 200, 0.005);
        assert_eq!(m.requests(), 3);
    }

    #[test]
    fn errors_increments() {
        let m = ApiMetrics::new();
        m.record_request("GET", "/test", 500, 0.1);
        assert_eq!(m.errors(), 1);
        m.record_request("GET", "/test", 404, 0.05);
        assert_eq!(m.errors(), 2);
    }

    #[test]
    fn clone_shares_underlying_counters() {
        let m = ApiMetrics::new();
        let clone = m.clone();

        m.record_request("GET", "/test", 200, 0.01);
        assert_eq!(clone.requests(), 1, "clone should see the same counter");

        clone.record_request("GET", "/err", 500, 0.01);
        assert_eq!(m.errors(), 1, "original should see clone's increment");
    }

    #[test]
    fn gather_and_encode_produces_text() {
        let m = ApiMetrics::new();
        m.record_request("GET", "/test", 200, 0.01);
        let output = m.gather_and_encode().unwrap();
        assert!(output.contains("agrosuelo_http_requests_total"));
        assert!(output.contains("agrosuelo_http_request_duration_seconds"));
    }

    #[test]
    fn normalize_path_replaces_integer_ids() {
        assert_eq!(normalize_path("/v1/roles/42"), "/v1/roles/{id}");
        assert_eq!(
            normalize_path("/v1/roles/42/activate"),
            "/v1/roles/{id}/activate"
        );
    }

    #[test]
    fn normalize_path_preserves_non_numeric_segments() {
        assert_eq!(
            normalize_path("/v1/permissions/matrix"),
            "/v1/permissions/matrix"
        );
    }

    #[test]
    fn domain_gauges_update() {
        let m = ApiMetrics::new();
        m.roles_total().set(3.0);
        m.capability_edges_total().set(12.0);

        let output = m.gather_and_encode().unwrap();
        assert!(output.contains("agrosuelo_roles_total"));
        assert!(output.contains("agrosuelo_capability_edges_total"));
    }
}
