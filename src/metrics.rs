//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{
    Counter, Gauge, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("buddyscript_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");
    pub static ref HTTP_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "buddyscript_http_request_duration_seconds",
            "HTTP request duration in seconds"
        ).buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "endpoint"]
    ).expect("metric can be created");

    // Database Metrics
    pub static ref DB_QUERIES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("buddyscript_db_queries_total", "Total number of database queries"),
        &["operation", "table"]
    ).expect("metric can be created");
    pub static ref DB_QUERY_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "buddyscript_db_query_duration_seconds",
            "Database query duration in seconds"
        ).buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["operation", "table"]
    ).expect("metric can be created");

    // Domain Metrics
    pub static ref REACTIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("buddyscript_reactions_total", "Reaction changes by target and outcome"),
        &["target", "outcome"]
    ).expect("metric can be created");
    pub static ref COMMENTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("buddyscript_comments_total", "Comments and replies created"),
        &["kind"]
    ).expect("metric can be created");
    pub static ref GOOGLE_KEY_FETCHES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("buddyscript_google_key_fetches_total", "Google JWKS fetches"),
        &["status"]
    ).expect("metric can be created");

    // Storage Metrics
    pub static ref MEDIA_UPLOADS_TOTAL: IntCounter = IntCounter::new(
        "buddyscript_media_uploads_total",
        "Total number of image uploads"
    ).expect("metric can be created");
    pub static ref MEDIA_BYTES_UPLOADED: Counter = Counter::new(
        "buddyscript_media_bytes_uploaded_total",
        "Total bytes of images uploaded"
    ).expect("metric can be created");

    // Application Metrics
    pub static ref APP_UPTIME_SECONDS: Gauge = Gauge::new(
        "buddyscript_app_uptime_seconds",
        "Application uptime in seconds"
    ).expect("metric can be created");
    pub static ref USERS_TOTAL: IntGauge = IntGauge::new(
        "buddyscript_users_total",
        "Total number of registered users"
    ).expect("metric can be created");
    pub static ref POSTS_TOTAL: IntGauge = IntGauge::new(
        "buddyscript_posts_total",
        "Total number of posts"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("buddyscript_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
///
/// Safe to call more than once; already-registered collectors are skipped.
pub fn init_metrics() {
    let collectors: Vec<(&str, Box<dyn prometheus::core::Collector>)> = vec![
        ("HTTP_REQUESTS_TOTAL", Box::new(HTTP_REQUESTS_TOTAL.clone())),
        (
            "HTTP_REQUEST_DURATION_SECONDS",
            Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()),
        ),
        ("DB_QUERIES_TOTAL", Box::new(DB_QUERIES_TOTAL.clone())),
        (
            "DB_QUERY_DURATION_SECONDS",
            Box::new(DB_QUERY_DURATION_SECONDS.clone()),
        ),
        ("REACTIONS_TOTAL", Box::new(REACTIONS_TOTAL.clone())),
        ("COMMENTS_TOTAL", Box::new(COMMENTS_TOTAL.clone())),
        (
            "GOOGLE_KEY_FETCHES_TOTAL",
            Box::new(GOOGLE_KEY_FETCHES_TOTAL.clone()),
        ),
        ("MEDIA_UPLOADS_TOTAL", Box::new(MEDIA_UPLOADS_TOTAL.clone())),
        ("MEDIA_BYTES_UPLOADED", Box::new(MEDIA_BYTES_UPLOADED.clone())),
        ("APP_UPTIME_SECONDS", Box::new(APP_UPTIME_SECONDS.clone())),
        ("USERS_TOTAL", Box::new(USERS_TOTAL.clone())),
        ("POSTS_TOTAL", Box::new(POSTS_TOTAL.clone())),
        ("ERRORS_TOTAL", Box::new(ERRORS_TOTAL.clone())),
    ];

    for (name, collector) in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(error) => tracing::warn!(metric = name, %error, "Failed to register metric"),
        }
    }

    tracing::info!("Metrics registry initialized");
}

/// Time a database call and count it.
pub fn observe_db_query(operation: &str, table: &str, elapsed: std::time::Duration) {
    DB_QUERIES_TOTAL
        .with_label_values(&[operation, table])
        .inc();
    DB_QUERY_DURATION_SECONDS
        .with_label_values(&[operation, table])
        .observe(elapsed.as_secs_f64());
}
