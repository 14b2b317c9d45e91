//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Authentication Metrics
    pub static ref AUTH_ATTEMPTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("wits_auth_attempts_total", "Total number of authentication attempts"),
        &["backend", "operation", "outcome"]
    ).expect("metric can be created");
    pub static ref SESSIONS_OPENED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("wits_sessions_opened_total", "Total number of sessions opened"),
        &["backend"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("wits_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
///
/// Safe to call more than once; later calls leave the registry untouched.
pub fn init_metrics() {
    let collectors: [(&str, Box<dyn prometheus::core::Collector>); 3] = [
        ("AUTH_ATTEMPTS_TOTAL", Box::new(AUTH_ATTEMPTS_TOTAL.clone())),
        ("SESSIONS_OPENED_TOTAL", Box::new(SESSIONS_OPENED_TOTAL.clone())),
        ("ERRORS_TOTAL", Box::new(ERRORS_TOTAL.clone())),
    ];

    for (name, collector) in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(error) => tracing::warn!(%error, metric = name, "Failed to register metric"),
        }
    }

    tracing::info!("Metrics registry initialized");
}

/// Record the outcome of a login, registration or verification attempt.
pub fn observe_auth_attempt(backend: &str, operation: &str, outcome: &str) {
    AUTH_ATTEMPTS_TOTAL
        .with_label_values(&[backend, operation, outcome])
        .inc();
}
