//! Metrics for palaver.
//!
//! Crates record through the re-exported `metrics` macros using the names in
//! [`session`]. Nothing is collected until a recorder is installed; the
//! `prometheus` feature provides one.

pub use metrics::{counter, histogram};

/// Metric names and label keys for the session lifecycle.
pub mod session {
    /// Lifecycle operations attempted, labelled by `op`.
    pub const OPERATIONS_TOTAL: &str = "palaver_session_operations_total";
    /// Lifecycle operations that failed and were swallowed, labelled by `op` and `kind`.
    pub const ERRORS_TOTAL: &str = "palaver_session_errors_total";
    /// Reads that found no record and created an empty session.
    pub const CREATED_ON_MISS_TOTAL: &str = "palaver_session_created_on_miss_total";
    /// Size in bytes of packed payloads written to the store.
    pub const PAYLOAD_BYTES: &str = "palaver_session_payload_bytes";
    /// Time spent in a lifecycle operation, labelled by `op`.
    pub const DURATION_SECONDS: &str = "palaver_session_duration_seconds";

    pub const LABEL_OP: &str = "op";
    pub const LABEL_KIND: &str = "kind";
}

#[cfg(feature = "prometheus")]
pub use metrics_exporter_prometheus::PrometheusHandle;

/// Install a process-wide Prometheus recorder and return a handle that can
/// render the current snapshot in text exposition format.
#[cfg(feature = "prometheus")]
pub fn install_prometheus_recorder() -> anyhow::Result<PrometheusHandle> {
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install prometheus recorder: {e}"))?;
    tracing::debug!("prometheus recorder installed");
    Ok(handle)
}
