//! Metrics collection for observability

use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_with_registry, Counter, CounterVec, Histogram, HistogramOpts, Opts,
    Registry,
};
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> = Lazy::new(|| {
    Arc::new(Metrics::new().expect("Failed to initialize metrics"))
});

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Completion metrics
    pub completion_requests: CounterVec,
    pub completion_duration: Histogram,

    // Debounce metrics
    pub debounce_superseded: Counter,
    pub debounce_fired: Counter,

    // Refresh metrics
    pub summary_refreshes: CounterVec,
    pub style_refreshes: CounterVec,
    pub refresh_jobs_dropped: Counter,

    // Context metrics
    pub context_truncations: Counter,
    pub context_estimated_tokens: Histogram,

    pub messages_saved: Counter,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let completion_requests = register_counter_vec_with_registry!(
            Opts::new("completion_requests_total", "Total completion requests"),
            &["status"],
            registry
        )?;

        let completion_duration = register_histogram_with_registry!(
            HistogramOpts::new(
                "completion_duration_seconds",
                "Completion request duration in seconds"
            ),
            registry
        )?;

        let debounce_superseded = register_counter_with_registry!(
            Opts::new(
                "debounce_superseded_total",
                "Pending completions replaced by a newer request"
            ),
            registry
        )?;

        let debounce_fired = register_counter_with_registry!(
            Opts::new("debounce_fired_total", "Debounce timers that fired"),
            registry
        )?;

        let summary_refreshes = register_counter_vec_with_registry!(
            Opts::new("summary_refreshes_total", "Total summary refreshes"),
            &["status"],
            registry
        )?;

        let style_refreshes = register_counter_vec_with_registry!(
            Opts::new("style_refreshes_total", "Total style profile refreshes"),
            &["status"],
            registry
        )?;

        let refresh_jobs_dropped = register_counter_with_registry!(
            Opts::new(
                "refresh_jobs_dropped_total",
                "Refresh jobs dropped because the queue was full"
            ),
            registry
        )?;

        let context_truncations = register_counter_with_registry!(
            Opts::new("context_truncations_total", "Contexts truncated to fit the budget"),
            registry
        )?;

        let context_estimated_tokens = register_histogram_with_registry!(
            HistogramOpts::new(
                "context_estimated_tokens",
                "Estimated tokens per assembled context before truncation"
            )
            .buckets(vec![
                100.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0
            ]),
            registry
        )?;

        let messages_saved = register_counter_with_registry!(
            Opts::new("messages_saved_total", "Total messages saved"),
            registry
        )?;

        Ok(Self {
            registry,
            completion_requests,
            completion_duration,
            debounce_superseded,
            debounce_fired,
            summary_refreshes,
            style_refreshes,
            refresh_jobs_dropped,
            context_truncations,
            context_estimated_tokens,
            messages_saved,
        })
    }

    /// Get the metrics registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a completion request; `duration` is absent when the provider was not called
    pub fn record_completion(&self, status: &str, duration: Option<Duration>) {
        self.completion_requests.with_label_values(&[status]).inc();
        if let Some(duration) = duration {
            self.completion_duration.observe(duration.as_secs_f64());
        }
    }

    pub fn record_debounce_superseded(&self) {
        self.debounce_superseded.inc();
    }

    pub fn record_debounce_fired(&self) {
        self.debounce_fired.inc();
    }

    pub fn record_summary_refresh(&self, success: bool) {
        let status = if success { "success" } else { "error" };
        self.summary_refreshes.with_label_values(&[status]).inc();
    }

    pub fn record_style_refresh(&self, success: bool) {
        let status = if success { "success" } else { "error" };
        self.style_refreshes.with_label_values(&[status]).inc();
    }

    pub fn record_refresh_job_dropped(&self) {
        self.refresh_jobs_dropped.inc();
    }

    /// Record an assembled context's size estimate
    pub fn record_context(&self, estimated_tokens: usize, truncated: bool) {
        self.context_estimated_tokens.observe(estimated_tokens as f64);
        if truncated {
            self.context_truncations.inc();
        }
    }

    pub fn record_message_saved(&self) {
        self.messages_saved.inc();
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        if encoder.encode(&metric_families, &mut buffer).is_err() {
            return String::new();
        }

        String::from_utf8(buffer).unwrap_or_default()
    }
}
