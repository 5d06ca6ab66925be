//! `OpenTelemetry` metrics for the scan pipeline.
//!
//! This module is only compiled when the `metrics` Cargo feature is enabled.
//! It sets up the OTLP exporter for both traces and metrics, sending
//! telemetry to a configurable endpoint (e.g. an `OpenTelemetry` Collector),
//! and exposes the counters recorded by the scan orchestrator.

use std::sync::LazyLock;

use opentelemetry::metrics::Counter;
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;

/// Errors that can occur during metrics / tracing pipeline initialisation.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to build an OTLP exporter.
    #[error("failed to build OTLP exporter: {0}")]
    ExporterBuild(#[from] opentelemetry_otlp::ExporterBuildError),

    /// Failed during `OTel` SDK shutdown or flush.
    #[error("OpenTelemetry SDK error: {0}")]
    Sdk(#[from] opentelemetry_sdk::error::OTelSdkError),
}

/// Opaque handle that keeps the `OpenTelemetry` providers alive.
///
/// When dropped, the providers are **not** shut down automatically -- call
/// [`MetricsGuard::shutdown`] for a graceful flush before exiting.
pub struct MetricsGuard {
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
}

impl MetricsGuard {
    /// Gracefully shut down both providers, flushing any buffered telemetry.
    ///
    /// # Errors
    ///
    /// Returns an error if either provider fails to shut down cleanly.
    pub fn shutdown(self) -> Result<(), MetricsError> {
        self.tracer_provider.shutdown()?;
        self.meter_provider.shutdown()?;
        Ok(())
    }
}

/// Initialise the `OpenTelemetry` OTLP pipeline for traces **and** metrics.
///
/// * `endpoint` -- OTLP receiver URL, e.g. `"http://localhost:4317"` (gRPC).
///
/// Returns a [`MetricsGuard`] that **must** be kept alive for the lifetime of
/// the application.  Call [`MetricsGuard::shutdown`] before process exit to
/// flush buffered telemetry.
///
/// # Errors
///
/// Returns [`MetricsError`] if the OTLP exporters cannot be constructed.
pub fn init_metrics(endpoint: &str) -> Result<MetricsGuard, MetricsError> {
    // --- Traces ---
    let trace_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(trace_exporter)
        .build();

    global::set_tracer_provider(tracer_provider.clone());

    // --- Metrics ---
    let metric_exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let meter_provider = SdkMeterProvider::builder()
        .with_periodic_exporter(metric_exporter)
        .build();

    global::set_meter_provider(meter_provider.clone());

    Ok(MetricsGuard {
        tracer_provider,
        meter_provider,
    })
}

struct ScanCounters {
    scans: Counter<u64>,
    scan_failures: Counter<u64>,
    tokens_consumed: Counter<u64>,
}

static COUNTERS: LazyLock<ScanCounters> = LazyLock::new(|| {
    let meter = global::meter("sentinel");
    ScanCounters {
        scans: meter
            .u64_counter("sentinel.scans")
            .with_description("Completed scans")
            .build(),
        scan_failures: meter
            .u64_counter("sentinel.scan_failures")
            .with_description("Scans rejected or failed upstream")
            .build(),
        tokens_consumed: meter
            .u64_counter("sentinel.tokens_consumed")
            .with_description("Tokens deducted for scans")
            .build(),
    }
});

/// Count one completed scan of `content_type` and the tokens it consumed.
pub fn record_scan(content_type: &str, tokens: u64) {
    let attrs = [KeyValue::new("content_type", content_type.to_string())];
    COUNTERS.scans.add(1, &attrs);
    COUNTERS.tokens_consumed.add(tokens, &attrs);
}

/// Count one scan that failed before history was written.
pub fn record_scan_failure(content_type: &str) {
    COUNTERS
        .scan_failures
        .add(1, &[KeyValue::new("content_type", content_type.to_string())]);
}
