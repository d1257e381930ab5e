use crate::error::P0fSynError;
use prometheus::{Encoder, Gauge, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

pub mod labels {
    pub const LABEL: &str = "label";
    pub const REASON: &str = "reason";
    pub const TYPE: &str = "type";
}

pub mod values {
    pub const REASON_RATE_LIMIT: &str = "rate_limit";
    pub const REASON_SAMPLE: &str = "sample";
    pub const TYPE_JSON: &str = "json";
}

/// Why a SYN was not classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    RateLimit,
    Sample,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::RateLimit => values::REASON_RATE_LIMIT,
            DropReason::Sample => values::REASON_SAMPLE,
        }
    }
}

/// Capture counters, exported in the Prometheus text format.
///
/// All updates go through atomics inside the collectors, so one instance can be
/// shared behind an `Arc` by every worker.
#[derive(Clone)]
pub struct SynMetrics {
    registry: Registry,
    events_total: IntCounterVec,
    events_dropped_total: IntCounterVec,
    output_errors_total: IntCounterVec,
    sampling_ratio: Gauge,
    rate_limit: IntGauge,
}

impl SynMetrics {
    pub fn new(ratio: f64, limit: u64) -> Result<Self, P0fSynError> {
        let registry = Registry::new();

        let events_total = IntCounterVec::new(
            Opts::new("p0f_events_total", "Classified SYNs by label"),
            &[labels::LABEL],
        )?;
        let events_dropped_total = IntCounterVec::new(
            Opts::new("p0f_events_dropped_total", "SYNs dropped before classification"),
            &[labels::REASON],
        )?;
        let output_errors_total = IntCounterVec::new(
            Opts::new("p0f_output_errors_total", "Events that could not be serialized"),
            &[labels::TYPE],
        )?;
        let sampling_ratio = Gauge::new("p0f_sampling_ratio", "Configured sampling ratio")?;
        let rate_limit = IntGauge::new("p0f_rate_limit", "Configured max events per second")?;

        registry.register(Box::new(events_total.clone()))?;
        registry.register(Box::new(events_dropped_total.clone()))?;
        registry.register(Box::new(output_errors_total.clone()))?;
        registry.register(Box::new(sampling_ratio.clone()))?;
        registry.register(Box::new(rate_limit.clone()))?;

        sampling_ratio.set(ratio);
        rate_limit.set(i64::try_from(limit).unwrap_or(i64::MAX));

        // Both drop reasons are exported from the start, even at zero.
        for reason in [DropReason::RateLimit, DropReason::Sample] {
            events_dropped_total.with_label_values(&[reason.as_str()]);
        }
        output_errors_total.with_label_values(&[values::TYPE_JSON]);

        Ok(Self {
            registry,
            events_total,
            events_dropped_total,
            output_errors_total,
            sampling_ratio,
            rate_limit,
        })
    }

    pub fn record_event(&self, label: &str) {
        self.events_total.with_label_values(&[label]).inc();
    }

    pub fn record_drop(&self, reason: DropReason) {
        self.events_dropped_total
            .with_label_values(&[reason.as_str()])
            .inc();
    }

    pub fn record_output_error(&self) {
        self.output_errors_total
            .with_label_values(&[values::TYPE_JSON])
            .inc();
    }

    pub fn events(&self, label: &str) -> u64 {
        self.events_total.with_label_values(&[label]).get()
    }

    pub fn dropped(&self, reason: DropReason) -> u64 {
        self.events_dropped_total
            .with_label_values(&[reason.as_str()])
            .get()
    }

    pub fn output_errors(&self) -> u64 {
        self.output_errors_total
            .with_label_values(&[values::TYPE_JSON])
            .get()
    }

    pub fn sampling_ratio(&self) -> f64 {
        self.sampling_ratio.get()
    }

    pub fn rate_limit(&self) -> i64 {
        self.rate_limit.get()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Prometheus text exposition of every metric.
    pub fn render(&self) -> Result<String, P0fSynError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| P0fSynError::Parse(format!("metrics are not valid UTF-8: {e}")))
    }
}
