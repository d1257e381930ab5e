use crate::config::PipelineConfig;
use crate::detect::SynDetector;
use crate::error::P0fSynError;
use crate::filter::PacketFilter;
use crate::metrics::{DropReason, SynMetrics};
use crate::output::SynEvent;
use crate::sampling::{RateLimiter, Sampler};
use crate::syn_process::SynPacket;
use rand::Rng;
use std::sync::Arc;
use tracing::trace;

/// What happened to one client SYN.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Rejected by the port or address filters. Not counted.
    Filtered,
    /// Dropped by sampling or rate limiting. Counted by reason.
    Dropped(DropReason),
    Classified(SynEvent),
}

/// Filtering, sampling, rate limiting and accounting around detection.
///
/// Cloning is cheap and clones share the rate limit window and the metrics, so
/// parallel workers enforce one global rate.
#[derive(Clone)]
pub struct SynPipeline {
    filter: PacketFilter,
    sampler: Sampler,
    rate_limiter: Arc<RateLimiter>,
    metrics: Option<Arc<SynMetrics>>,
}

impl SynPipeline {
    pub fn new(config: &PipelineConfig) -> Result<Self, P0fSynError> {
        config.validate()?;
        Ok(Self {
            filter: config.filter()?,
            sampler: config.sampler(),
            rate_limiter: Arc::new(config.rate_limiter()),
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<SynMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn metrics(&self) -> Option<&Arc<SynMetrics>> {
        self.metrics.as_ref()
    }

    /// Runs one SYN through filter, sampling, rate limit, detection and
    /// accounting, in that order.
    pub fn process<R: Rng + ?Sized>(
        &self,
        detector: &SynDetector<'_>,
        syn: SynPacket,
        rng: &mut R,
    ) -> Verdict {
        if !self.filter.allows(&syn.source, &syn.destination) {
            trace!("filtered SYN {}:{}", syn.source.ip, syn.source.port);
            return Verdict::Filtered;
        }

        if !self.sampler.admit(rng) {
            return self.dropped(DropReason::Sample);
        }

        if !self.rate_limiter.allow() {
            return self.dropped(DropReason::RateLimit);
        }

        let label = detector.detect(&syn.meta);
        if let Some(metrics) = &self.metrics {
            metrics.record_event(label);
        }

        Verdict::Classified(SynEvent::new(
            label,
            syn.meta,
            syn.source,
            syn.destination,
        ))
    }

    pub fn record_output_error(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.record_output_error();
        }
    }

    fn dropped(&self, reason: DropReason) -> Verdict {
        if let Some(metrics) = &self.metrics {
            metrics.record_drop(reason);
        }
        Verdict::Dropped(reason)
    }
}
