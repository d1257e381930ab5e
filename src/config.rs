use crate::error::P0fSynError;
use crate::filter::{AddrMatcher, PacketFilter};
use crate::sampling::{RateLimiter, Sampler};

/// Filtering, sampling and rate limiting settings of a capture.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Destination port to keep, 0 for any.
    pub dport: u16,
    /// Source port to keep, 0 for any.
    pub sport: u16,
    /// Source host or CIDR to exclude.
    pub exclude_src: Option<String>,
    /// Destination host or CIDR to exclude.
    pub exclude_dst: Option<String>,
    /// Share of SYNs to keep, within `0..=1`.
    pub sampling_ratio: f64,
    /// Max events per second, 0 for unlimited.
    pub rate_limit: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dport: 0,
            sport: 0,
            exclude_src: None,
            exclude_dst: None,
            sampling_ratio: 1.0,
            rate_limit: 0,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), P0fSynError> {
        if !(0.0..=1.0).contains(&self.sampling_ratio) {
            return Err(P0fSynError::Misconfiguration(format!(
                "sampling ratio must be within 0..=1, got {}",
                self.sampling_ratio
            )));
        }
        self.filter().map(|_| ())
    }

    pub fn filter(&self) -> Result<PacketFilter, P0fSynError> {
        Ok(PacketFilter {
            dport: non_zero(self.dport),
            sport: non_zero(self.sport),
            exclude_src: parse_matcher(self.exclude_src.as_deref())?,
            exclude_dst: parse_matcher(self.exclude_dst.as_deref())?,
        })
    }

    pub fn sampler(&self) -> Sampler {
        Sampler::new(self.sampling_ratio)
    }

    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(self.rate_limit)
    }
}

fn non_zero(port: u16) -> Option<u16> {
    (port != 0).then_some(port)
}

fn parse_matcher(value: Option<&str>) -> Result<Option<AddrMatcher>, P0fSynError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some),
    }
}
