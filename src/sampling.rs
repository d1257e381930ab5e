use rand::Rng;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Keeps each event with probability `ratio`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampler {
    ratio: f64,
}

impl Sampler {
    pub fn new(ratio: f64) -> Self {
        Self { ratio }
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Ratios of 1 and above keep everything without drawing.
    pub fn keeps_all(&self) -> bool {
        self.ratio >= 1.0
    }

    pub fn admit<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        self.keeps_all() || rng.random::<f64>() < self.ratio
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// At most `limit` events per wall-clock second, `0` meaning no limit.
///
/// The window is fixed: the count resets when the second changes, not one
/// second after the first event.
#[derive(Debug, Default)]
pub struct RateLimiter {
    limit: u64,
    window: Mutex<(u64, u64)>,
}

impl RateLimiter {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            window: Mutex::new((0, 0)),
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn allow(&self) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        self.allow_at(now)
    }

    /// Admission decision for an event seen during second `now`.
    pub fn allow_at(&self, now: u64) -> bool {
        if self.limit == 0 {
            return true;
        }
        let mut window = match self.window.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let (second, count) = &mut *window;
        if *second != now {
            *second = now;
            *count = 0;
        }
        if *count >= self.limit {
            return false;
        }
        *count += 1;
        true
    }
}
