//! Frame opportunities
//!
//! The host display refreshes on a fixed grid of instants. `FramePacer`
//! models that grid so that scheduled work lands on a frame boundary, the way
//! a repaint callback would, rather than at an arbitrary timer expiry.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::ClockConfig;

/// Source of frame-aligned wake-ups
#[derive(Debug, Clone, Copy)]
pub struct FramePacer {
    epoch: Instant,
    period: Option<Duration>,
}

impl FramePacer {
    /// Pacer whose frame grid starts now
    pub fn new(period: Option<Duration>) -> Self {
        Self {
            epoch: Instant::now(),
            period: period.filter(|p| !p.is_zero()),
        }
    }

    pub fn from_config(config: &ClockConfig) -> Self {
        Self::new(config.frame_period())
    }

    /// Pacer without a frame grid: every opportunity is "now"
    pub fn unaligned() -> Self {
        Self::new(None)
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// First frame boundary at or after `at`
    pub fn next_frame_at(&self, at: Instant) -> Instant {
        let Some(period) = self.period else {
            return at;
        };
        let period_ns = period.as_nanos();
        let since_ns = at.saturating_duration_since(self.epoch).as_nanos();
        let frames = since_ns.div_ceil(period_ns);
        self.epoch + Duration::from_nanos((frames * period_ns) as u64)
    }

    /// Wait for the next frame opportunity and return its frame time
    pub async fn next_frame(&self) -> Instant {
        let frame = self.next_frame_at(Instant::now());
        tokio::time::sleep_until(frame).await;
        frame
    }
}

impl Default for FramePacer {
    fn default() -> Self {
        Self::from_config(&ClockConfig::default())
    }
}
