//! Time-related types for the timeline

use serde::{Deserialize, Serialize};

pub const MS_PER_SECOND: f64 = 1000.0;

/// Frame position reported by the engine (one frame = one sample per channel)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FramePosition(pub u64);

impl FramePosition {
    pub const ZERO: Self = Self(0);

    /// Frame position for a time in seconds. Negative or non-finite input lands on zero.
    #[inline]
    pub fn from_seconds(seconds: f64, sample_rate: u32) -> Self {
        if !seconds.is_finite() || seconds <= 0.0 || sample_rate == 0 {
            return Self::ZERO;
        }
        Self((seconds * sample_rate as f64) as u64)
    }

    #[inline]
    pub fn to_seconds(self, sample_rate: Option<u32>) -> f64 {
        self.to_ms(sample_rate) / MS_PER_SECOND
    }

    /// Elapsed milliseconds, zero when the sample rate is missing or zero.
    #[inline]
    pub fn to_ms(self, sample_rate: Option<u32>) -> f64 {
        elapsed_ms(self.0, sample_rate)
    }
}

impl std::ops::Sub for FramePosition {
    type Output = u64;

    fn sub(self, rhs: Self) -> Self::Output {
        self.0.saturating_sub(rhs.0)
    }
}

/// `frames / sample_rate * 1000`, never NaN or infinite.
#[inline]
pub fn elapsed_ms(frames: u64, sample_rate: Option<u32>) -> f64 {
    match sample_rate {
        Some(sr) if sr > 0 => frames as f64 / sr as f64 * MS_PER_SECOND,
        _ => 0.0,
    }
}

/// Replace NaN and infinities by zero before anything reaches the display.
#[inline]
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Length of `frames` in seconds at `sample_rate`, zero for a zero rate.
#[inline]
pub fn frames_to_seconds(frames: u64, sample_rate: u32) -> f64 {
    elapsed_ms(frames, Some(sample_rate)) / MS_PER_SECOND
}
