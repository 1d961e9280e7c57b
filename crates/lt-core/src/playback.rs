//! Playback state as last reported by the engine

use serde::{Deserialize, Serialize};

use crate::time::{FramePosition, elapsed_ms};

/// Authoritative-as-known playback state.
///
/// Mirrors the engine's last report and is always replaced wholesale, never
/// merged field by field. A missing or zero sample rate derives zero elapsed
/// time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub is_paused: bool,
    #[serde(default)]
    pub total_frames: u64,
    #[serde(default)]
    pub sample_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u16>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_paused: true,
            total_frames: 0,
            sample_rate: None,
            channels: None,
        }
    }
}

impl PlaybackState {
    pub fn new(is_paused: bool, total_frames: u64, sample_rate: u32) -> Self {
        Self {
            is_paused,
            total_frames,
            sample_rate: Some(sample_rate),
            channels: None,
        }
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        !self.is_paused
    }

    /// Sample rate usable for time derivation
    #[inline]
    pub fn usable_sample_rate(&self) -> Option<u32> {
        self.sample_rate.filter(|&sr| sr > 0)
    }

    /// `totalFrames / sampleRate * 1000`, zero when the rate is unusable
    #[inline]
    pub fn elapsed_ms(&self) -> f64 {
        elapsed_ms(self.total_frames, self.sample_rate)
    }

    #[inline]
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_ms() / 1000.0
    }

    /// True when the position-bearing fields differ, i.e. the derived elapsed
    /// time may have moved.
    pub fn position_changed(&self, other: &Self) -> bool {
        self.total_frames != other.total_frames || self.sample_rate != other.sample_rate
    }

    /// State as it will look once the engine lands a seek to `seconds`.
    ///
    /// Used for the optimistic local update issued together with `try_seek`.
    /// Without a usable sample rate the frame count cannot be derived and the
    /// state is returned unchanged.
    pub fn seeked_to(&self, seconds: f64) -> Self {
        match self.usable_sample_rate() {
            Some(sr) => Self {
                total_frames: FramePosition::from_seconds(seconds, sr).0,
                ..*self
            },
            None => *self,
        }
    }
}
