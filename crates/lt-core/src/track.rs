//! Track and clip state slices mirrored from the engine
//!
//! Clip CRUD and loop persistence live in the engine. The UI derives
//! geometry from these slices and sends whole replacements back.

use serde::{Deserialize, Serialize};

use crate::time::frames_to_seconds;

/// Engine-assigned clip identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipId(pub u64);

impl std::fmt::Display for ClipId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One timeline track
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackState {
    pub name: String,
    #[serde(default)]
    pub clips: Vec<ClipState>,
}

/// A clip placed on a track
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipState {
    pub id: ClipId,
    pub path: String,
    pub name: String,
    #[serde(default)]
    pub start_at: Option<u64>,
    #[serde(default)]
    pub audio: Option<ClipAudio>,
}

/// Decoded audio facts for a clip, including the loop region if one is set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipAudio {
    /// Length in frames
    pub length: u64,
    pub sample_rate: u32,
    #[serde(default)]
    pub loop_start: Option<bool>,
    #[serde(default)]
    pub loop_count: Option<u16>,
    #[serde(default)]
    pub loop_start_frame: Option<u32>,
    #[serde(default)]
    pub loop_end_frame: Option<u32>,
}

impl ClipAudio {
    /// Loop frames, only when the loop is switched on and both ends are known
    pub fn loop_frames(&self) -> Option<(u32, u32)> {
        match (self.loop_start, self.loop_start_frame, self.loop_end_frame) {
            (Some(true), Some(start), Some(end)) if end > start => Some((start, end)),
            _ => None,
        }
    }
}

/// Beat analysis for an audio file as returned by `get_audio_data`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioData {
    pub path: String,
    #[serde(default)]
    pub beat_track: Option<Vec<u32>>,
}

impl AudioData {
    /// Index of the beat that sits exactly on `frame`
    pub fn beat_index(&self, frame: u32) -> Option<usize> {
        self.beat_track.as_ref()?.iter().position(|&b| b == frame)
    }
}

/// Horizontal layout of a clip in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClipGeometry {
    pub width_px: f64,
    pub loop_region: Option<LoopGeometry>,
}

/// How many times the loop segment is drawn back to back
pub const LOOP_REPEATS_DRAWN: u32 = 10;

/// Pixel widths of the three segments of a looped clip
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoopGeometry {
    pub lead_px: f64,
    /// Width of one loop pass
    pub loop_px: f64,
    pub tail_px: f64,
    /// Loop passes drawn between lead and tail
    pub repeats: u32,
}

impl LoopGeometry {
    /// Lead, every drawn loop pass, then the tail
    pub fn drawn_width_px(&self) -> f64 {
        self.lead_px + self.loop_px * self.repeats as f64 + self.tail_px
    }
}

impl ClipGeometry {
    pub fn for_audio(audio: &ClipAudio, pixels_per_second: f64) -> Self {
        let width_px = frames_to_seconds(audio.length, audio.sample_rate) * pixels_per_second;

        let loop_region = audio.loop_frames().map(|(start, end)| {
            let lead_px = frames_to_seconds(start as u64, audio.sample_rate) * pixels_per_second;
            let loop_px =
                frames_to_seconds((end - start) as u64, audio.sample_rate) * pixels_per_second;
            LoopGeometry {
                lead_px,
                loop_px,
                tail_px: (width_px - loop_px - lead_px).max(0.0),
                repeats: LOOP_REPEATS_DRAWN,
            }
        });

        Self {
            width_px,
            loop_region,
        }
    }

    /// Width the clip takes on its track; looped clips grow by their
    /// repeated passes
    pub fn drawn_width_px(&self) -> f64 {
        self.loop_region
            .map_or(self.width_px, |region| region.drawn_width_px())
    }
}
