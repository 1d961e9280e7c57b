//! User input → engine intent

use lt_core::{ClipId, finite_or_zero};

use crate::focus::LoopEdge;

/// Key code that toggles playback
pub const TOGGLE_KEY: &str = "Space";

/// Which element held focus when a key went down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    /// Nothing in particular, keys go to the document body
    #[default]
    Document,
    /// A text field or other input element
    InputElement,
}

/// Raw input from the host surface
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyDown { code: String, focus: Focus },
    /// Click on the ruler, in client coordinates
    TimelineClick { client_x: f64, timeline_left: f64 },
    PlayButton,
    AddTrackButton,
    /// Click on a clip in a track lane
    ClipClick { id: ClipId },
    /// "Start Loop" / "End Loop" picked on a beat marker of the focused clip
    BeatMenu { edge: LoopEdge, frame: u32 },
    /// Suggested transition beat clicked under the other loop edge
    TransitionClick { edge: LoopEdge, beat: usize },
    CreateLoopButton,
    ClearLoopButton,
}

/// What the user asked for
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    TogglePlayback,
    /// Seek to a position in seconds, never negative
    Seek { seconds: f64 },
    AddTrack,
    FocusClip { id: ClipId },
    /// Move a loop edge of the focused clip to a beat frame
    SetLoopEdge { edge: LoopEdge, frame: u32 },
    /// Move a loop edge to the beat with this index
    SetLoopEdgeToBeat { edge: LoopEdge, beat: usize },
    CommitLoop,
    ClearLoop,
}

/// Map input to intent. `None` means the input is not ours to handle.
pub fn intent_for(event: &InputEvent, pixels_per_second: f64) -> Option<Intent> {
    match event {
        InputEvent::KeyDown { code, focus } => {
            (code == TOGGLE_KEY && *focus == Focus::Document).then_some(Intent::TogglePlayback)
        }
        InputEvent::TimelineClick {
            client_x,
            timeline_left,
        } => Some(Intent::Seek {
            seconds: seek_seconds(client_x - timeline_left, pixels_per_second),
        }),
        InputEvent::PlayButton => Some(Intent::TogglePlayback),
        InputEvent::AddTrackButton => Some(Intent::AddTrack),
        InputEvent::ClipClick { id } => Some(Intent::FocusClip { id: *id }),
        InputEvent::BeatMenu { edge, frame } => Some(Intent::SetLoopEdge {
            edge: *edge,
            frame: *frame,
        }),
        InputEvent::TransitionClick { edge, beat } => Some(Intent::SetLoopEdgeToBeat {
            edge: *edge,
            beat: *beat,
        }),
        InputEvent::CreateLoopButton => Some(Intent::CommitLoop),
        InputEvent::ClearLoopButton => Some(Intent::ClearLoop),
    }
}

/// Pixel offset on the timeline → seconds
pub fn seek_seconds(offset_px: f64, pixels_per_second: f64) -> f64 {
    if pixels_per_second <= 0.0 {
        return 0.0;
    }
    finite_or_zero(offset_px / pixels_per_second).max(0.0)
}
