//! Engine request surface
//!
//! Command names are the ones the engine registers, so a request serializes
//! to `{"cmd": "try_seek", "args": {"pos": 30.0}}` with camelCase argument
//! names where the engine expects them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use lt_core::{AudioData, ClipId, ClipState};

/// A request call issued to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "args", rename_all = "snake_case")]
pub enum EngineRequest {
    TogglePlayback,
    TrySeek {
        /// Target position in seconds
        pos: f64,
    },
    AddTrack,
    GetClip {
        id: ClipId,
    },
    GetAudioData {
        path: String,
    },
    #[serde(rename_all = "camelCase")]
    SetClipLoopFrames {
        id: ClipId,
        start_frame: u32,
        end_frame: u32,
    },
    ClearClipLoop {
        id: ClipId,
    },
    GetClipPreferredTransitionBeats {
        id: ClipId,
        /// Index into the clip's beat track
        beat: usize,
        count: u32,
    },
}

impl EngineRequest {
    /// Engine command name
    pub fn command(&self) -> &'static str {
        match self {
            Self::TogglePlayback => "toggle_playback",
            Self::TrySeek { .. } => "try_seek",
            Self::AddTrack => "add_track",
            Self::GetClip { .. } => "get_clip",
            Self::GetAudioData { .. } => "get_audio_data",
            Self::SetClipLoopFrames { .. } => "set_clip_loop_frames",
            Self::ClearClipLoop { .. } => "clear_clip_loop",
            Self::GetClipPreferredTransitionBeats { .. } => "get_clip_preferred_transition_beats",
        }
    }
}

/// Successful engine reply
#[derive(Debug, Clone, PartialEq)]
pub enum EngineReply {
    Ack,
    Clip(ClipState),
    AudioData(AudioData),
    /// `beatIndex -> score`, lower is better
    TransitionBeats(BTreeMap<usize, f64>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        let seek = serde_json::to_value(EngineRequest::TrySeek { pos: 30.0 }).unwrap();
        assert_eq!(seek, json!({"cmd": "try_seek", "args": {"pos": 30.0}}));

        let toggle = serde_json::to_value(EngineRequest::TogglePlayback).unwrap();
        assert_eq!(toggle, json!({"cmd": "toggle_playback"}));

        let set_loop = serde_json::to_value(EngineRequest::SetClipLoopFrames {
            id: ClipId(3),
            start_frame: 1024,
            end_frame: 4096,
        })
        .unwrap();
        assert_eq!(
            set_loop,
            json!({
                "cmd": "set_clip_loop_frames",
                "args": {"id": 3, "startFrame": 1024, "endFrame": 4096}
            })
        );
    }

    #[test]
    fn test_command_matches_serialized_tag() {
        let requests = [
            EngineRequest::TogglePlayback,
            EngineRequest::AddTrack,
            EngineRequest::GetClip { id: ClipId(1) },
            EngineRequest::GetAudioData {
                path: "a.wav".into(),
            },
            EngineRequest::ClearClipLoop { id: ClipId(1) },
            EngineRequest::GetClipPreferredTransitionBeats {
                id: ClipId(1),
                beat: 4,
                count: 5,
            },
        ];
        for request in requests {
            let value = serde_json::to_value(&request).unwrap();
            assert_eq!(value["cmd"], request.command());
        }
    }
}
