//! Focused clip
//!
//! Clicking a clip fetches it and its beat track. Loop edges are picked on
//! beat frames; each picked edge that sits on a beat gets a ranked list of
//! preferred transition beats from the engine, keyed by that frame.

use std::collections::BTreeMap;

use lt_core::{AudioData, ClipId, ClipState};

/// Transition suggestions requested per loop edge
pub const TRANSITION_SUGGESTIONS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopEdge {
    Start,
    End,
}

/// Background fetch result, folded back into the controller
#[derive(Debug, Clone, PartialEq)]
pub enum FocusUpdate {
    Clip(ClipState),
    AudioData {
        id: ClipId,
        data: AudioData,
    },
    Transitions {
        id: ClipId,
        frame: u32,
        ranked: Vec<(usize, f64)>,
    },
}

/// The clip open in the focus panel and its pending loop edit
#[derive(Debug, Clone, PartialEq)]
pub struct ClipFocus {
    clip: ClipState,
    audio_data: Option<AudioData>,
    loop_start: Option<u32>,
    loop_end: Option<u32>,
    transitions: BTreeMap<u32, Vec<(usize, f64)>>,
}

impl ClipFocus {
    /// Edges start on the clip's active loop, if any
    pub fn new(clip: ClipState) -> Self {
        let frames = clip.audio.and_then(|audio| audio.loop_frames());
        Self {
            loop_start: frames.map(|(start, _)| start),
            loop_end: frames.map(|(_, end)| end),
            clip,
            audio_data: None,
            transitions: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> ClipId {
        self.clip.id
    }

    pub fn clip(&self) -> &ClipState {
        &self.clip
    }

    /// Take a newer copy of the clip, keeping the edit in progress
    pub fn refresh_clip(&mut self, clip: ClipState) {
        if clip.id == self.clip.id {
            self.clip = clip;
        }
    }

    pub fn audio_data(&self) -> Option<&AudioData> {
        self.audio_data.as_ref()
    }

    pub fn set_audio_data(&mut self, data: AudioData) {
        self.audio_data = Some(data);
    }

    /// The clip has an active loop that can be cleared
    pub fn has_loop(&self) -> bool {
        self.clip
            .audio
            .is_some_and(|audio| audio.loop_frames().is_some())
    }

    pub fn edge(&self, edge: LoopEdge) -> Option<u32> {
        match edge {
            LoopEdge::Start => self.loop_start,
            LoopEdge::End => self.loop_end,
        }
    }

    pub fn set_edge(&mut self, edge: LoopEdge, frame: u32) {
        match edge {
            LoopEdge::Start => self.loop_start = Some(frame),
            LoopEdge::End => self.loop_end = Some(frame),
        }
    }

    /// Beat index of `frame`, once the beat track is known
    pub fn beat_index(&self, frame: u32) -> Option<usize> {
        self.audio_data.as_ref()?.beat_index(frame)
    }

    pub fn beat_frame(&self, beat: usize) -> Option<u32> {
        self.audio_data
            .as_ref()?
            .beat_track
            .as_ref()?
            .get(beat)
            .copied()
    }

    /// Picked edges that sit on a beat, as `(frame, beat index)`
    pub fn edge_beats(&self) -> Vec<(u32, usize)> {
        [self.loop_start, self.loop_end]
            .into_iter()
            .flatten()
            .filter_map(|frame| Some((frame, self.beat_index(frame)?)))
            .collect()
    }

    /// Both edges, once picked
    pub fn pending_loop(&self) -> Option<(u32, u32)> {
        Some((self.loop_start?, self.loop_end?))
    }

    /// Ranked suggestions for the edge at `frame`, best first
    pub fn transitions(&self, frame: u32) -> Option<&[(usize, f64)]> {
        self.transitions.get(&frame).map(Vec::as_slice)
    }

    pub fn set_transitions(&mut self, frame: u32, ranked: Vec<(usize, f64)>) {
        self.transitions.insert(frame, ranked);
    }
}
