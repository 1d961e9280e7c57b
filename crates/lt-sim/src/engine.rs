//! Simulated playback engine
//!
//! Serves the request calls the timeline issues and mirrors its state back
//! over the event bus, the way the real engine does: playback state goes out
//! on play, pause and seek only, never on a timer. State changes from the
//! timeline are applied and mirrored back the same way.

use std::collections::BTreeMap;
use std::path::Path;

use tokio::sync::mpsc;
use tokio::time::Instant;

use lt_bridge::{EngineCall, EngineReply, EngineRequest, EventSender, StateChange, StateMessage};
use lt_core::{AudioData, ClipAudio, ClipId, ClipState, PlaybackState, TrackState};

/// Seconds between synthetic beats
const BEAT_SPACING_S: f64 = 0.5;

pub struct SimEngine {
    sample_rate: u32,
    clip_seconds: f64,
    is_paused: bool,
    /// Frames at the last play/seek
    anchor_frames: u64,
    /// When playback last started, while playing
    playing_since: Option<Instant>,
    tracks: Vec<TrackState>,
    check: bool,
    next_clip_id: u64,
    events: EventSender,
}

impl SimEngine {
    pub fn new(sample_rate: u32, clip_seconds: f64, events: EventSender) -> Self {
        Self {
            sample_rate,
            clip_seconds,
            is_paused: true,
            anchor_frames: 0,
            playing_since: None,
            tracks: Vec::new(),
            check: false,
            next_clip_id: 1,
            events,
        }
    }

    /// Frames played so far
    pub fn total_frames(&self) -> u64 {
        let running = self
            .playing_since
            .map(|since| (since.elapsed().as_secs_f64() * self.sample_rate as f64) as u64)
            .unwrap_or(0);
        self.anchor_frames + running
    }

    pub fn playback(&self) -> PlaybackState {
        PlaybackState {
            is_paused: self.is_paused,
            total_frames: self.total_frames(),
            sample_rate: Some(self.sample_rate),
            channels: Some(2),
        }
    }

    /// Serve calls and state changes until `deadline`
    pub async fn serve(
        mut self,
        mut calls: mpsc::Receiver<EngineCall>,
        mut changes: mpsc::Receiver<StateChange>,
        deadline: Instant,
    ) {
        // Mirror initial state, like the window refresh does
        self.emit_playback().await;
        self.emit_tracks().await;
        self.emit(StateMessage::Check(self.check)).await;

        loop {
            tokio::select! {
                call = calls.recv() => match call {
                    Some(call) => self.handle(call).await,
                    None => break,
                },
                Some(change) = changes.recv() => self.apply_change(change).await,
                _ = tokio::time::sleep_until(deadline) => break,
            }
        }
        log::info!("[Engine] stopped at frame {}", self.total_frames());
    }

    async fn handle(&mut self, call: EngineCall) {
        log::debug!("[Engine] {}", call.request.command());
        let result = match &call.request {
            EngineRequest::TogglePlayback => {
                self.toggle();
                Ok(EngineReply::Ack)
            }
            EngineRequest::TrySeek { pos } => {
                self.seek(*pos);
                Ok(EngineReply::Ack)
            }
            EngineRequest::AddTrack => {
                self.add_track();
                Ok(EngineReply::Ack)
            }
            EngineRequest::GetClip { id } => self
                .clip(*id)
                .cloned()
                .map(EngineReply::Clip)
                .ok_or_else(|| format!("no clip {}", id)),
            EngineRequest::GetAudioData { path } => Ok(EngineReply::AudioData(self.audio_data(path))),
            EngineRequest::SetClipLoopFrames {
                id,
                start_frame,
                end_frame,
            } => self.set_loop(*id, Some((*start_frame, *end_frame))),
            EngineRequest::ClearClipLoop { id } => self.set_loop(*id, None),
            EngineRequest::GetClipPreferredTransitionBeats { id, beat, count } => self
                .clip(*id)
                .map(|_| EngineReply::TransitionBeats(transition_scores(*beat, *count)))
                .ok_or_else(|| format!("no clip {}", id)),
        };

        if let Err(reason) = &result {
            log::warn!("[Engine] {} rejected: {}", call.request.command(), reason);
        }
        let mirror = if result.is_ok() {
            Mirror::after(&call.request)
        } else {
            None
        };
        call.respond(result);

        match mirror {
            Some(Mirror::Playback) => self.emit_playback().await,
            Some(Mirror::Tracks) => self.emit_tracks().await,
            None => {}
        }
    }

    async fn apply_change(&mut self, change: StateChange) {
        let message = match change.into_message() {
            Ok(message) => message,
            Err(e) => {
                log::warn!("[Engine] state change dropped: {}", e);
                return;
            }
        };
        match &message {
            StateMessage::Tracks(tracks) => self.tracks = tracks.clone(),
            StateMessage::Check(check) => self.check = *check,
            StateMessage::Playback(_) => return,
        }
        log::debug!("[Engine] '{}' changed by the timeline", message.key());
        self.emit(message).await;
    }

    fn toggle(&mut self) {
        if self.is_paused {
            self.playing_since = Some(Instant::now());
        } else {
            self.anchor_frames = self.total_frames();
            self.playing_since = None;
        }
        self.is_paused = !self.is_paused;
    }

    fn seek(&mut self, pos: f64) {
        self.anchor_frames = (pos.max(0.0) * self.sample_rate as f64) as u64;
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
    }

    fn add_track(&mut self) {
        let name = format!("Track {}", self.tracks.len() + 1);
        self.tracks.push(TrackState {
            name,
            clips: Vec::new(),
        });
    }

    /// Add a clip for `path` to the last track, creating one if needed
    pub async fn open_file(&mut self, path: &str) {
        if self.tracks.is_empty() {
            self.add_track();
        }
        let id = ClipId(self.next_clip_id);
        self.next_clip_id += 1;

        let name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());
        let clip = ClipState {
            id,
            path: path.to_string(),
            name,
            start_at: None,
            audio: Some(ClipAudio {
                length: (self.clip_seconds * self.sample_rate as f64) as u64,
                sample_rate: self.sample_rate,
                ..Default::default()
            }),
        };
        if let Some(track) = self.tracks.last_mut() {
            track.clips.push(clip);
        }
        self.emit_tracks().await;
    }

    fn clip(&self, id: ClipId) -> Option<&ClipState> {
        self.tracks
            .iter()
            .flat_map(|t| t.clips.iter())
            .find(|c| c.id == id)
    }

    fn set_loop(&mut self, id: ClipId, frames: Option<(u32, u32)>) -> Result<EngineReply, String> {
        let audio = self
            .tracks
            .iter_mut()
            .flat_map(|t| t.clips.iter_mut())
            .find(|c| c.id == id)
            .and_then(|c| c.audio.as_mut())
            .ok_or_else(|| format!("no audio for clip {}", id))?;

        match frames {
            Some((start, end)) => {
                if end as u64 > audio.length {
                    return Err(format!("loop end {} past clip end {}", end, audio.length));
                }
                audio.loop_start = Some(true);
                audio.loop_start_frame = Some(start);
                audio.loop_end_frame = Some(end);
            }
            None => {
                audio.loop_start = Some(false);
                audio.loop_start_frame = None;
                audio.loop_end_frame = None;
            }
        }
        Ok(EngineReply::Ack)
    }

    fn audio_data(&self, path: &str) -> AudioData {
        let length = self.clip_seconds * self.sample_rate as f64;
        let spacing = BEAT_SPACING_S * self.sample_rate as f64;
        let beats = (0..)
            .map(|i| (i as f64 * spacing) as u32)
            .take_while(|&frame| (frame as f64) < length)
            .collect();
        AudioData {
            path: path.to_string(),
            beat_track: Some(beats),
        }
    }

    async fn emit_playback(&self) {
        self.emit(StateMessage::Playback(self.playback())).await;
    }

    async fn emit_tracks(&self) {
        self.emit(StateMessage::Tracks(self.tracks.clone())).await;
    }

    async fn emit(&self, message: StateMessage) {
        if let Err(e) = self.events.sync(&message).await {
            log::warn!("[Engine] state sync failed: {}", e);
        }
    }
}

/// State slice to mirror after a successful request
enum Mirror {
    Playback,
    Tracks,
}

impl Mirror {
    fn after(request: &EngineRequest) -> Option<Self> {
        match request {
            EngineRequest::TogglePlayback | EngineRequest::TrySeek { .. } => Some(Self::Playback),
            EngineRequest::AddTrack
            | EngineRequest::SetClipLoopFrames { .. }
            | EngineRequest::ClearClipLoop { .. } => Some(Self::Tracks),
            _ => None,
        }
    }
}

/// Bar-aligned beats score best
fn transition_scores(beat: usize, count: u32) -> BTreeMap<usize, f64> {
    (1..=count as usize)
        .map(|offset| {
            let score = (offset % 4) as f64 / 4.0 + offset as f64 / 100.0;
            (beat + offset, score)
        })
        .collect()
}
