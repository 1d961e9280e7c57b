//! Timeline controller
//!
//! Owns the playback clock and the mirrored state, turns bus events into
//! clock transitions and user input into engine requests. Seeks are applied
//! locally before the engine confirms them.
//!
//! Fetches for the focused clip run as spawned tasks and report back as
//! `FocusUpdate`s, so the event loop never waits on the engine.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use lt_clock::{ClockConfig, ClockPhase, ClockTransition, PlaybackClock, PlayheadFrame};
use lt_core::{ClipGeometry, ClipId, TrackState, finite_or_zero};

use crate::client::EngineClient;
use crate::error::{BridgeError, BridgeResult};
use crate::events::{OpenFilePayload, StateChangeSender, UiEvent};
use crate::focus::{ClipFocus, FocusUpdate, LoopEdge, TRANSITION_SUGGESTIONS};
use crate::input::{InputEvent, Intent, intent_for};
use crate::requests::EngineRequest;
use crate::ruler::{Ruler, RulerTick};
use crate::sync::{StateMessage, StateStore};
use crate::transport::EngineTransport;

/// Callback for file-open notifications
pub type OpenFileHandler = Box<dyn FnMut(&OpenFilePayload) + Send>;

/// Focus fetch results waiting to be applied
pub const FOCUS_QUEUE_SIZE: usize = 16;

/// A clip as laid out on its track
#[derive(Debug, Clone, PartialEq)]
pub struct ClipView {
    pub id: ClipId,
    pub name: String,
    /// Left edge; clips sit back to back on a track, each taking its
    /// drawn width
    pub offset_px: f64,
    pub geometry: ClipGeometry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackView {
    pub name: String,
    pub clips: Vec<ClipView>,
}

impl TrackView {
    fn layout(track: &TrackState, pixels_per_second: f64) -> Self {
        let mut offset_px = 0.0;
        let clips = track
            .clips
            .iter()
            .map(|clip| {
                let geometry = clip
                    .audio
                    .map(|audio| ClipGeometry::for_audio(&audio, pixels_per_second))
                    .unwrap_or_default();
                let view = ClipView {
                    id: clip.id,
                    name: clip.name.clone(),
                    offset_px,
                    geometry,
                };
                offset_px += geometry.drawn_width_px();
                view
            })
            .collect();

        Self {
            name: track.name.clone(),
            clips,
        }
    }
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineView {
    pub phase: ClockPhase,
    /// `HH:MM:SS.mmm`
    pub readout: String,
    pub playhead: PlayheadFrame,
    pub tracks: Vec<TrackView>,
    pub focus: Option<ClipFocus>,
}

pub struct TimelineController<T> {
    clock: PlaybackClock,
    store: StateStore,
    client: EngineClient<T>,
    ruler: Ruler,
    on_open_file: Option<OpenFileHandler>,
    focus: Option<ClipFocus>,
    focus_tx: mpsc::Sender<FocusUpdate>,
    focus_rx: mpsc::Receiver<FocusUpdate>,
    state_changes: Option<StateChangeSender>,
}

impl<T> std::fmt::Debug for TimelineController<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelineController")
            .field("clock", &self.clock)
            .field("store", &self.store)
            .field("ruler", &self.ruler)
            .field("focus", &self.focus)
            .finish_non_exhaustive()
    }
}

impl<T> TimelineController<T>
where
    T: EngineTransport + Clone + 'static,
{
    pub fn new(config: ClockConfig, client: EngineClient<T>) -> Self {
        Self::with_clock(PlaybackClock::new(config), client)
    }

    pub fn with_clock(clock: PlaybackClock, client: EngineClient<T>) -> Self {
        let (focus_tx, focus_rx) = mpsc::channel(FOCUS_QUEUE_SIZE);
        Self {
            ruler: Ruler::new(clock.config().pixels_per_second),
            clock,
            store: StateStore::new(),
            client,
            on_open_file: None,
            focus: None,
            focus_tx,
            focus_rx,
            state_changes: None,
        }
    }

    /// Route `set_tracks` / `set_check` to the engine through `sender`
    pub fn connect_state_changes(&mut self, sender: StateChangeSender) {
        self.state_changes = Some(sender);
    }

    pub fn on_open_file(&mut self, handler: impl FnMut(&OpenFilePayload) + Send + 'static) {
        self.on_open_file = Some(Box::new(handler));
    }

    /// Fold one bus event in. Returns the clock transition for playback
    /// updates.
    pub fn handle_event(&mut self, event: UiEvent) -> Option<ClockTransition> {
        match event {
            UiEvent::StateSync(StateMessage::Playback(state)) => {
                self.store.apply(StateMessage::Playback(state));
                Some(self.clock.apply(state))
            }
            UiEvent::StateSync(message) => {
                log::debug!("[Timeline] '{}' slice replaced", message.key());
                self.store.apply(message);
                self.refresh_focus();
                None
            }
            UiEvent::OpenFile(payload) => {
                log::info!("[Timeline] open file requested: {}", payload.path);
                if let Some(handler) = self.on_open_file.as_mut() {
                    handler(&payload);
                }
                None
            }
        }
    }

    /// Map raw input and act on it
    pub fn handle_input(&mut self, input: &InputEvent) -> Option<Intent> {
        let intent = intent_for(input, self.clock.config().pixels_per_second)?;
        self.dispatch(intent);
        Some(intent)
    }

    /// Act on an intent. Returns the spawned engine request, if any.
    pub fn dispatch(&mut self, intent: Intent) -> Option<JoinHandle<()>> {
        match intent {
            Intent::TogglePlayback => Some(self.client.fire(EngineRequest::TogglePlayback)),
            Intent::AddTrack => Some(self.client.fire(EngineRequest::AddTrack)),
            Intent::Seek { seconds } => Some(self.seek(seconds)),
            Intent::FocusClip { id } => Some(self.focus_clip(id)),
            Intent::SetLoopEdge { edge, frame } => self.set_loop_edge(edge, frame),
            Intent::SetLoopEdgeToBeat { edge, beat } => {
                let frame = self.focus.as_ref()?.beat_frame(beat)?;
                self.set_loop_edge(edge, frame)
            }
            Intent::CommitLoop => self.commit_loop(),
            Intent::ClearLoop => self.clear_loop(),
        }
    }

    /// Apply the seek locally, then ask the engine for it
    pub fn seek(&mut self, seconds: f64) -> JoinHandle<()> {
        let pos = finite_or_zero(seconds).max(0.0);
        let optimistic = self.store.playback().seeked_to(pos);

        self.store.set_playback(optimistic);
        let transition = self.clock.apply(optimistic);
        log::debug!("[Timeline] seek to {:.3}s ({:?})", pos, transition);

        self.client.fire(EngineRequest::TrySeek { pos })
    }

    /// Fetch a clip, then its beat track, for the focus panel
    pub fn focus_clip(&mut self, id: ClipId) -> JoinHandle<()> {
        let client = self.client.clone();
        let updates = self.focus_tx.clone();
        tokio::spawn(async move {
            let clip = match client.get_clip(id).await {
                Ok(clip) => clip,
                Err(e) => {
                    log::warn!("[Timeline] focus on clip {} failed: {}", id, e);
                    return;
                }
            };
            let path = clip.path.clone();
            if updates.send(FocusUpdate::Clip(clip)).await.is_err() {
                return;
            }
            match client.get_audio_data(&path).await {
                Ok(data) => {
                    let _ = updates.send(FocusUpdate::AudioData { id, data }).await;
                }
                Err(e) => log::warn!("[Timeline] no audio data for {}: {}", path, e),
            }
        })
    }

    /// Fold a fetch result in. Results for a clip that lost focus are
    /// dropped.
    pub fn apply_focus_update(&mut self, update: FocusUpdate) {
        match update {
            FocusUpdate::Clip(clip) => {
                log::debug!("[Timeline] focused clip {}", clip.id);
                self.focus = Some(ClipFocus::new(clip));
            }
            FocusUpdate::AudioData { id, data } => {
                let Some(focus) = self.focus.as_mut().filter(|f| f.id() == id) else {
                    return;
                };
                focus.set_audio_data(data);
                for (frame, beat) in focus.edge_beats() {
                    self.lookup_transitions(id, frame, beat);
                }
            }
            FocusUpdate::Transitions { id, frame, ranked } => {
                if let Some(focus) = self.focus.as_mut().filter(|f| f.id() == id) {
                    focus.set_transitions(frame, ranked);
                }
            }
        }
    }

    /// Apply every fetch result already delivered
    pub fn drain_focus_updates(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(update) = self.focus_rx.try_recv() {
            self.apply_focus_update(update);
            applied += 1;
        }
        applied
    }

    /// Move a loop edge and look up transitions from it when it sits on a
    /// beat
    pub fn set_loop_edge(&mut self, edge: LoopEdge, frame: u32) -> Option<JoinHandle<()>> {
        let Some(focus) = self.focus.as_mut() else {
            log::debug!("[Timeline] no clip focused, {:?} edge ignored", edge);
            return None;
        };
        focus.set_edge(edge, frame);
        let id = focus.id();
        let Some(beat) = focus.beat_index(frame) else {
            log::debug!("[Timeline] frame {} of clip {} is not on a beat", frame, id);
            return None;
        };
        Some(self.lookup_transitions(id, frame, beat))
    }

    fn lookup_transitions(&self, id: ClipId, frame: u32, beat: usize) -> JoinHandle<()> {
        let client = self.client.clone();
        let updates = self.focus_tx.clone();
        tokio::spawn(async move {
            match client
                .preferred_transitions(id, beat, TRANSITION_SUGGESTIONS)
                .await
            {
                Ok(ranked) => {
                    let _ = updates
                        .send(FocusUpdate::Transitions { id, frame, ranked })
                        .await;
                }
                Err(e) => log::warn!("[Timeline] no transitions from beat {}: {}", beat, e),
            }
        })
    }

    /// Send the picked loop to the engine once both edges are set
    pub fn commit_loop(&self) -> Option<JoinHandle<()>> {
        let focus = self.focus.as_ref()?;
        let (start_frame, end_frame) = focus.pending_loop()?;
        let id = focus.id();
        let client = self.client.clone();
        Some(tokio::spawn(async move {
            match client.set_clip_loop_frames(id, start_frame, end_frame).await {
                Ok(()) => log::info!(
                    "[Timeline] loop {}..{} set on clip {}",
                    start_frame,
                    end_frame,
                    id
                ),
                Err(e) => log::warn!("[Timeline] loop not set: {}", e),
            }
        }))
    }

    /// Clear the focused clip's active loop
    pub fn clear_loop(&self) -> Option<JoinHandle<()>> {
        let focus = self.focus.as_ref().filter(|f| f.has_loop())?;
        Some(self.client.fire(EngineRequest::ClearClipLoop { id: focus.id() }))
    }

    /// Ask the engine to replace the track list. The store changes only
    /// when the engine mirrors it back.
    pub async fn set_tracks(&self, tracks: Vec<TrackState>) -> BridgeResult<()> {
        self.emit_state_change(StateMessage::Tracks(tracks)).await
    }

    pub async fn set_check(&self, check: bool) -> BridgeResult<()> {
        self.emit_state_change(StateMessage::Check(check)).await
    }

    async fn emit_state_change(&self, message: StateMessage) -> BridgeResult<()> {
        let sender = self
            .state_changes
            .as_ref()
            .ok_or(BridgeError::ChannelClosed("state change bus"))?;
        sender.emit(&message).await
    }

    /// Keep the focused clip in step with the mirrored tracks
    fn refresh_focus(&mut self) {
        let Some(focus) = self.focus.as_mut() else {
            return;
        };
        let id = focus.id();
        if let Some(clip) = self
            .store
            .tracks()
            .iter()
            .flat_map(|track| track.clips.iter())
            .find(|clip| clip.id == id)
        {
            focus.refresh_clip(clip.clone());
        }
    }

    pub fn focus(&self) -> Option<&ClipFocus> {
        self.focus.as_ref()
    }

    pub fn view(&self) -> TimelineView {
        let pps = self.clock.config().pixels_per_second;
        TimelineView {
            phase: self.clock.phase(),
            readout: self.clock.duration_readout(),
            playhead: self.clock.playhead(),
            tracks: self
                .store
                .tracks()
                .iter()
                .map(|track| TrackView::layout(track, pps))
                .collect(),
            focus: self.focus.clone(),
        }
    }

    pub fn ruler_ticks(&self, width_px: f64, label_width_px: f64) -> Vec<RulerTick> {
        self.ruler.ticks(width_px, label_width_px)
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn client(&self) -> &EngineClient<T> {
        &self.client
    }

    /// Drive the controller until the event bus closes.
    ///
    /// `render` is called at most once per `render_period`, and only when
    /// the view changed since the last call. Closing the input channel
    /// leaves events flowing.
    pub async fn run<R>(
        &mut self,
        mut events: mpsc::Receiver<UiEvent>,
        mut inputs: mpsc::Receiver<InputEvent>,
        render_period: Duration,
        mut render: R,
    ) where
        R: FnMut(&TimelineView),
    {
        let mut frames = tokio::time::interval(render_period.max(Duration::from_millis(1)));
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut inputs_open = true;
        let mut last_view: Option<TimelineView> = None;

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        self.handle_event(event);
                    }
                    None => break,
                },
                input = inputs.recv(), if inputs_open => match input {
                    Some(input) => {
                        self.handle_input(&input);
                    }
                    None => inputs_open = false,
                },
                Some(update) = self.focus_rx.recv() => {
                    self.apply_focus_update(update);
                }
                _ = frames.tick() => {
                    let view = self.view();
                    if last_view.as_ref() != Some(&view) {
                        render(&view);
                        last_view = Some(view);
                    }
                }
            }
        }

        log::info!("[Timeline] event bus closed, stopping clock");
        self.clock.shutdown();
    }
}
